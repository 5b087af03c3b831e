use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::registry::LEDGER_FILE;

const CANTRIPS_DIR: &str = ".cantrips";
const MODULES_DIR: &str = "modules";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the cantrips root directory.
pub const CANTRIPS_DIR_ENV: &str = "CANTRIPS_DIR";

/// Resolve the cantrips root directory.
/// Priority: CANTRIPS_DIR env var > ~/.cantrips/
pub fn resolve_cantrips_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CANTRIPS_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(CANTRIPS_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Storage layout rooted at `{cantripsRoot}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CantripsPaths {
    root: PathBuf,
}

impl CantripsPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for an explicit root, falling back to [`resolve_cantrips_dir`].
    pub fn resolve(root: Option<PathBuf>) -> Result<Self> {
        match root {
            Some(root) => Ok(Self::new(root)),
            None => Ok(Self::new(resolve_cantrips_dir()?)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/modules`
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    /// `{root}/modules/modules.json`
    pub fn ledger_path(&self) -> PathBuf {
        self.modules_dir().join(LEDGER_FILE)
    }

    /// `{root}/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Create the root and modules directories if they are missing.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(self.modules_dir()).with_context(|| {
            format!(
                "Failed to create modules directory: {}",
                self.modules_dir().display()
            )
        })
    }

    /// Create the logs directory and return it.
    pub fn ensure_logs_dir(&self) -> Result<PathBuf> {
        let dir = self.logs_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
