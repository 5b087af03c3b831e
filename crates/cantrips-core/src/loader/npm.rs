use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::{ModuleSource, clear_dir, copy_dir_recursive, run_step};
use crate::error::ResolutionError;
use crate::models::ResolvedModule;
use crate::process::{CommandRunner, CommandSpec};

/// A module installed from the npm registry (`name@version`).
///
/// Published versions are treated as immutable, so there is no update check.
pub struct NpmSource {
    module: ResolvedModule,
    runner: Arc<dyn CommandRunner>,
}

impl NpmSource {
    pub fn new(module: ResolvedModule, runner: Arc<dyn CommandRunner>) -> Self {
        Self { module, runner }
    }

    /// Install into a throwaway package and return the installed package directory.
    async fn install_into(&self, scratch: &Path) -> Result<PathBuf, ResolutionError> {
        let name = self.module.name();
        let version = self.module.version();

        run_step(
            self.runner.as_ref(),
            &self.module,
            "npm init",
            CommandSpec::new("npm", ["init", "--yes"]).in_dir(scratch),
        )
        .await?;

        run_step(
            self.runner.as_ref(),
            &self.module,
            "npm install",
            CommandSpec::new("npm", ["install".to_string(), format!("{name}@{version}")])
                .in_dir(scratch)
                .describe(format!("Installing module {name}@{version}")),
        )
        .await?;

        Ok(scratch.join("node_modules").join(name))
    }
}

#[async_trait]
impl ModuleSource for NpmSource {
    fn module(&self) -> &ResolvedModule {
        &self.module
    }

    async fn materialize(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError> {
        let name = self.module.name();
        let version = self.module.version();
        let io = ResolutionError::io;
        let dir = self.module_dir(modules_dir);

        // Removed on drop, on both the success and the error path.
        let scratch = TempDir::new().map_err(io(name))?;
        let installed = self.install_into(scratch.path()).await?;

        clear_dir(&dir).map_err(io(name))?;
        copy_dir_recursive(&installed, &dir).map_err(io(name))?;
        drop(scratch);

        run_step(
            self.runner.as_ref(),
            &self.module,
            "dependency installation",
            CommandSpec::new("npm", ["install"])
                .in_dir(&dir)
                .describe(format!("Installing dependencies for {name}@{version}")),
        )
        .await?;

        Ok(dir)
    }
}
