use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ModuleSource;
use crate::error::ResolutionError;
use crate::models::{LOCAL_PREFIX, ResolvedModule};

/// A module loaded straight from the working tree (`file:<path>`).
pub struct LocalSource {
    module: ResolvedModule,
    working_dir: PathBuf,
}

impl LocalSource {
    pub fn new(module: ResolvedModule, working_dir: PathBuf) -> Self {
        Self {
            module,
            working_dir,
        }
    }
}

#[async_trait]
impl ModuleSource for LocalSource {
    fn module(&self) -> &ResolvedModule {
        &self.module
    }

    fn module_dir(&self, _modules_dir: &Path) -> PathBuf {
        let raw = self
            .module
            .version()
            .strip_prefix(LOCAL_PREFIX)
            .unwrap_or(self.module.version());
        self.working_dir.join(raw)
    }

    async fn materialize(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError> {
        let dir = self.module_dir(modules_dir);
        debug!(module = %self.module.name(), dir = %dir.display(), "Using local module");
        Ok(dir)
    }
}
