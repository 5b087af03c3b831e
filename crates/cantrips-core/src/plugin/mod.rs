//! Module loading and invocation.
//!
//! Modules run out of process. A [`ModuleLoader`] turns a materialized module
//! directory into its export tree plus a [`ModuleRuntime`] that later runs
//! actions against it.

pub mod protocol;
mod runtime;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ModuleError, ResolutionError};
use crate::models::ResolvedModule;

pub use runtime::{MODULE_DIR_ENV, ProcessModuleLoader, ProcessModuleRuntime};

/// A single action call on a module export.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionInvocation {
    /// Keys from the module's export root to the leaf descriptor.
    pub export_path: Vec<String>,
    pub action: String,
    /// Merged options; the module is constructed with these before the action runs.
    pub options: Map<String, Value>,
}

/// Executes actions of a loaded module.
#[async_trait]
pub trait ModuleRuntime: Send + Sync {
    async fn invoke(&self, invocation: ActionInvocation) -> Result<Value, ModuleError>;
}

/// A module's export tree together with the runtime that serves it.
#[derive(Clone)]
pub struct LoadedModule {
    pub exports: Map<String, Value>,
    pub runtime: Arc<dyn ModuleRuntime>,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

/// Loads the export tree of a materialized module directory.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(
        &self,
        module: &ResolvedModule,
        module_dir: &Path,
    ) -> Result<LoadedModule, ResolutionError>;
}
