//! Module registry - resolution, caching and descriptor registration.
//!
//! The registry ties the pieces together:
//! - A [`ModuleFactory`] picks the resolution strategy for each configured module
//! - The [`ModuleCache`] ledger decides between a refresh and a full materialization
//! - A [`ModuleLoader`] turns the module directory into its export tree
//! - Leaves of that tree are registered under their `meta.name`

use anyhow::{Context, Result};
use futures::future::try_join_all;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DescriptorShapeError, ResolutionError};
use crate::loader::ModuleFactory;
use crate::models::{
    CacheEntry, Exposed, ExportedLeaf, ModuleMeta, ModuleSpec, ModuleType, scan_exports,
};
use crate::paths::CantripsPaths;
use crate::plugin::{LoadedModule, ModuleLoader, ModuleRuntime, ProcessModuleLoader};
use crate::process::{CommandRunner, SystemCommandRunner};

use super::cache::ModuleCache;

/// A leaf descriptor that passed validation, keyed by `meta.name`.
#[derive(Clone)]
pub struct RegisteredModule {
    pub meta: ModuleMeta,
    pub exposed: Exposed,
    /// Keys from the module's export root to this leaf.
    pub export_path: Vec<String>,
    pub runtime: Arc<dyn ModuleRuntime>,
}

impl RegisteredModule {
    fn from_leaf(leaf: ExportedLeaf, runtime: Arc<dyn ModuleRuntime>) -> Self {
        Self {
            meta: leaf.descriptor.meta,
            exposed: leaf.descriptor.exposed,
            export_path: leaf.export_path,
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The export key this descriptor was found under.
    pub fn export_key(&self) -> &str {
        self.export_path.last().map(String::as_str).unwrap_or_default()
    }
}

impl std::fmt::Debug for RegisteredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModule")
            .field("meta", &self.meta)
            .field("exposed", &self.exposed)
            .field("export_path", &self.export_path)
            .finish_non_exhaustive()
    }
}

/// Resolves configured modules and holds the registered descriptors.
pub struct ModuleRegistry {
    modules_dir: PathBuf,
    working_dir: PathBuf,
    cache: Mutex<ModuleCache>,
    runner: Arc<dyn CommandRunner>,
    loader: Arc<dyn ModuleLoader>,
    modules: BTreeMap<String, RegisteredModule>,
}

impl ModuleRegistry {
    /// Open the registry under `paths`, creating the storage layout if needed.
    pub fn open(paths: &CantripsPaths) -> Result<Self> {
        paths.ensure()?;
        let working_dir =
            std::env::current_dir().context("Failed to determine working directory")?;
        let modules_dir = paths.modules_dir();
        let cache = ModuleCache::open(&modules_dir)?;
        debug!(modules_dir = %modules_dir.display(), "Module registry initialized");

        Ok(Self {
            modules_dir,
            working_dir,
            cache: Mutex::new(cache),
            runner: Arc::new(SystemCommandRunner),
            loader: Arc::new(ProcessModuleLoader),
            modules: BTreeMap::new(),
        })
    }

    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Directory `file:` modules resolve against.
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Resolve one module: refresh a cached copy, or materialize it from scratch.
    pub async fn resolve(&self, spec: &ModuleSpec) -> Result<LoadedModule, ResolutionError> {
        let source = self.factory().create(spec);
        let module = source.module().clone();
        let entry = module.cache_entry();

        let cached = self.cache.lock().is_cached(&entry);
        let dir = if cached {
            debug!(module = %module.name(), "Loading module from cache");
            source.refresh(&self.modules_dir).await?
        } else {
            info!(module = %module.name(), kind = %module.module_type(), "Resolving module");
            source.materialize(&self.modules_dir).await?
        };

        let loaded = self.loader.load(&module, &dir).await?;

        if !cached && module.module_type() != ModuleType::Local {
            self.record(entry)?;
        }

        Ok(loaded)
    }

    fn factory(&self) -> ModuleFactory {
        ModuleFactory::new(self.runner.clone(), self.working_dir.clone())
    }

    fn record(&self, entry: CacheEntry) -> Result<(), ResolutionError> {
        let name = entry.name.clone();
        self.cache.lock().record(entry)?;
        debug!(module = %name, "Cached module");
        Ok(())
    }

    /// Resolve a module and register its export tree.
    pub async fn register(
        &mut self,
        spec: &ModuleSpec,
    ) -> Result<Vec<DescriptorShapeError>, ResolutionError> {
        let loaded = self.resolve(spec).await?;
        Ok(self.register_export_tree(&loaded.exports, loaded.runtime))
    }

    /// Resolve all modules concurrently, then register them.
    ///
    /// The first resolution failure aborts the whole call and nothing is registered.
    pub async fn register_all(
        &mut self,
        specs: &[ModuleSpec],
    ) -> Result<Vec<DescriptorShapeError>, ResolutionError> {
        let loaded = try_join_all(specs.iter().map(|spec| self.resolve(spec))).await?;

        let mut rejected = Vec::new();
        for module in loaded {
            rejected.extend(self.register_export_tree(&module.exports, module.runtime));
        }
        Ok(rejected)
    }

    /// Validate and register every leaf of an export tree.
    ///
    /// Invalid keys are logged and returned; their siblings still register.
    pub fn register_export_tree(
        &mut self,
        exports: &Map<String, Value>,
        runtime: Arc<dyn ModuleRuntime>,
    ) -> Vec<DescriptorShapeError> {
        let scan = scan_exports(exports);

        for err in &scan.rejected {
            warn!(key = %err.key(), "{}", err);
        }

        for leaf in scan.leaves {
            let registered = RegisteredModule::from_leaf(leaf, runtime.clone());
            debug!(module = %registered.name(), export = %registered.export_key(), "Registered module");
            self.modules.insert(registered.name().to_string(), registered);
        }

        scan.rejected
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredModule> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn modules(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.modules.values()
    }

    /// Snapshot of the ledger entries.
    pub fn cached_entries(&self) -> Vec<CacheEntry> {
        self.cache.lock().entries().to_vec()
    }
}
