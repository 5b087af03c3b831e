//! Resolution strategies, one per module source.
//!
//! A [`ModuleSource`] materializes a module's code under the modules root
//! (or, for local modules, points at the working tree). [`ModuleFactory`]
//! picks the strategy from the version spec.

mod git;
mod local;
mod npm;

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ResolutionError;
use crate::models::{ModuleManifest, ModuleSpec, ModuleType, ResolvedModule};
use crate::process::{CommandRunner, CommandSpec};

pub use git::GitSource;
pub use local::LocalSource;
pub use npm::NpmSource;

/// A strategy for fetching one module.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    fn module(&self) -> &ResolvedModule;

    /// Directory the module is loaded from.
    fn module_dir(&self, modules_dir: &Path) -> PathBuf {
        modules_dir.join(self.module().path())
    }

    /// Fetch and prepare the module from scratch.
    async fn materialize(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError>;

    /// Update check on a cache hit. Sources treated as immutable do nothing.
    async fn refresh(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError> {
        Ok(self.module_dir(modules_dir))
    }
}

/// Maps version specs to resolution strategies.
#[derive(Clone)]
pub struct ModuleFactory {
    runner: Arc<dyn CommandRunner>,
    working_dir: PathBuf,
}

impl ModuleFactory {
    /// Local modules resolve against `working_dir`.
    pub fn new(runner: Arc<dyn CommandRunner>, working_dir: PathBuf) -> Self {
        Self {
            runner,
            working_dir,
        }
    }

    pub fn create(&self, spec: &ModuleSpec) -> Box<dyn ModuleSource> {
        let module = ResolvedModule::new(spec);
        match module.module_type() {
            ModuleType::Local => Box::new(LocalSource::new(module, self.working_dir.clone())),
            ModuleType::Git => Box::new(GitSource::new(module, self.runner.clone())),
            ModuleType::Npm => Box::new(NpmSource::new(module, self.runner.clone())),
        }
    }
}

/// Run one materialization step, naming the step and module on failure.
pub(crate) async fn run_step(
    runner: &dyn CommandRunner,
    module: &ResolvedModule,
    step: &str,
    command: CommandSpec,
) -> Result<String, ResolutionError> {
    runner
        .run(&command)
        .await
        .map_err(|source| ResolutionError::CommandFailed {
            module: module.name().to_string(),
            step: step.to_string(),
            source,
        })
}

/// Install dependencies and build a checked-out module in place.
///
/// Manifest `install`/`build` vectors override the npm defaults; an empty
/// vector disables the step. Without `package.json` the defaults are skipped.
pub(crate) async fn install_and_build(
    runner: &dyn CommandRunner,
    module: &ResolvedModule,
    dir: &Path,
) -> Result<(), ResolutionError> {
    let manifest = ModuleManifest::load_optional(dir, module.name())?;
    let is_node_package = dir.join("package.json").is_file();

    let install = step_command(
        manifest.as_ref().and_then(|m| m.install.as_deref()),
        is_node_package.then(|| CommandSpec::new("npm", ["install"])),
    );
    if let Some(install) = install {
        let command = install.in_dir(dir).describe("Installing dependencies");
        run_step(runner, module, "dependency installation", command).await?;
    }

    let build = step_command(
        manifest.as_ref().and_then(|m| m.build.as_deref()),
        is_node_package.then(|| CommandSpec::new("npm", ["run", "build", "--if-present"])),
    );
    if let Some(build) = build {
        let command = build.in_dir(dir).describe("Running build");
        run_step(runner, module, "build", command).await?;
    }

    Ok(())
}

fn step_command(overridden: Option<&[String]>, default: Option<CommandSpec>) -> Option<CommandSpec> {
    match overridden {
        Some(argv) => CommandSpec::from_argv(argv),
        None => default,
    }
}

/// Remove `dir` with its contents and recreate it empty.
pub(crate) fn clear_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

pub(crate) fn copy_dir_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let target_path = target.join(entry.file_name());
        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &target_path)?;
        } else {
            fs::copy(&source_path, &target_path)?;
        }
    }
    Ok(())
}
