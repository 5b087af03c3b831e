use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{ModuleSource, clear_dir, install_and_build, run_step};
use crate::error::ResolutionError;
use crate::models::{GitSpec, ResolvedModule};
use crate::process::{CommandRunner, CommandSpec};

/// A module cloned from a Git repository (`git@host/repo.git#ref`).
pub struct GitSource {
    module: ResolvedModule,
    runner: Arc<dyn CommandRunner>,
}

impl GitSource {
    pub fn new(module: ResolvedModule, runner: Arc<dyn CommandRunner>) -> Self {
        Self { module, runner }
    }

    async fn git(
        &self,
        dir: &Path,
        step: &str,
        args: &[&str],
        description: String,
    ) -> Result<String, ResolutionError> {
        let command = CommandSpec::new("git", args.iter().copied())
            .in_dir(dir)
            .describe(description);
        run_step(self.runner.as_ref(), &self.module, step, command).await
    }
}

#[async_trait]
impl ModuleSource for GitSource {
    fn module(&self) -> &ResolvedModule {
        &self.module
    }

    async fn materialize(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError> {
        let dir = self.module_dir(modules_dir);
        clear_dir(&dir).map_err(ResolutionError::io(self.module.name()))?;

        let spec = GitSpec::parse(self.module.version());
        self.git(
            &dir,
            "git clone",
            &["clone", spec.repository, "."],
            format!("Cloning repository: {}", spec.repository),
        )
        .await?;

        if let Some(reference) = spec.reference {
            self.git(
                &dir,
                "git checkout",
                &["checkout", reference],
                format!("Checking out {reference}"),
            )
            .await?;
        }

        install_and_build(self.runner.as_ref(), &self.module, &dir).await?;
        Ok(dir)
    }

    async fn refresh(&self, modules_dir: &Path) -> Result<PathBuf, ResolutionError> {
        let dir = self.module_dir(modules_dir);
        let name = self.module.name();

        self.git(
            &dir,
            "git fetch",
            &["fetch"],
            format!("Checking for updates: {name}"),
        )
        .await?;

        let head = self
            .git(&dir, "git rev-parse", &["rev-parse", "HEAD"], String::new())
            .await?;
        let upstream = match self
            .git(&dir, "git rev-parse", &["rev-parse", "@{u}"], String::new())
            .await
        {
            Ok(upstream) => upstream,
            Err(err) => {
                debug!(module = %name, error = %err, "No upstream to compare against, skipping update");
                return Ok(dir);
            }
        };

        if head.trim() != upstream.trim() {
            info!(module = %name, "Updating module from upstream");
            self.git(&dir, "git pull", &["pull"], format!("Updating {name}"))
                .await?;
            install_and_build(self.runner.as_ref(), &self.module, &dir).await?;
        }

        Ok(dir)
    }
}
