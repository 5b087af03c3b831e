//! CLI setup module
//!
//! Handles logging initialization and module registration for CLI usage.

use anyhow::{Context, Result};
use cantrips_core::{CantripsConfig, CantripsPaths, ModuleRegistry};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::GlobalArgs;

/// Configured modules, resolved and registered.
pub struct Session {
    pub config: CantripsConfig,
    pub registry: ModuleRegistry,
}

/// Log to stderr, and to a daily file under the logs directory when it is writable.
///
/// `RUST_LOG` overrides the default levels.
pub fn init_logging(globals: &GlobalArgs) -> Option<WorkerGuard> {
    let filter = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    let (stderr_level, file_level) = if globals.verbose {
        ("debug", "debug")
    } else {
        ("warn", "info")
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(stderr_level));

    let log_dir = CantripsPaths::resolve(globals.root.clone())
        .and_then(|paths| paths.ensure_logs_dir())
        .ok();
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "cantrips.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .with_filter(filter(file_level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Load the config and register every configured module.
pub async fn prepare_session(globals: &GlobalArgs) -> Result<Session> {
    let paths = CantripsPaths::resolve(globals.root.clone())?;
    let working_dir = std::env::current_dir().context("Failed to determine working directory")?;
    let config = CantripsConfig::load(globals.config.as_deref(), &working_dir)
        .context("Failed to load configuration")?;

    let mut registry = ModuleRegistry::open(&paths)?;
    let rejected = registry.register_all(&config.module_specs()).await?;
    debug!(
        modules = registry.module_names().len(),
        rejected = rejected.len(),
        "Modules registered"
    );

    Ok(Session { config, registry })
}
