//! Core of the cantrips command runner.
//!
//! Modules (plugins) are declared in configuration as `name = versionSpec`,
//! resolved from the working tree, Git or npm, cached in a ledger, and
//! described by a tree of command descriptors. The registry validates those
//! descriptors; [`command`] turns them into a two-level command surface and
//! dispatches actions with a timeout.

pub mod ci;
pub mod command;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod paths;
pub mod plugin;
pub mod process;
pub mod registry;

pub use command::{CommandTree, Dispatcher, DEFAULT_TIMEOUT_MS};
pub use config::CantripsConfig;
pub use error::{ConfigError, DescriptorShapeError, DispatchError, ModuleError, ResolutionError};
pub use models::*;
pub use paths::CantripsPaths;
pub use registry::{ModuleCache, ModuleRegistry, RegisteredModule};
