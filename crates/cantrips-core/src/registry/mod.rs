//! Module registry.
//!
//! This module provides:
//! - The `modules.json` ledger of previously resolved modules
//! - Resolution of configured modules through the loader strategies
//! - Validation and registration of the descriptor trees modules export

mod cache;
#[allow(clippy::module_inception)]
mod registry;

pub use cache::{LEDGER_FILE, ModuleCache};
pub use registry::{ModuleRegistry, RegisteredModule};
