//! Error types shared across resolution, registration and dispatch.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of an external command run through a [`crate::process::CommandRunner`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Fatal failure while resolving a module. Aborts the whole invocation.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("{step} failed for module {module}: {source}")]
    CommandFailed {
        module: String,
        step: String,
        #[source]
        source: ProcessError,
    },

    #[error("filesystem error while resolving module {module}: {source}")]
    Io {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("module {module} has no cantrips manifest in {}", dir.display())]
    MissingManifest { module: String, dir: PathBuf },

    #[error("invalid manifest for module {module}: {reason}")]
    InvalidManifest { module: String, reason: String },

    #[error("failed to load module {module}: {source}")]
    Load {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("module ledger error: {0}")]
    Ledger(String),
}

impl ResolutionError {
    pub(crate) fn io(module: &str) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ResolutionError::Io {
            module: module.to_string(),
            source,
        }
    }
}

/// A descriptor-tree entry that is neither a leaf nor a group.
///
/// Never fatal: the offending key is skipped and its siblings still register.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorShapeError {
    #[error("{key} is not a valid cantrips module or module group.")]
    NotADescriptor { key: String },

    #[error("{key} has a malformed descriptor: {reason}")]
    Malformed { key: String, reason: String },
}

impl DescriptorShapeError {
    pub fn key(&self) -> &str {
        match self {
            DescriptorShapeError::NotADescriptor { key }
            | DescriptorShapeError::Malformed { key, .. } => key,
        }
    }
}

/// Failure to read or parse the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Failure reported by, or while talking to, a module process.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to start module process `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("module process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("module process exited with {status} without a response")]
    NoResponse { status: String },

    #[error("invalid module response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Failed(String),
}

/// Failure of a single command dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("{action} is not an action of {module}")]
    InvalidAction { module: String, action: String },

    #[error("invalid timeout for {module} {action}: {value}")]
    InvalidTimeout {
        module: String,
        action: String,
        value: String,
    },

    #[error("action {module} {action} timed out after {timeout_ms}ms")]
    Timeout {
        module: String,
        action: String,
        timeout_ms: u64,
    },

    #[error("action {module} {action} failed: {source}")]
    Action {
        module: String,
        action: String,
        #[source]
        source: ModuleError,
    },

    #[error("action {module} {action} was aborted: {reason}")]
    Aborted {
        module: String,
        action: String,
        reason: String,
    },
}

impl DispatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout { .. })
    }
}
