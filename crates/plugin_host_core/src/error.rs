//! Error types shared across the runtime.
//!
//! # Responsibility
//! - Describe failures raised by plugins, the config store, the entrypoint
//!   table and package marker parsing.
//!
//! # Invariants
//! - None of these errors cross the manager's batch operations; they are
//!   converted into report entries and logged diagnostics.

use std::path::PathBuf;
use thiserror::Error;

pub type PluginResult<T> = Result<T, PluginError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure raised by a plugin implementation.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),

    #[error("plugin panicked: {0}")]
    Panicked(String),

    #[error("invalid plugin config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Shorthand for a free-form plugin failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Config file persistence errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config at `{}` is not a json object", .0.display())]
    NotAnObject(PathBuf),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Entrypoint table registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntrypointError {
    #[error("entrypoint name is invalid: `{0}`")]
    InvalidName(String),

    #[error("entrypoint already registered: {0}")]
    Duplicate(String),
}

/// Package marker errors.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("`{}` is not a plugin package", .0.display())]
    NotAPackage(PathBuf),

    #[error("package marker `{}` is unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("package marker `{}` is malformed: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
}
