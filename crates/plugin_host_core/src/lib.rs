//! Plugin runtime for a desktop host.
//!
//! Discovers plugin packages under one directory, gives each a persisted JSON
//! config, activates the enabled ones against a shared [`Context`] and lets
//! them contribute menu entries, settings panels and services.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod plugin;

pub use config::{load_config, save_config, ConfigLoad, ConfigMap, LoadStatus, RuntimeOptions};
pub use context::{Context, ContextBuilder, ServiceRegistry};
pub use error::{ConfigError, EntrypointError, PackageError, PluginError, PluginResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use plugin::{
    EntrypointTable, Headless, HostUi, LoadOutcome, Plugin, PluginInfo, PluginManager,
    PluginState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
