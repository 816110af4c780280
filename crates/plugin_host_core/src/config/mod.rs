//! Config persistence for plugins and the host.
//!
//! # Responsibility
//! - Provide crash-safe JSON-object storage (`store`).
//! - Define host runtime settings persisted through that storage (`options`).
//!
//! # Invariants
//! - All writes go through the atomic temp-then-rename primitive.

pub mod options;
pub mod store;

pub use options::{
    RuntimeOptions, DEFAULT_CONFIG_FILE_NAME, DEFAULT_MANIFEST_FILE_NAME, DEFAULT_PLUGINS_ROOT,
};
pub use store::{
    backup_path_for, load_config, merge_over_defaults, save_config, ConfigLoad, ConfigMap,
    LoadStatus,
};
