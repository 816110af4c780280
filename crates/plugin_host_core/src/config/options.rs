//! Host-level runtime settings.
//!
//! # Responsibility
//! - Describe where plugins live and how their files are named.
//! - Persist host settings through the same store plugins use.
//!
//! # Invariants
//! - Loading never fails: a file with mistyped values falls back to defaults.

use super::store::{load_config, ConfigMap};
use crate::logging::default_log_level;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Default per-plugin config file name inside a package directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "config.json";
/// Package marker file name identifying a plugin package directory.
pub const DEFAULT_MANIFEST_FILE_NAME: &str = "plugin.json";
/// Default plugins root, relative to the working directory.
pub const DEFAULT_PLUGINS_ROOT: &str = "plugins";

/// Runtime settings shared by the host and the plugin manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    pub plugins_root: PathBuf,
    pub config_file_name: String,
    pub manifest_file_name: String,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            plugins_root: PathBuf::from(DEFAULT_PLUGINS_ROOT),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            manifest_file_name: DEFAULT_MANIFEST_FILE_NAME.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RuntimeOptions {
    /// Loads settings from `path`, creating it with defaults when missing.
    ///
    /// Unknown keys in the file are preserved on disk but ignored here.
    pub fn load(path: &Path) -> Self {
        let defaults = Self::default().to_map();
        let loaded = load_config(path, &defaults);
        match serde_json::from_value::<Self>(Value::Object(loaded.values)) {
            Ok(options) => options,
            Err(err) => {
                warn!(
                    "event=options_load module=config status=fallback path={} error={}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Serializes the options as a config object.
    pub fn to_map(&self) -> ConfigMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => ConfigMap::new(),
        }
    }
}
