//! Per-plugin outcome records returned by manager batch operations.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Lifecycle step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Construction,
    Config,
    Activation,
    Deactivation,
    MenuHook,
    SettingsWidget,
    SaveConfig,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::Config => "config",
            Self::Activation => "activation",
            Self::Deactivation => "deactivation",
            Self::MenuHook => "menu_hook",
            Self::SettingsWidget => "settings_widget",
            Self::SaveConfig => "save_config",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a package was skipped without constructing a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAPackage,
    MalformedMarker(String),
    MissingEntrypoint(String),
}

/// Outcome of loading one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Registered and activated.
    Activated { plugin_id: String },
    /// Registered, config says disabled; never activated.
    Disabled { plugin_id: String },
    /// Nothing constructed, nothing registered.
    Skipped(SkipReason),
    /// Another registered plugin already uses this id.
    Rejected { plugin_id: String },
    /// Construction or activation failed; not registered.
    Failed { stage: Stage, message: String },
}

impl LoadOutcome {
    /// Whether the plugin ended up in the registry.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Activated { .. } | Self::Disabled { .. })
    }
}

/// Non-fatal diagnostic raised while loading a plugin that still registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub stage: Stage,
    pub message: String,
}

/// One package's load record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLoad {
    pub package: String,
    pub outcome: LoadOutcome,
    pub warnings: Vec<LoadWarning>,
}

/// Result of `load_all`, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub packages: Vec<PackageLoad>,
}

impl LoadReport {
    /// Ids of plugins that were activated.
    pub fn activated(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter_map(|entry| match &entry.outcome {
                LoadOutcome::Activated { plugin_id } => Some(plugin_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of plugins registered as disabled.
    pub fn disabled(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter_map(|entry| match &entry.outcome {
                LoadOutcome::Disabled { plugin_id } => Some(plugin_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Package records whose plugin was not registered.
    pub fn unregistered(&self) -> Vec<&PackageLoad> {
        self.packages
            .iter()
            .filter(|entry| !entry.outcome.is_registered())
            .collect()
    }

    pub fn outcome_of(&self, package: &str) -> Option<&LoadOutcome> {
        self.packages
            .iter()
            .find(|entry| entry.package == package)
            .map(|entry| &entry.outcome)
    }
}

/// One plugin's failure inside a hook batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub plugin_id: String,
    pub stage: Stage,
    pub message: String,
}

/// Result of a hook batch (menu extension).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// Plugins whose hook ran to completion.
    pub invoked: Vec<String>,
    pub failures: Vec<HookFailure>,
}

/// Result of `unload_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnloadReport {
    pub deactivated: Vec<String>,
    /// Registered but never activated, so not deactivated.
    pub released: Vec<String>,
    pub failures: Vec<HookFailure>,
}

/// Settings panels collected from registered plugins.
#[derive(Debug)]
pub struct SettingsPanels<W> {
    pub panels: Vec<(String, W)>,
    pub failures: Vec<HookFailure>,
}

impl<W> Default for SettingsPanels<W> {
    fn default() -> Self {
        Self {
            panels: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Result of `save_all_plugin_configs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: Vec<(String, PathBuf)>,
    /// Plugins whose config was not a JSON object.
    pub skipped: Vec<String>,
    pub failures: Vec<HookFailure>,
}
