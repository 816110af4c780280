//! Plugin contract, discovery and lifecycle management.
//!
//! # Responsibility
//! - Define what a plugin is (`contract`) and how hosts link them (`entrypoint`).
//! - Find plugin packages on disk (`package`).
//! - Drive loading, hooks, saving and unloading (`manager`).

pub mod contract;
pub mod entrypoint;
mod guard;
pub mod manager;
pub mod package;
pub mod registry;
pub mod report;

pub use contract::{is_enabled, Headless, HostUi, Plugin};
pub use entrypoint::{BoxedPlugin, EntrypointTable, PluginFactory};
pub use manager::PluginManager;
pub use package::{read_package, scan_package_names, PackageMarker, PluginPackage};
pub use registry::{PluginInfo, PluginRegistry, PluginSlot, PluginState};
pub use report::{
    HookFailure, HookReport, LoadOutcome, LoadReport, LoadWarning, PackageLoad, SaveReport,
    SettingsPanels, SkipReason, Stage, UnloadReport,
};
