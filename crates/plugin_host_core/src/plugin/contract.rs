//! Plugin capability contract.
//!
//! # Responsibility
//! - Define the lifecycle/UI methods a plugin may implement.
//! - Give every optional method a no-op default so the manager never has to
//!   check for support.
//!
//! # Invariants
//! - `activate` is the only way a plugin learns of the [`Context`].
//! - A plugin must drop any retained [`Context`] in `deactivate`.

use crate::config::ConfigMap;
use crate::context::Context;
use crate::error::PluginResult;
use serde_json::Value;
use std::path::PathBuf;

/// Host-defined handle types passed through the UI hooks.
///
/// The runtime never inspects these values.
pub trait HostUi: 'static {
    /// Menu-building handle given to `extend_context_menu`.
    type Menu;
    /// Parent handle given to `create_settings_widget`.
    type Parent;
    /// Widget returned by `create_settings_widget`.
    type Widget;
}

/// UI surface for hosts without menus or settings panels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl HostUi for Headless {
    type Menu = ();
    type Parent = ();
    type Widget = ();
}

/// A self-contained extension unit.
///
/// Only [`Plugin::id`] is required.
pub trait Plugin<U: HostUi = Headless> {
    /// Stable identifier, unique among registered plugins.
    fn id(&self) -> &str;

    fn name(&self) -> &str {
        self.id()
    }

    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Called once when the plugin is enabled. Services may be registered
    /// into `ctx` here.
    fn activate(&mut self, _ctx: &Context) -> PluginResult<()> {
        Ok(())
    }

    /// Called at shutdown for activated plugins only.
    fn deactivate(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Adds entries to the host's context menu. Only called while active.
    fn extend_context_menu(&self, _menu: &mut U::Menu) -> PluginResult<()> {
        Ok(())
    }

    /// Custom config location; `None` selects `<package_dir>/config.json`.
    fn config_path(&self) -> Option<PathBuf> {
        None
    }

    /// Config defaults. A non-object value is treated as `{}`.
    fn default_config(&self) -> Value {
        Value::Object(ConfigMap::new())
    }

    /// Receives the merged (or freshly saved) config.
    ///
    /// The manager keeps its own copy, so plugins that only need the cached
    /// config can rely on the default.
    fn load_config(&mut self, _cfg: &ConfigMap) -> PluginResult<()> {
        Ok(())
    }

    /// Builds a settings panel; `Ok(None)` means no panel.
    fn create_settings_widget(
        &mut self,
        _parent: &mut U::Parent,
    ) -> PluginResult<Option<U::Widget>> {
        Ok(None)
    }

    /// Reads edited values back from the settings panel.
    ///
    /// `Ok(None)` means "no panel state"; the cached config is saved instead.
    fn collect_config_from_widget(&mut self) -> PluginResult<Option<Value>> {
        Ok(None)
    }
}

/// Coerces plugin-supplied defaults into a config object.
pub(crate) fn defaults_as_object(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        _ => ConfigMap::new(),
    }
}

/// Reads the `enabled` switch with JSON truthiness; a missing key is `true`.
pub fn is_enabled(cfg: &ConfigMap) -> bool {
    cfg.get("enabled").map_or(true, is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::{defaults_as_object, is_enabled, Plugin};
    use crate::config::ConfigMap;
    use serde_json::json;

    struct Bare;

    impl Plugin for Bare {
        fn id(&self) -> &str {
            "bare"
        }
    }

    fn object(value: serde_json::Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults_are_no_ops() {
        let mut plugin = Bare;
        assert_eq!(plugin.name(), "bare");
        assert_eq!(plugin.version(), "0.0.0");
        assert!(plugin.config_path().is_none());
        assert_eq!(plugin.default_config(), json!({}));
        assert!(plugin.create_settings_widget(&mut ()).unwrap().is_none());
        assert!(plugin.collect_config_from_widget().unwrap().is_none());
        plugin.deactivate().unwrap();
    }

    #[test]
    fn non_object_defaults_become_empty() {
        assert!(defaults_as_object(json!([1, 2])).is_empty());
        assert_eq!(defaults_as_object(json!({"a": 1})), object(json!({"a": 1})));
    }

    #[test]
    fn enabled_switch_follows_json_truthiness() {
        assert!(is_enabled(&ConfigMap::new()));
        assert!(is_enabled(&object(json!({"enabled": true}))));
        assert!(is_enabled(&object(json!({"enabled": "yes"}))));
        assert!(is_enabled(&object(json!({"enabled": 2}))));
        assert!(!is_enabled(&object(json!({"enabled": false}))));
        assert!(!is_enabled(&object(json!({"enabled": 0}))));
        assert!(!is_enabled(&object(json!({"enabled": null}))));
        assert!(!is_enabled(&object(json!({"enabled": ""}))));
        assert!(!is_enabled(&object(json!({"enabled": []}))));
    }
}
