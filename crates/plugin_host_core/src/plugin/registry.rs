//! In-process registry of constructed plugins.
//!
//! # Invariants
//! - Plugin ids are unique; a second registration under a taken id is refused.
//! - Iteration follows registration order, which is sorted package order.
//! - Membership means "constructed and configured", not "activated".

use crate::config::ConfigMap;
use crate::plugin::contract::{HostUi, Plugin};
use crate::plugin::entrypoint::BoxedPlugin;
use std::path::{Path, PathBuf};

/// Activation state of a registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Enabled and activated; holds the context.
    Active,
    /// Registered for settings display only; never activated.
    Disabled,
}

/// Registry entry for one plugin.
pub struct PluginSlot<U: HostUi> {
    pub(crate) plugin: BoxedPlugin<U>,
    pub(crate) package: String,
    /// `None` while the plugin has no config (its defaults or path failed).
    pub(crate) config_path: Option<PathBuf>,
    /// `None` when no config was obtained during load.
    pub(crate) cfg: Option<ConfigMap>,
    pub(crate) state: PluginState,
}

impl<U: HostUi> PluginSlot<U> {
    pub fn id(&self) -> &str {
        self.plugin.id()
    }

    pub fn plugin(&self) -> &dyn Plugin<U> {
        self.plugin.as_ref()
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Cached config as last loaded or saved.
    pub fn config(&self) -> Option<&ConfigMap> {
        self.cfg.as_ref()
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PluginState::Active
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            id: self.plugin.id().to_string(),
            name: self.plugin.name().to_string(),
            version: self.plugin.version().to_string(),
            package: self.package.clone(),
            config_path: self.config_path.clone(),
            state: self.state,
        }
    }
}

/// Read-only snapshot of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub package: String,
    pub config_path: Option<PathBuf>,
    pub state: PluginState,
}

impl PluginInfo {
    pub fn enabled(&self) -> bool {
        self.state == PluginState::Active
    }
}

/// Ordered id → slot registry.
pub struct PluginRegistry<U: HostUi> {
    slots: Vec<PluginSlot<U>>,
}

impl<U: HostUi> PluginRegistry<U> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds `slot`; hands it back when its id is already taken.
    pub(crate) fn register(&mut self, slot: PluginSlot<U>) -> Result<(), PluginSlot<U>> {
        if self.contains(slot.id()) {
            return Err(slot);
        }
        self.slots.push(slot);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.iter().any(|slot| slot.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&PluginSlot<U>> {
        self.slots.iter().find(|slot| slot.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut PluginSlot<U>> {
        self.slots.iter_mut().find(|slot| slot.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginSlot<U>> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PluginSlot<U>> {
        self.slots.iter_mut()
    }

    /// Drains all slots in registration order.
    pub(crate) fn drain(&mut self) -> Vec<PluginSlot<U>> {
        std::mem::take(&mut self.slots)
    }

    pub fn ids(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<U: HostUi> Default for PluginRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{PluginRegistry, PluginSlot, PluginState};
    use crate::config::ConfigMap;
    use crate::plugin::contract::{Headless, Plugin};
    use std::path::PathBuf;

    struct Named(&'static str, &'static str);

    impl Plugin for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.1
        }
    }

    fn slot(id: &'static str, name: &'static str, state: PluginState) -> PluginSlot<Headless> {
        PluginSlot {
            plugin: Box::new(Named(id, name)),
            package: id.to_string(),
            config_path: Some(PathBuf::from(format!("/plugins/{id}/config.json"))),
            cfg: Some(ConfigMap::new()),
            state,
        }
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = PluginRegistry::new();
        assert!(registry.register(slot("b", "B", PluginState::Active)).is_ok());
        assert!(registry.register(slot("a", "A", PluginState::Disabled)).is_ok());

        assert_eq!(registry.ids(), vec!["b", "a"]);
        assert!(registry.get("a").is_some_and(|entry| !entry.is_active()));
    }

    #[test]
    fn refuses_taken_id_and_returns_slot() {
        let mut registry = PluginRegistry::new();
        assert!(registry.register(slot("pet", "First", PluginState::Active)).is_ok());
        let refused = registry
            .register(slot("pet", "Second", PluginState::Active))
            .err()
            .expect("duplicate must be refused");

        assert_eq!(refused.plugin().name(), "Second");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("pet").map(|entry| entry.info().name), Some("First".into()));
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = PluginRegistry::new();
        assert!(registry.register(slot("a", "A", PluginState::Active)).is_ok());

        assert_eq!(registry.drain().len(), 1);
        assert!(registry.is_empty());
    }
}
