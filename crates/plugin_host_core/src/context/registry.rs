//! String-keyed capability registry shared by plugins and the host.

use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

/// One opaque capability: a closure, an object, or any `'static` value.
pub type Service = Rc<dyn Any>;

/// Separator between plugin id and capability name in qualified keys.
pub const SERVICE_KEY_SEPARATOR: char = '.';

/// Builds the conventional qualified key `"<plugin_id>.<capability>"`.
pub fn service_key(plugin_id: &str, capability: &str) -> String {
    format!("{plugin_id}{SERVICE_KEY_SEPARATOR}{capability}")
}

/// Saved registry contents, see [`ServiceRegistry::snapshot`].
pub struct ServiceSnapshot(BTreeMap<String, Service>);

/// Capability map with last-writer-wins semantics.
///
/// No ownership arbitration: any caller may overwrite any key. Callers agree
/// on value types out of band; a lookup with the wrong type is a miss.
#[derive(Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `key`, returning the replaced entry.
    pub fn provide<T: Any>(&mut self, key: impl Into<String>, value: T) -> Option<Service> {
        self.provide_shared(key, Rc::new(value))
    }

    /// Registers an already shared capability under `key`.
    pub fn provide_shared(&mut self, key: impl Into<String>, service: Service) -> Option<Service> {
        self.services.insert(key.into(), service)
    }

    /// Registers `value` under `"<plugin_id>.<capability>"`.
    ///
    /// With `alias`, the bare `capability` key points at the same value.
    pub fn provide_namespaced<T: Any>(
        &mut self,
        plugin_id: &str,
        capability: &str,
        value: T,
        alias: bool,
    ) {
        let service: Service = Rc::new(value);
        if alias {
            self.provide_shared(capability, Rc::clone(&service));
        }
        self.provide_shared(service_key(plugin_id, capability), service);
    }

    /// Typed lookup; `None` when the key is missing or holds another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        let service = self.services.get(key)?;
        Rc::clone(service).downcast::<T>().ok()
    }

    /// Untyped lookup.
    pub fn get_raw(&self, key: &str) -> Option<Service> {
        self.services.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    /// Removes one entry.
    pub fn withdraw(&mut self, key: &str) -> Option<Service> {
        self.services.remove(key)
    }

    /// Returns registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Copies the current entries so they can be put back with [`Self::restore`].
    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot(self.services.clone())
    }

    /// Resets the registry to `snapshot`.
    ///
    /// Returns the keys that were added or replaced since the snapshot.
    pub fn restore(&mut self, snapshot: ServiceSnapshot) -> Vec<String> {
        let changed = self
            .services
            .iter()
            .filter(|(key, service)| {
                snapshot
                    .0
                    .get(*key)
                    .map_or(true, |previous| !Rc::ptr_eq(previous, service))
            })
            .map(|(key, _)| key.clone())
            .collect();
        self.services = snapshot.0;
        changed
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{service_key, ServiceRegistry};
    use std::rc::Rc;

    type Say = Box<dyn Fn(&str) -> String>;

    #[test]
    fn last_writer_wins() {
        let mut registry = ServiceRegistry::new();
        assert!(registry.provide("volume", 1_u32).is_none());
        assert!(registry.provide("volume", 7_u32).is_some());

        assert_eq!(registry.get::<u32>("volume").as_deref(), Some(&7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_or_mistyped_lookup_is_absent() {
        let mut registry = ServiceRegistry::new();
        registry.provide("volume", 1_u32);

        assert!(registry.get::<u32>("missing").is_none());
        assert!(registry.get::<String>("volume").is_none());
        assert!(registry.get_raw("volume").is_some());
    }

    #[test]
    fn namespaced_alias_shares_one_capability() {
        let mut registry = ServiceRegistry::new();
        let say: Say = Box::new(|text| format!("bubble: {text}"));
        registry.provide_namespaced("speech_bubble", "say", say, true);

        assert_eq!(registry.keys(), vec!["say", "speech_bubble.say"]);
        let qualified = registry.get::<Say>("speech_bubble.say").unwrap();
        let alias = registry.get::<Say>("say").unwrap();
        assert!(Rc::ptr_eq(&qualified, &alias));
        assert_eq!(alias("hi"), "bubble: hi");
    }

    #[test]
    fn withdraw_removes_entry() {
        let mut registry = ServiceRegistry::new();
        registry.provide(service_key("clock", "now"), 0_i64);

        assert!(registry.withdraw("clock.now").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn restore_drops_additions_and_puts_back_replaced_values() {
        let mut registry = ServiceRegistry::new();
        registry.provide("say", 1_u32);
        registry.provide("clock.now", 0_i64);
        let snapshot = registry.snapshot();

        registry.provide("say", 2_u32);
        registry.provide("leaky.ping", "pong");
        registry.withdraw("clock.now");
        let changed = registry.restore(snapshot);

        assert_eq!(changed, vec!["leaky.ping", "say"]);
        assert_eq!(registry.keys(), vec!["clock.now", "say"]);
        assert_eq!(registry.get::<u32>("say").as_deref(), Some(&1));
    }
}
