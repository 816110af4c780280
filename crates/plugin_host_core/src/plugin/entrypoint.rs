//! Construction entrypoints linked in by the host.
//!
//! # Responsibility
//! - Map entrypoint names to zero-argument plugin factories.
//! - Stand in for dynamic module import: a package directory names an
//!   entrypoint, the host decides which factories exist.
//!
//! # Invariants
//! - Entrypoint names are unique within one table.
//! - Entrypoint names are lowercase ASCII words joined by `.`, `_` or `-`.

use crate::error::{EntrypointError, PluginResult};
use crate::plugin::contract::{Headless, HostUi, Plugin};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Boxed plugin instance produced by a factory.
pub type BoxedPlugin<U> = Box<dyn Plugin<U>>;

/// Zero-argument plugin factory.
pub type PluginFactory<U> = Box<dyn Fn() -> PluginResult<BoxedPlugin<U>>>;

/// Name → factory table.
pub struct EntrypointTable<U: HostUi = Headless> {
    factories: BTreeMap<String, PluginFactory<U>>,
}

impl<U: HostUi> EntrypointTable<U> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers a fallible factory under `name`.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn() -> PluginResult<BoxedPlugin<U>> + 'static,
    ) -> Result<(), EntrypointError> {
        let name = name.trim();
        if !is_valid_entrypoint_name(name) {
            return Err(EntrypointError::InvalidName(name.to_string()));
        }
        if self.factories.contains_key(name) {
            return Err(EntrypointError::Duplicate(name.to_string()));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Registers an infallible constructor under `name`.
    pub fn register_plugin<P>(
        &mut self,
        name: &str,
        constructor: impl Fn() -> P + 'static,
    ) -> Result<(), EntrypointError>
    where
        P: Plugin<U> + 'static,
    {
        self.register(name, move || Ok(Box::new(constructor()) as BoxedPlugin<U>))
    }

    pub fn get(&self, name: &str) -> Option<&PluginFactory<U>> {
        self.factories.get(name.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name.trim())
    }

    /// Sorted entrypoint names.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<U: HostUi> Default for EntrypointTable<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: HostUi> Debug for EntrypointTable<U> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrypointTable")
            .field("names", &self.names())
            .finish()
    }
}

pub(crate) fn is_valid_entrypoint_name(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

#[cfg(test)]
mod tests {
    use super::{is_valid_entrypoint_name, EntrypointTable};
    use crate::error::{EntrypointError, PluginError};
    use crate::plugin::contract::Plugin;

    struct Named(&'static str);

    impl Plugin for Named {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn registers_and_constructs() {
        let mut table: EntrypointTable = EntrypointTable::new();
        table
            .register_plugin("speech_bubble", || Named("speech_bubble"))
            .expect("registration");

        let factory = table.get("speech_bubble").expect("factory");
        let plugin = factory().expect("construction");
        assert_eq!(plugin.id(), "speech_bubble");
        assert_eq!(table.names(), vec!["speech_bubble"]);
    }

    #[test]
    fn rejects_duplicate_entrypoint() {
        let mut table: EntrypointTable = EntrypointTable::new();
        table
            .register_plugin("clock", || Named("clock"))
            .expect("first registration should succeed");
        let err = table
            .register_plugin("clock", || Named("clock"))
            .expect_err("duplicate registration must fail");
        assert_eq!(err, EntrypointError::Duplicate("clock".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_invalid_names() {
        let mut table: EntrypointTable = EntrypointTable::new();
        let err = table
            .register_plugin("Bad Name", || Named("x"))
            .expect_err("invalid name must fail");
        assert!(matches!(err, EntrypointError::InvalidName(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn fallible_factory_surfaces_error() {
        let mut table: EntrypointTable = EntrypointTable::new();
        table
            .register("broken", || Err(PluginError::failed("no display")))
            .expect("registration");

        let factory = table.get("broken").expect("factory");
        assert!(factory().is_err());
    }

    #[test]
    fn entrypoint_name_rules() {
        assert!(is_valid_entrypoint_name("speech_bubble"));
        assert!(is_valid_entrypoint_name("pet.tools-2"));
        assert!(!is_valid_entrypoint_name(""));
        assert!(!is_valid_entrypoint_name("_private"));
        assert!(!is_valid_entrypoint_name("a..b"));
        assert!(!is_valid_entrypoint_name("trailing_"));
    }
}
