//! Process-wide plugin context.
//!
//! # Responsibility
//! - Carry the service registry, an opaque host handle and the logging sink.
//! - Be built once at startup and handed to every activated plugin.
//!
//! # Invariants
//! - One context per process lifetime; clones share the same state.
//! - Confined to the controlling thread (`Rc`/`RefCell`, `!Send`), so the
//!   registry needs no locking.
//! - Registry borrows never outlive a single `with_services*` call.

mod registry;

pub use registry::{service_key, Service, ServiceRegistry, ServiceSnapshot, SERVICE_KEY_SEPARATOR};

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Logging sink receiving one formatted line per call.
pub type LogSink = Rc<dyn Fn(&str)>;

struct ContextInner {
    host: Option<Rc<dyn Any>>,
    services: RefCell<ServiceRegistry>,
    sink: LogSink,
}

/// Shared handle to the plugin context.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    /// Creates a context without host handle, logging through `log::info!`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Writes one line to the logging sink.
    pub fn log(&self, line: &str) {
        (self.inner.sink)(line);
    }

    /// Returns the host handle when it has type `T`.
    pub fn host<T: Any>(&self) -> Option<Rc<T>> {
        let host = self.inner.host.as_ref()?;
        Rc::clone(host).downcast::<T>().ok()
    }

    /// Runs `f` with shared access to the registry.
    pub fn with_services<R>(&self, f: impl FnOnce(&ServiceRegistry) -> R) -> R {
        f(&self.inner.services.borrow())
    }

    /// Runs `f` with exclusive access to the registry.
    ///
    /// `f` must not call back into this context's registry.
    pub fn with_services_mut<R>(&self, f: impl FnOnce(&mut ServiceRegistry) -> R) -> R {
        f(&mut self.inner.services.borrow_mut())
    }

    /// Registers `value` under `key`; last writer wins.
    pub fn provide<T: Any>(&self, key: impl Into<String>, value: T) -> Option<Service> {
        self.with_services_mut(|services| services.provide(key, value))
    }

    /// Registers `value` under `"<plugin_id>.<capability>"` (plus the bare
    /// alias when requested).
    pub fn provide_namespaced<T: Any>(
        &self,
        plugin_id: &str,
        capability: &str,
        value: T,
        alias: bool,
    ) {
        self.with_services_mut(|services| {
            services.provide_namespaced(plugin_id, capability, value, alias)
        });
    }

    /// Typed service lookup; `None` when missing or of another type.
    pub fn service<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        self.with_services(|services| services.get::<T>(key))
    }

    pub fn has_service(&self, key: &str) -> bool {
        self.with_services(|services| services.contains(key))
    }

    /// Sorted registered service keys.
    pub fn service_keys(&self) -> Vec<String> {
        self.with_services(ServiceRegistry::keys)
    }

    /// Returns whether both handles point at the same context.
    pub fn same_as(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("has_host", &self.inner.host.is_some())
            .field("services", &self.service_keys())
            .finish()
    }
}

/// Builder for [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    host: Option<Rc<dyn Any>>,
    sink: Option<LogSink>,
}

impl ContextBuilder {
    /// Attaches the opaque host handle.
    pub fn host<T: Any>(mut self, host: T) -> Self {
        self.host = Some(Rc::new(host));
        self
    }

    /// Replaces the default logging sink.
    pub fn logger(mut self, sink: impl Fn(&str) + 'static) -> Self {
        self.sink = Some(Rc::new(sink));
        self
    }

    pub fn build(self) -> Context {
        let sink = self.sink.unwrap_or_else(|| Rc::new(default_sink));
        Context {
            inner: Rc::new(ContextInner {
                host: self.host,
                services: RefCell::new(ServiceRegistry::new()),
                sink,
            }),
        }
    }
}

fn default_sink(line: &str) {
    log::info!(target: "plugin_host::context", "{line}");
}
