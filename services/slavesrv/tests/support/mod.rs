//! Shared fixtures for slavesrv integration tests

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use slavesrv::bus::{
    BusError, Context, DestroyCallback, Interface, LocalRegistry, ObjectPath, ObjectRegistry,
    PropertyChanged, Variant, VariantDict,
};
use slavesrv::source::{BusSourceManager, SourceDefinition, SourceManager};
use slavesrv::{Result, SlaveManager};
use tokio::sync::broadcast;

pub fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

pub fn default_config() -> tempfile::NamedTempFile {
    write_config("[general]\nname = \"integration\"\n")
}

pub fn source_dict(name: &str, kind: &str, address: u16, size: u16) -> Variant {
    let mut dict = VariantDict::new();
    dict.insert("Name".to_string(), Variant::from(name));
    dict.insert("Type".to_string(), Variant::from(kind));
    dict.insert("Address".to_string(), Variant::UInt16(address));
    dict.insert("Size".to_string(), Variant::UInt16(size));
    Variant::Dict(dict)
}

/// Manager wired to an in-process registry and bus-backed sources
pub struct Fixture {
    pub registry: Arc<LocalRegistry>,
    pub sources: Arc<BusSourceManager>,
    pub manager: SlaveManager,
}

impl Fixture {
    pub fn new() -> Self {
        let registry = Arc::new(LocalRegistry::new());
        let sources = Arc::new(BusSourceManager::new(registry.clone()));
        let manager = SlaveManager::new(registry.clone(), sources.clone());
        Self {
            registry,
            sources,
            manager,
        }
    }

    pub fn started() -> Self {
        let fixture = Self::new();
        fixture.manager.start(default_config().path()).unwrap();
        fixture
    }
}

/// Source manager that counts calls and answers `create` with a fixed path
pub struct CountingSources {
    pub reply: ObjectPath,
    pub creates: AtomicUsize,
    pub removes: AtomicUsize,
}

impl CountingSources {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: ObjectPath::parse(reply).unwrap(),
            creates: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
        }
    }
}

impl SourceManager for CountingSources {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}

    fn create(&self, _parent: &ObjectPath, _definition: &SourceDefinition) -> Result<ObjectPath> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn remove(&self, _path: &ObjectPath) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_children(&self, _parent: &ObjectPath) -> usize {
        0
    }
}

/// Registry that refuses interface registration and records attempts
pub struct RejectingRegistry {
    pub inner: LocalRegistry,
    pub interface_attempts: AtomicUsize,
}

impl RejectingRegistry {
    pub fn new() -> Self {
        Self {
            inner: LocalRegistry::new(),
            interface_attempts: AtomicUsize::new(0),
        }
    }
}

impl ObjectRegistry for RejectingRegistry {
    fn register_interface(&self, interface: Interface) -> std::result::Result<(), BusError> {
        self.interface_attempts.fetch_add(1, Ordering::SeqCst);
        Err(BusError::failed(format!("{} refused", interface.name())))
    }

    fn has_interface(&self, name: &str) -> bool {
        self.inner.has_interface(name)
    }

    fn register_object(
        &self,
        path: &ObjectPath,
        interface: &str,
        context: Arc<Context>,
        on_destroy: Option<DestroyCallback>,
    ) -> std::result::Result<(), BusError> {
        self.inner.register_object(path, interface, context, on_destroy)
    }

    fn unregister_object(&self, path: &ObjectPath) -> bool {
        self.inner.unregister_object(path)
    }

    fn is_registered(&self, path: &ObjectPath) -> bool {
        self.inner.is_registered(path)
    }

    fn call_method(
        &self,
        path: &ObjectPath,
        interface: &str,
        method: &str,
        args: &[Variant],
    ) -> std::result::Result<Vec<Variant>, BusError> {
        self.inner.call_method(path, interface, method, args)
    }

    fn get_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> std::result::Result<Variant, BusError> {
        self.inner.get_property(path, interface, property)
    }

    fn set_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
        value: Variant,
    ) -> std::result::Result<(), BusError> {
        self.inner.set_property(path, interface, property, value)
    }

    fn get_all_properties(
        &self,
        path: &ObjectPath,
        interface: &str,
    ) -> std::result::Result<BTreeMap<String, Variant>, BusError> {
        self.inner.get_all_properties(path, interface)
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.inner.subscribe()
    }
}
