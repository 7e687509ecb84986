//! Remote object registry
//!
//! Keeps the `path -> object` mapping, dispatches method calls and property
//! access to the interface handlers, and releases each object's context
//! through its destroy callback once the registry drops its reference.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::error::BusError;
use super::interface::{Context, Interface};
use super::path::ObjectPath;
use super::variant::Variant;

/// Called with the object context when the registry releases it
pub type DestroyCallback = Box<dyn FnOnce(Arc<Context>) + Send + Sync>;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Notification emitted after a committed property write
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChanged {
    pub path: ObjectPath,
    pub interface: String,
    pub property: String,
    pub value: Variant,
}

/// Registry of addressable remote objects
pub trait ObjectRegistry: Send + Sync {
    /// Register an interface descriptor; each name may be registered once
    fn register_interface(&self, interface: Interface) -> Result<(), BusError>;

    fn has_interface(&self, name: &str) -> bool;

    /// Publish `context` at `path` under a registered interface
    ///
    /// The registry keeps one reference to `context`. `on_destroy` receives it
    /// when that reference is released, after [`unregister_object`] and after
    /// any call that was already dispatched to the object has returned. It is
    /// not invoked when registration fails.
    ///
    /// [`unregister_object`]: ObjectRegistry::unregister_object
    fn register_object(
        &self,
        path: &ObjectPath,
        interface: &str,
        context: Arc<Context>,
        on_destroy: Option<DestroyCallback>,
    ) -> Result<(), BusError>;

    /// Remove the object at `path`; false when nothing was registered there
    fn unregister_object(&self, path: &ObjectPath) -> bool;

    fn is_registered(&self, path: &ObjectPath) -> bool;

    fn call_method(
        &self,
        path: &ObjectPath,
        interface: &str,
        method: &str,
        args: &[Variant],
    ) -> Result<Vec<Variant>, BusError>;

    fn get_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> Result<Variant, BusError>;

    /// Write a property; `Ok` is sent to the caller as the completion reply
    fn set_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
        value: Variant,
    ) -> Result<(), BusError>;

    fn get_all_properties(
        &self,
        path: &ObjectPath,
        interface: &str,
    ) -> Result<BTreeMap<String, Variant>, BusError>;

    /// Feed of committed property writes
    fn subscribe(&self) -> broadcast::Receiver<PropertyChanged>;
}

struct ObjectEntry {
    path: ObjectPath,
    interface: Arc<Interface>,
    context: Option<Arc<Context>>,
    on_destroy: Option<DestroyCallback>,
}

impl ObjectEntry {
    fn context(&self) -> Result<&Context, BusError> {
        self.context
            .as_deref()
            .ok_or_else(|| BusError::UnknownObject(self.path.to_string()))
    }
}

impl Drop for ObjectEntry {
    fn drop(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        trace!("Releasing object context for {}", self.path);
        if let Some(on_destroy) = self.on_destroy.take() {
            on_destroy(context);
        }
    }
}

/// In-process registry
pub struct LocalRegistry {
    interfaces: RwLock<HashMap<String, Arc<Interface>>>,
    objects: DashMap<ObjectPath, Arc<ObjectEntry>>,
    changes: broadcast::Sender<PropertyChanged>,
}

impl fmt::Debug for LocalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRegistry")
            .field("interfaces", &self.interfaces.read().len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            interfaces: RwLock::new(HashMap::new()),
            objects: DashMap::new(),
            changes,
        }
    }

    /// Registered object paths in order
    pub fn object_paths(&self) -> Vec<ObjectPath> {
        let mut paths: Vec<ObjectPath> = self.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Take a reference to the entry so it outlives a concurrent unregister
    fn lookup(&self, path: &ObjectPath, interface: &str) -> Result<Arc<ObjectEntry>, BusError> {
        let entry = self
            .objects
            .get(path)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BusError::UnknownObject(path.to_string()))?;

        if entry.interface.name() != interface {
            return Err(BusError::UnknownInterface(interface.to_string()));
        }
        Ok(entry)
    }
}

impl ObjectRegistry for LocalRegistry {
    fn register_interface(&self, interface: Interface) -> Result<(), BusError> {
        let mut interfaces = self.interfaces.write();
        if interfaces.contains_key(interface.name()) {
            return Err(BusError::InterfaceExists(interface.name().to_string()));
        }
        debug!("Interface registered: {}", interface.name());
        interfaces.insert(interface.name().to_string(), Arc::new(interface));
        Ok(())
    }

    fn has_interface(&self, name: &str) -> bool {
        self.interfaces.read().contains_key(name)
    }

    fn register_object(
        &self,
        path: &ObjectPath,
        interface: &str,
        context: Arc<Context>,
        on_destroy: Option<DestroyCallback>,
    ) -> Result<(), BusError> {
        let interface = self
            .interfaces
            .read()
            .get(interface)
            .cloned()
            .ok_or_else(|| BusError::UnknownInterface(interface.to_string()))?;

        match self.objects.entry(path.clone()) {
            Entry::Occupied(_) => Err(BusError::ObjectExists(path.to_string())),
            Entry::Vacant(vacant) => {
                debug!("Object registered: {} ({})", path, interface.name());
                vacant.insert(Arc::new(ObjectEntry {
                    path: path.clone(),
                    interface,
                    context: Some(context),
                    on_destroy,
                }));
                Ok(())
            },
        }
    }

    fn unregister_object(&self, path: &ObjectPath) -> bool {
        // The map guard is released by `remove`; the entry (and possibly the
        // destroy callback) is dropped afterwards.
        match self.objects.remove(path) {
            Some((_, entry)) => {
                debug!("Object unregistered: {}", path);
                drop(entry);
                true
            },
            None => false,
        }
    }

    fn is_registered(&self, path: &ObjectPath) -> bool {
        self.objects.contains_key(path)
    }

    fn call_method(
        &self,
        path: &ObjectPath,
        interface: &str,
        method: &str,
        args: &[Variant],
    ) -> Result<Vec<Variant>, BusError> {
        let entry = self.lookup(path, interface)?;
        let handler = entry
            .interface
            .method(method)
            .ok_or_else(|| BusError::UnknownMethod {
                interface: interface.to_string(),
                method: method.to_string(),
            })?;

        trace!("{} {}.{}", path, interface, method);
        handler.invoke(entry.context()?, args)
    }

    fn get_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> Result<Variant, BusError> {
        let entry = self.lookup(path, interface)?;
        let prop = entry
            .interface
            .property(property)
            .ok_or_else(|| BusError::UnknownProperty {
                interface: interface.to_string(),
                property: property.to_string(),
            })?;

        prop.get(entry.context()?)
    }

    fn set_property(
        &self,
        path: &ObjectPath,
        interface: &str,
        property: &str,
        value: Variant,
    ) -> Result<(), BusError> {
        let entry = self.lookup(path, interface)?;
        let prop = entry
            .interface
            .property(property)
            .ok_or_else(|| BusError::UnknownProperty {
                interface: interface.to_string(),
                property: property.to_string(),
            })?;

        let value = prop.set(entry.context()?, value)?;
        // No subscribers is not an error
        let _ = self.changes.send(PropertyChanged {
            path: path.clone(),
            interface: interface.to_string(),
            property: property.to_string(),
            value,
        });
        Ok(())
    }

    fn get_all_properties(
        &self,
        path: &ObjectPath,
        interface: &str,
    ) -> Result<BTreeMap<String, Variant>, BusError> {
        let entry = self.lookup(path, interface)?;
        let context = entry.context()?;

        entry
            .interface
            .properties()
            .map(|prop| prop.get(context).map(|value| (prop.name().to_string(), value)))
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::bus::InterfaceBuilder;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    const LAMP: &str = "test.Lamp1";

    struct Lamp {
        label: Mutex<String>,
        gate: Option<Arc<(Barrier, Barrier)>>,
    }

    impl Lamp {
        fn new(label: &str) -> Arc<Self> {
            Arc::new(Self {
                label: Mutex::new(label.to_string()),
                gate: None,
            })
        }
    }

    fn lamp_interface() -> Interface {
        InterfaceBuilder::<Lamp>::new(LAMP)
            .method("Echo", "s", "s", |_lamp, args| Ok(args.to_vec()))
            .method("Hold", "", "", |lamp, _args| {
                if let Some(gate) = &lamp.gate {
                    gate.0.wait();
                    gate.1.wait();
                }
                Ok(vec![])
            })
            .property("Power", "b", |_lamp| Ok(Variant::Bool(true)))
            .property_rw(
                "Label",
                "s",
                |lamp| Ok(Variant::Str(lamp.label.lock().clone())),
                |lamp, value| match value {
                    Variant::Str(label) => {
                        *lamp.label.lock() = label.clone();
                        // "slow" writes stall after storing so another write can land
                        if let (Some(gate), "slow") = (&lamp.gate, label.as_str()) {
                            gate.0.wait();
                            gate.1.wait();
                        }
                        Ok(Variant::Str(label))
                    },
                    other => Err(BusError::invalid_args(format!("expected s, got {}", other.signature()))),
                },
            )
            .build()
            .unwrap()
    }

    fn registry() -> LocalRegistry {
        let registry = LocalRegistry::new();
        registry.register_interface(lamp_interface()).unwrap();
        registry
    }

    fn path(s: &str) -> ObjectPath {
        ObjectPath::parse(s).unwrap()
    }

    #[test]
    fn test_interface_registered_once() {
        let registry = registry();
        assert!(registry.has_interface(LAMP));

        let err = registry.register_interface(lamp_interface()).unwrap_err();
        assert_eq!(err, BusError::InterfaceExists(LAMP.to_string()));
    }

    #[test]
    fn test_dispatch_to_registered_object() {
        let registry = registry();
        let lamp_path = path("/lamp_1");
        registry
            .register_object(&lamp_path, LAMP, Lamp::new("desk"), None)
            .unwrap();

        let reply = registry
            .call_method(&lamp_path, LAMP, "Echo", &[Variant::from("hi")])
            .unwrap();
        assert_eq!(reply, vec![Variant::from("hi")]);

        assert_eq!(
            registry.get_property(&lamp_path, LAMP, "Label").unwrap(),
            Variant::from("desk")
        );
        let all = registry.get_all_properties(&lamp_path, LAMP).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["Power"], Variant::Bool(true));
    }

    #[test]
    fn test_dispatch_errors() {
        let registry = registry();
        let lamp_path = path("/lamp_1");
        registry
            .register_object(&lamp_path, LAMP, Lamp::new("desk"), None)
            .unwrap();

        assert!(matches!(
            registry.call_method(&path("/lamp_2"), LAMP, "Echo", &[]),
            Err(BusError::UnknownObject(_))
        ));
        assert!(matches!(
            registry.call_method(&lamp_path, "test.Other1", "Echo", &[]),
            Err(BusError::UnknownInterface(_))
        ));
        assert!(matches!(
            registry.call_method(&lamp_path, LAMP, "Blink", &[]),
            Err(BusError::UnknownMethod { .. })
        ));
        assert!(matches!(
            registry.get_property(&lamp_path, LAMP, "Color"),
            Err(BusError::UnknownProperty { .. })
        ));
        assert!(matches!(
            registry.set_property(&lamp_path, LAMP, "Power", Variant::Bool(false)),
            Err(BusError::PropertyReadOnly(_))
        ));
    }

    #[test]
    fn test_register_rejects_duplicates_and_unknown_interface() {
        let registry = registry();
        let lamp_path = path("/lamp_1");
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        registry
            .register_object(&lamp_path, LAMP, Lamp::new("a"), None)
            .unwrap();
        let err = registry
            .register_object(
                &lamp_path,
                LAMP,
                Lamp::new("b"),
                Some(Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap_err();
        assert_eq!(err, BusError::ObjectExists("/lamp_1".to_string()));
        // A rejected registration never fires its callback
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        assert!(matches!(
            registry.register_object(&path("/lamp_2"), "test.Missing1", Lamp::new("c"), None),
            Err(BusError::UnknownInterface(_))
        ));
        assert_eq!(registry.object_paths(), vec![lamp_path]);
    }

    #[test]
    fn test_unregister_fires_destroy_once() {
        let registry = registry();
        let lamp_path = path("/lamp_1");
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        registry
            .register_object(
                &lamp_path,
                LAMP,
                Lamp::new("desk"),
                Some(Box::new(move |context: Arc<Context>| {
                    assert!(context.downcast::<Lamp>().is_ok());
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(registry.unregister_object(&lamp_path));
        assert!(!registry.unregister_object(&lamp_path));
        assert!(!registry.is_registered(&lamp_path));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroy_deferred_past_in_flight_call() {
        let registry = Arc::new(registry());
        let lamp_path = path("/lamp_1");
        let gate = Arc::new((Barrier::new(2), Barrier::new(2)));
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        let lamp = Arc::new(Lamp {
            label: Mutex::new("desk".to_string()),
            gate: Some(Arc::clone(&gate)),
        });
        registry
            .register_object(
                &lamp_path,
                LAMP,
                lamp,
                Some(Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        let caller = {
            let registry = Arc::clone(&registry);
            let lamp_path = lamp_path.clone();
            std::thread::spawn(move || registry.call_method(&lamp_path, LAMP, "Hold", &[]))
        };

        // Handler is now running
        gate.0.wait();
        assert!(registry.unregister_object(&lamp_path));
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        gate.1.wait();

        assert!(caller.join().unwrap().is_ok());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_property_write_notifies_subscribers() {
        let registry = registry();
        let lamp_path = path("/lamp_1");
        registry
            .register_object(&lamp_path, LAMP, Lamp::new("desk"), None)
            .unwrap();
        let mut changes = registry.subscribe();

        registry
            .set_property(&lamp_path, LAMP, "Label", Variant::from("hall"))
            .unwrap();
        let err = registry
            .set_property(&lamp_path, LAMP, "Label", Variant::Byte(1))
            .unwrap_err();
        assert!(err.is_invalid_args());

        let change = changes.recv().await.unwrap();
        assert_eq!(
            change,
            PropertyChanged {
                path: lamp_path,
                interface: LAMP.to_string(),
                property: "Label".to_string(),
                value: Variant::from("hall"),
            }
        );
        // The rejected write produced no notification
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_overlapping_writes_notify_their_own_values() {
        let registry = Arc::new(registry());
        let lamp_path = path("/lamp_1");
        let gate = Arc::new((Barrier::new(2), Barrier::new(2)));
        let lamp = Arc::new(Lamp {
            label: Mutex::new("desk".to_string()),
            gate: Some(Arc::clone(&gate)),
        });
        registry.register_object(&lamp_path, LAMP, lamp, None).unwrap();
        let mut changes = registry.subscribe();

        let slow_writer = {
            let registry = Arc::clone(&registry);
            let lamp_path = lamp_path.clone();
            std::thread::spawn(move || {
                registry.set_property(&lamp_path, LAMP, "Label", Variant::from("slow"))
            })
        };

        // "slow" is stored but not yet acknowledged
        gate.0.wait();
        registry
            .set_property(&lamp_path, LAMP, "Label", Variant::from("fast"))
            .unwrap();
        gate.1.wait();
        slow_writer.join().unwrap().unwrap();

        let first = changes.try_recv().unwrap();
        let second = changes.try_recv().unwrap();
        assert_eq!(first.value, Variant::from("fast"));
        assert_eq!(second.value, Variant::from("slow"));
        assert!(changes.try_recv().is_err());
    }
}
