//! Sources published as remote objects

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{SourceDefinition, SourceManager};
use crate::bus::{BusError, Interface, InterfaceBuilder, ObjectPath, ObjectRegistry, Variant};
use crate::error::{Result, SlaveError};

pub const SOURCE_INTERFACE: &str = "br.org.cesar.modbus.Source1";

/// A data point published at `<slave path>/source_<n>`
#[derive(Debug)]
pub struct Source {
    path: ObjectPath,
    definition: SourceDefinition,
}

impl Source {
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn definition(&self) -> &SourceDefinition {
        &self.definition
    }
}

fn source_interface() -> std::result::Result<Interface, BusError> {
    InterfaceBuilder::<Source>::new(SOURCE_INTERFACE)
        .property("Name", "s", |source| {
            Ok(Variant::Str(source.definition().name.clone()))
        })
        .property("Type", "s", |source| {
            Ok(Variant::Str(source.definition().kind.clone()))
        })
        .property("Address", "q", |source| {
            Ok(Variant::UInt16(source.definition().address))
        })
        .property("Size", "q", |source| Ok(Variant::UInt16(source.definition().size)))
        .build()
}

/// [`SourceManager`] backed by an [`ObjectRegistry`]
pub struct BusSourceManager {
    registry: Arc<dyn ObjectRegistry>,
    sources: DashMap<ObjectPath, Arc<Source>>,
    /// Last index handed out per slave path
    counters: DashMap<ObjectPath, u32>,
    /// Serializes creation against parent removal and duplicate-name checks
    create_lock: Mutex<()>,
    running: AtomicBool,
}

impl std::fmt::Debug for BusSourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusSourceManager")
            .field("sources", &self.sources.len())
            .field("running", &self.running.load(Ordering::Acquire))
            .finish()
    }
}

impl BusSourceManager {
    pub fn new(registry: Arc<dyn ObjectRegistry>) -> Self {
        Self {
            registry,
            sources: DashMap::new(),
            counters: DashMap::new(),
            create_lock: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }

    pub fn get(&self, path: &ObjectPath) -> Option<Arc<Source>> {
        self.sources.get(path).map(|s| Arc::clone(s.value()))
    }

    /// Sources below `parent`, ordered by path
    pub fn list(&self, parent: &ObjectPath) -> Vec<Arc<Source>> {
        let mut sources: Vec<Arc<Source>> = self
            .sources
            .iter()
            .filter(|s| s.key().is_descendant_of(parent))
            .map(|s| Arc::clone(s.value()))
            .collect();
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources
    }

    fn next_path(&self, parent: &ObjectPath) -> Result<ObjectPath> {
        let index = {
            let mut counter = self.counters.entry(parent.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        parent
            .child(&format!("source_{}", index))
            .map_err(|e| SlaveError::invalid_arguments(e.to_string()))
    }
}

impl SourceManager for BusSourceManager {
    fn start(&self) -> Result<()> {
        if !self.registry.has_interface(SOURCE_INTERFACE) {
            source_interface()
                .and_then(|iface| self.registry.register_interface(iface))
                .map_err(|e| SlaveError::registration(format!("{}: {}", SOURCE_INTERFACE, e)))?;
        }
        self.running.store(true, Ordering::Release);
        info!("Source manager started");
        Ok(())
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let paths: Vec<ObjectPath> = self.sources.iter().map(|s| s.key().clone()).collect();
        for path in &paths {
            self.sources.remove(path);
            self.registry.unregister_object(path);
        }
        self.counters.clear();
        info!("Source manager stopped ({} source(s) released)", paths.len());
    }

    fn create(&self, parent: &ObjectPath, definition: &SourceDefinition) -> Result<ObjectPath> {
        if !self.running.load(Ordering::Acquire) {
            return Err(SlaveError::state("source manager is not running"));
        }

        let _guard = self.create_lock.lock();
        // The parent may have been unregistered while this call was in flight
        if !self.registry.is_registered(parent) {
            return Err(SlaveError::not_found(format!("parent {}", parent)));
        }
        let duplicate = self
            .sources
            .iter()
            .any(|s| s.key().is_descendant_of(parent) && s.definition.name == definition.name);
        if duplicate {
            return Err(SlaveError::conflict(format!(
                "source '{}' on {}",
                definition.name, parent
            )));
        }

        let path = self.next_path(parent)?;
        let source = Arc::new(Source {
            path: path.clone(),
            definition: definition.clone(),
        });
        self.registry
            .register_object(&path, SOURCE_INTERFACE, source.clone(), None)
            .map_err(|e| SlaveError::registration(format!("{}: {}", path, e)))?;
        self.sources.insert(path.clone(), source);

        info!(
            "New source {}: {} {}@{} x{}",
            path, definition.name, definition.kind, definition.address, definition.size
        );
        Ok(path)
    }

    fn remove(&self, path: &ObjectPath) -> Result<()> {
        if self.sources.remove(path).is_none() {
            return Err(SlaveError::not_found(format!("source {}", path)));
        }
        if !self.registry.unregister_object(path) {
            warn!("Source {} was already unregistered", path);
        }
        info!("Source removed: {}", path);
        Ok(())
    }

    fn remove_children(&self, parent: &ObjectPath) -> usize {
        let _guard = self.create_lock.lock();
        let paths: Vec<ObjectPath> = self
            .sources
            .iter()
            .filter(|s| s.key().is_descendant_of(parent))
            .map(|s| s.key().clone())
            .collect();

        for path in &paths {
            self.sources.remove(path);
            self.registry.unregister_object(path);
        }
        self.counters.remove(parent);
        debug!("Removed {} source(s) below {}", paths.len(), parent);
        paths.len()
    }
}
