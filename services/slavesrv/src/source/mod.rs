//! Source (data point) management
//!
//! A source is a named register range defined on a slave. The slave layer
//! only talks to the [`SourceManager`] trait; [`BusSourceManager`] publishes
//! each source as a remote object below its slave.

mod bus_source;

pub use bus_source::{BusSourceManager, Source, SOURCE_INTERFACE};

use crate::bus::ObjectPath;
use crate::error::Result;

/// Definition of one data point, as received by `AddSource`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDefinition {
    pub name: String,
    /// Register kind, e.g. `holding_register`
    pub kind: String,
    pub address: u16,
    pub size: u16,
}

/// Creates and removes sources under a slave's namespace
pub trait SourceManager: Send + Sync {
    fn start(&self) -> Result<()>;

    fn stop(&self);

    /// Materialize a source below `parent`, returning its path
    fn create(&self, parent: &ObjectPath, definition: &SourceDefinition) -> Result<ObjectPath>;

    /// Unregister the source at `path` and drop its storage
    fn remove(&self, path: &ObjectPath) -> Result<()>;

    /// Remove every source below `parent`; returns how many were removed
    fn remove_children(&self, parent: &ObjectPath) -> usize;
}
