//! Remote object bus layer
//!
//! Object paths, typed values, interface descriptors and the registry that
//! dispatches remote method calls and property access to them.

pub mod error;
pub mod interface;
pub mod path;
pub mod registry;
pub mod variant;

pub use error::BusError;
pub use interface::{Context, Interface, InterfaceBuilder, Method, Property};
pub use path::ObjectPath;
pub use registry::{DestroyCallback, LocalRegistry, ObjectRegistry, PropertyChanged};
pub use variant::{Variant, VariantDict};
