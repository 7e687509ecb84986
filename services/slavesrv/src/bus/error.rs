//! Structured error replies returned across the bus boundary

use thiserror::Error;

/// Error reply sent back to a remote caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Unknown object: {0}")]
    UnknownObject(String),

    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    #[error("Unknown method: {interface}.{method}")]
    UnknownMethod { interface: String, method: String },

    #[error("Unknown property: {interface}.{property}")]
    UnknownProperty { interface: String, property: String },

    #[error("Property is read-only: {0}")]
    PropertyReadOnly(String),

    #[error("Object already registered: {0}")]
    ObjectExists(String),

    #[error("Interface already registered: {0}")]
    InterfaceExists(String),

    #[error("Invalid interface definition: {0}")]
    InvalidInterface(String),

    #[error("Operation failed: {0}")]
    Failed(String),
}

impl BusError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        BusError::InvalidArgs(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        BusError::Failed(msg.into())
    }

    /// Wire-level error name
    pub fn name(&self) -> &'static str {
        match self {
            BusError::InvalidArgs(_) => "org.freedesktop.DBus.Error.InvalidArgs",
            BusError::UnknownObject(_) => "org.freedesktop.DBus.Error.UnknownObject",
            BusError::UnknownInterface(_) => "org.freedesktop.DBus.Error.UnknownInterface",
            BusError::UnknownMethod { .. } => "org.freedesktop.DBus.Error.UnknownMethod",
            BusError::UnknownProperty { .. } => "org.freedesktop.DBus.Error.UnknownProperty",
            BusError::PropertyReadOnly(_) => "org.freedesktop.DBus.Error.PropertyReadOnly",
            BusError::ObjectExists(_) | BusError::InterfaceExists(_) => {
                "org.freedesktop.DBus.Error.ObjectPathInUse"
            },
            BusError::InvalidInterface(_) | BusError::Failed(_) => {
                "org.freedesktop.DBus.Error.Failed"
            },
        }
    }

    pub fn is_invalid_args(&self) -> bool {
        matches!(self, BusError::InvalidArgs(_))
    }
}
