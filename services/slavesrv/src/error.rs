//! Error handling for the slave service

use thiserror::Error;

use crate::bus::BusError;

/// Slave service error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlaveError {
    /// Malformed, missing or unrecognized input
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Allocation failure while bringing the service up
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Settings file missing or unparsable
    #[error("IO error: {0}")]
    IoFailure(String),

    /// Interface or object registration rejected by the registry
    #[error("Registration failed: {0}")]
    RegistrationFailure(String),

    /// Identifier or name already in use
    #[error("Conflict: {0} already exists")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current lifecycle state
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for the slave service
pub type Result<T> = std::result::Result<T, SlaveError>;

impl SlaveError {
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        SlaveError::InvalidArguments(msg.into())
    }

    pub fn registration(msg: impl Into<String>) -> Self {
        SlaveError::RegistrationFailure(msg.into())
    }

    pub fn conflict(resource: impl Into<String>) -> Self {
        SlaveError::Conflict(resource.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        SlaveError::NotFound(resource.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        SlaveError::State(msg.into())
    }

    /// Process exit status for a startup failure (errno values)
    pub fn exit_code(&self) -> i32 {
        match self {
            SlaveError::InvalidArguments(_) => 22,    // EINVAL
            SlaveError::ResourceExhausted(_) => 12,   // ENOMEM
            SlaveError::IoFailure(_) => 5,            // EIO
            SlaveError::RegistrationFailure(_) => 71, // EPROTO
            SlaveError::Conflict(_) => 17,            // EEXIST
            SlaveError::NotFound(_) => 2,             // ENOENT
            SlaveError::State(_) => 16,               // EBUSY
        }
    }
}

impl From<common::Error> for SlaveError {
    fn from(err: common::Error) -> Self {
        match err {
            common::Error::ResourceExhausted(msg) => SlaveError::ResourceExhausted(msg),
            common::Error::Io(e) => SlaveError::IoFailure(e.to_string()),
            common::Error::Parse(msg) => SlaveError::IoFailure(msg),
            common::Error::Config(msg) => SlaveError::InvalidArguments(msg),
            common::Error::Logging(msg) => SlaveError::State(msg),
        }
    }
}

impl From<SlaveError> for BusError {
    fn from(err: SlaveError) -> Self {
        match err {
            SlaveError::InvalidArguments(msg) => BusError::InvalidArgs(msg),
            other => BusError::Failed(other.to_string()),
        }
    }
}
