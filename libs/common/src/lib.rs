//! Shared service plumbing for the Modbus gateway nodes
//!
//! - settings store (configuration file loading)
//! - logging bootstrap
//! - graceful shutdown signals

pub mod error;
pub mod logging;
pub mod settings;
pub mod shutdown;

pub use error::{Error, Result};
pub use settings::Settings;
pub use shutdown::{wait_for_shutdown, ShutdownSignal};
