//! Modbus gateway slave node
//!
//! Exposes each configured Modbus slave device as a remote object on the
//! gateway bus and lets remote callers define data points ("sources") on it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  SlaveManager   │───►│ ObjectRegistry  │◄───│  Remote caller  │
//! │ (start / stop)  │    │ (paths, dispatch)│    │ (methods/props) │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!          │                      ▲
//!          ▼                      │
//! ┌─────────────────┐    ┌─────────────────┐
//! │    Settings     │    │  SourceManager  │
//! │  (config file)  │    │ (source objects)│
//! └─────────────────┘    └─────────────────┘
//! ```
//!
//! - **`bus`**: object paths, typed values, interface tables and the registry
//! - **`slave`**: the `Slave` entity, its `Slave1` interface and the manager
//! - **`source`**: source definitions and the source manager
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use slavesrv::bus::{LocalRegistry, ObjectRegistry, Variant};
//! use slavesrv::slave::{SlaveManager, SLAVE_INTERFACE};
//! use slavesrv::source::BusSourceManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = tempfile::tempdir()?;
//! # let config = dir.path().join("slavesrv.toml");
//! # std::fs::write(&config, "[general]\nname = \"demo\"\n")?;
//! let registry = Arc::new(LocalRegistry::new());
//! let sources = Arc::new(BusSourceManager::new(registry.clone()));
//! let manager = SlaveManager::new(registry.clone(), sources);
//!
//! manager.start(&config)?;
//! let path = manager.slave_create(1, "boiler")?;
//! assert_eq!(path.as_str(), "/slave_0001");
//! assert_eq!(
//!     registry.get_property(&path, SLAVE_INTERFACE, "Id")?,
//!     Variant::Byte(1)
//! );
//!
//! manager.slave_destroy(&path)?;
//! manager.stop();
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod error;
pub mod slave;
pub mod source;

pub use error::{Result, SlaveError};
pub use slave::{Slave, SlaveManager};
