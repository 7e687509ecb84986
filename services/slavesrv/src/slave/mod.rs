//! Slave devices exposed as remote objects

pub mod entity;
pub mod interface;
pub mod manager;

pub use entity::Slave;
pub use interface::SLAVE_INTERFACE;
pub use manager::{ManagerState, SlaveManager};
