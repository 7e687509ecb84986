//! Slave entity

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::bus::ObjectPath;

/// Local proxy for one Modbus device
///
/// Shared as `Arc<Slave>`: the registry holds one reference for as long as
/// the slave is published and in-flight calls hold their own. The entity is
/// freed when the last reference goes.
#[derive(Debug)]
pub struct Slave {
    id: u8,
    name: RwLock<String>,
    path: ObjectPath,
}

impl Slave {
    pub fn new(id: u8, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: RwLock::new(name.to_string()),
            path: Self::path_for(id),
        })
    }

    /// `/slave_<4 lower-case hex digits>`
    pub fn path_for(id: u8) -> ObjectPath {
        ObjectPath::from_trusted(format!("/slave_{:04x}", id))
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Replace the name, returning the previous one
    pub fn set_name(&self, name: impl Into<String>) -> String {
        std::mem::replace(&mut *self.name.write(), name.into())
    }

    /// Take another reference
    pub fn acquire(this: &Arc<Self>) -> Arc<Self> {
        Arc::clone(this)
    }

    /// Drop one reference; true when it was the last one and the slave was freed
    ///
    /// Of several concurrent releases of the remaining references, exactly one
    /// returns true.
    pub fn release(this: Arc<Self>) -> bool {
        Arc::into_inner(this).is_some()
    }

    pub fn ref_count(this: &Arc<Self>) -> usize {
        Arc::strong_count(this)
    }
}

impl Drop for Slave {
    fn drop(&mut self) {
        debug!("Slave {} freed", self.path);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_path_is_four_hex_digits() {
        assert_eq!(Slave::path_for(0).as_str(), "/slave_0000");
        assert_eq!(Slave::path_for(1).as_str(), "/slave_0001");
        assert_eq!(Slave::path_for(0xab).as_str(), "/slave_00ab");
        assert_eq!(Slave::path_for(255).as_str(), "/slave_00ff");
    }

    #[test]
    fn test_new_copies_fields() {
        let slave = Slave::new(7, "boiler");
        assert_eq!(slave.id(), 7);
        assert_eq!(slave.name(), "boiler");
        assert_eq!(slave.path(), &Slave::path_for(7));
        assert_eq!(Slave::ref_count(&slave), 1);
    }

    #[test]
    fn test_set_name_returns_previous() {
        let slave = Slave::new(1, "");
        assert_eq!(slave.set_name("pump"), "");
        assert_eq!(slave.name(), "pump");
    }

    #[test]
    fn test_release_frees_only_on_last_reference() {
        let slave = Slave::new(1, "pump");
        let weak = Arc::downgrade(&slave);
        let held: Vec<_> = (0..5).map(|_| Slave::acquire(&slave)).collect();
        assert_eq!(Slave::ref_count(&slave), 6);

        for reference in held {
            assert!(!Slave::release(reference));
            assert!(weak.upgrade().is_some());
        }
        assert!(Slave::release(slave));
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_concurrent_release_frees_exactly_once() {
        const OWNERS: usize = 16;

        for _ in 0..50 {
            let slave = Slave::new(3, "meter");
            let weak = Arc::downgrade(&slave);
            let start = Arc::new(Barrier::new(OWNERS));
            let freed = Arc::new(AtomicUsize::new(0));

            let mut references: Vec<_> = (1..OWNERS).map(|_| Slave::acquire(&slave)).collect();
            references.push(slave);

            let handles: Vec<_> = references
                .into_iter()
                .map(|reference| {
                    let start = Arc::clone(&start);
                    let freed = Arc::clone(&freed);
                    std::thread::spawn(move || {
                        start.wait();
                        if Slave::release(reference) {
                            freed.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(freed.load(Ordering::SeqCst), 1);
            assert!(weak.upgrade().is_none());
        }
    }
}
