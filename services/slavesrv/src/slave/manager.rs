//! Slave lifecycle management
//!
//! Owns the settings, the `Slave1` interface registration and the set of
//! published slaves. Start/stop follow
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use common::Settings;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::entity::Slave;
use super::interface::{self, SLAVE_INTERFACE};
use crate::bus::{Context, DestroyCallback, ObjectPath, ObjectRegistry};
use crate::error::{Result, SlaveError};
use crate::source::SourceManager;

/// Lifecycle state of a [`SlaveManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerState::Stopped => write!(f, "STOPPED"),
            ManagerState::Starting => write!(f, "STARTING"),
            ManagerState::Running => write!(f, "RUNNING"),
            ManagerState::Stopping => write!(f, "STOPPING"),
        }
    }
}

/// Live slaves by id; never keeps a slave alive on its own
type SlaveIndex = DashMap<u8, Weak<Slave>>;

pub struct SlaveManager {
    registry: Arc<dyn ObjectRegistry>,
    sources: Arc<dyn SourceManager>,
    settings: RwLock<Option<Arc<Settings>>>,
    state: Mutex<ManagerState>,
    index: Arc<SlaveIndex>,
}

impl fmt::Debug for SlaveManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlaveManager")
            .field("state", &*self.state.lock())
            .field("slaves", &self.index.len())
            .finish()
    }
}

impl SlaveManager {
    pub fn new(registry: Arc<dyn ObjectRegistry>, sources: Arc<dyn SourceManager>) -> Self {
        Self {
            registry,
            sources,
            settings: RwLock::new(None),
            state: Mutex::new(ManagerState::Stopped),
            index: Arc::new(DashMap::new()),
        }
    }

    pub fn state(&self) -> ManagerState {
        *self.state.lock()
    }

    /// Settings loaded by [`start`](Self::start), `None` while stopped
    pub fn settings(&self) -> Option<Arc<Settings>> {
        self.settings.read().clone()
    }

    pub fn registry(&self) -> &Arc<dyn ObjectRegistry> {
        &self.registry
    }

    /// Load settings, register the `Slave1` interface and start the sources
    ///
    /// A settings failure leaves the manager stopped with nothing registered.
    /// A rejected interface registration is logged and startup continues;
    /// later `slave_create` calls then fail with a registration error.
    pub fn start(&self, config_path: impl AsRef<Path>) -> Result<()> {
        let config_path = config_path.as_ref();
        self.transition(ManagerState::Stopped, ManagerState::Starting)?;
        info!("Starting slave manager ({})", config_path.display());

        match self.bring_up(config_path) {
            Ok(()) => {
                *self.state.lock() = ManagerState::Running;
                info!("Slave manager running");
                Ok(())
            },
            Err(e) => {
                self.settings.write().take();
                *self.state.lock() = ManagerState::Stopped;
                error!("Slave manager failed to start: {}", e);
                Err(e)
            },
        }
    }

    fn bring_up(&self, config_path: &Path) -> Result<()> {
        let settings = Settings::load_from_file(config_path)?;
        *self.settings.write() = Some(Arc::new(settings));

        self.register_interface();
        self.sources.start()
    }

    fn register_interface(&self) -> bool {
        if self.registry.has_interface(SLAVE_INTERFACE) {
            debug!("{} already registered", SLAVE_INTERFACE);
            return true;
        }

        let registered = interface::build(Arc::clone(&self.sources))
            .and_then(|iface| self.registry.register_interface(iface));
        match registered {
            Ok(()) => true,
            Err(e) => {
                error!("Unable to register {}: {}", SLAVE_INTERFACE, e);
                false
            },
        }
    }

    /// Stop the sources and release the settings
    ///
    /// Slaves still published stay registered; destroy them first for a clean
    /// teardown.
    pub fn stop(&self) {
        if let Err(e) = self.transition(ManagerState::Running, ManagerState::Stopping) {
            debug!("Ignoring stop: {}", e);
            return;
        }

        let live = self.slaves().len();
        if live > 0 {
            warn!("Stopping with {} slave(s) still registered", live);
        }
        self.sources.stop();
        self.settings.write().take();

        *self.state.lock() = ManagerState::Stopped;
        info!("Slave manager stopped");
    }

    fn transition(&self, from: ManagerState, to: ManagerState) -> Result<()> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(SlaveError::state(format!(
                "cannot go {} -> {} while {}",
                from, to, *state
            )));
        }
        *state = to;
        Ok(())
    }

    /// Create a slave and publish it at `/slave_<id as 4 hex digits>`
    ///
    /// Fails with `Conflict` while another live slave uses `id`.
    pub fn slave_create(&self, id: u8, name: &str) -> Result<ObjectPath> {
        let slave = Slave::new(id, name);
        let path = slave.path().clone();
        self.reserve(&slave)?;

        let context: Arc<Context> = Slave::acquire(&slave);
        let registered = self.registry.register_object(
            &path,
            SLAVE_INTERFACE,
            context,
            Some(self.destroy_callback(id)),
        );

        if let Err(e) = registered {
            error!("Can not register {}: {}", path, e);
            self.unreserve(&slave);
            Slave::release(slave);
            return Err(SlaveError::registration(format!("{}: {}", path, e)));
        }

        info!("New slave {}: {}", id, path);
        Ok(path)
    }

    /// Unregister the slave, then remove its sources
    ///
    /// Unregistering first means an `AddSource` still in flight finds no
    /// parent and adds nothing. The entity is freed by the registry's destroy
    /// callback once no call is still running against it.
    pub fn slave_destroy(&self, path: &ObjectPath) -> Result<()> {
        let known = self.slaves().iter().any(|slave| slave.path() == path);
        if !known || !self.registry.unregister_object(path) {
            return Err(SlaveError::not_found(format!("slave {}", path)));
        }
        let removed = self.sources.remove_children(path);

        info!("Slave destroyed: {} ({} source(s) removed)", path, removed);
        Ok(())
    }

    /// Live slaves ordered by id
    pub fn slaves(&self) -> Vec<Arc<Slave>> {
        let mut slaves: Vec<Arc<Slave>> =
            self.index.iter().filter_map(|e| e.value().upgrade()).collect();
        slaves.sort_by_key(|slave| slave.id());
        slaves
    }

    pub fn slave(&self, id: u8) -> Option<Arc<Slave>> {
        self.index.get(&id).and_then(|weak| weak.upgrade())
    }

    fn reserve(&self, slave: &Arc<Slave>) -> Result<()> {
        match self.index.entry(slave.id()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().strong_count() > 0 {
                    return Err(SlaveError::conflict(format!(
                        "slave id {} ({})",
                        slave.id(),
                        slave.path()
                    )));
                }
                occupied.insert(Arc::downgrade(slave));
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::downgrade(slave));
            },
        }
        Ok(())
    }

    fn unreserve(&self, slave: &Arc<Slave>) {
        forget(&self.index, slave);
    }

    fn destroy_callback(&self, id: u8) -> DestroyCallback {
        let index = Arc::clone(&self.index);
        Box::new(move |context: Arc<Context>| match context.downcast::<Slave>() {
            Ok(slave) => {
                forget(&index, &slave);
                debug!("Registry released {}", slave.path());
                Slave::release(slave);
            },
            Err(_) => warn!("Destroy callback for slave {} got a foreign context", id),
        })
    }
}

/// Drop the index entry for `slave` if it still points at it
fn forget(index: &SlaveIndex, slave: &Arc<Slave>) {
    index.remove_if(&slave.id(), |_, weak| {
        std::ptr::eq(weak.as_ptr(), Arc::as_ptr(slave))
    });
}
