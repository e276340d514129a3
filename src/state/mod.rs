/// Poll lifecycle phases and guard helpers.
pub mod phase;
/// Per-poll connection rooms and serialization gates.
pub mod rooms;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{poll::PollRepository, poll_store::PollStore},
    error::ServiceError,
};

pub use self::rooms::{ClientConnection, PollRoom, RoomRegistry};

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing live connections and the store handle.
pub struct AppState {
    poll_store: RwLock<Option<Arc<dyn PollStore>>>,
    rooms: RoomRegistry,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            poll_store: RwLock::new(None),
            rooms: RoomRegistry::new(),
            degraded: degraded_tx,
            config,
        })
    }

    /// Obtain a handle to the current poll store, if one is installed.
    pub async fn poll_store(&self) -> Option<Arc<dyn PollStore>> {
        let guard = self.poll_store.read().await;
        guard.as_ref().cloned()
    }

    /// Repository bound to the current store; fails fast while degraded.
    pub async fn repository(&self) -> Result<PollRepository, ServiceError> {
        let store = self.poll_store().await.ok_or(ServiceError::Degraded)?;
        Ok(PollRepository::new(store, self.config.poll_ttl()))
    }

    /// Install a new poll store implementation and leave degraded mode.
    pub async fn set_poll_store(&self, store: Arc<dyn PollStore>) {
        {
            let mut guard = self.poll_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current poll store and enter degraded mode.
    pub async fn clear_poll_store(&self) {
        {
            let mut guard = self.poll_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    ///
    /// Distinct from store presence: the supervisor may flag degraded mode
    /// while an unhealthy store is still installed and being reconnected.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        });
    }

    /// Registry of live poll rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
