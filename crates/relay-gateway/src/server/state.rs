//! Gateway state
//!
//! Application state shared by every connection task.

use crate::broadcast::BroadcastRouter;
use crate::connection::SessionStore;
use relay_common::{AppConfig, RelayConfig};
use std::sync::Arc;

/// Gateway application state
///
/// Cheap to clone; every clone shares the same store and router.
#[derive(Clone)]
pub struct GatewayState {
    /// Live sessions and their stored state
    store: Arc<SessionStore>,
    /// Fan-out over the store's connections
    router: Arc<BroadcastRouter>,
    /// Relay tuning
    relay: Arc<RelayConfig>,
}

impl GatewayState {
    /// Create a new gateway state with an empty store
    pub fn new(config: AppConfig) -> Self {
        let store = SessionStore::new_shared();
        let router = Arc::new(BroadcastRouter::new(
            store.clone(),
            config.relay.overflow_policy,
        ));

        Self {
            store,
            router,
            relay: Arc::new(config.relay),
        }
    }

    /// Get the session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Get the broadcast router
    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    /// Get the relay tuning
    pub fn relay(&self) -> &RelayConfig {
        &self.relay
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("store", &self.store)
            .field("router", &self.router)
            .field("relay", &self.relay)
            .finish()
    }
}
