//! Connected-trainer registry

use std::sync::Arc;

use async_trait::async_trait;
use runtime_core::{ClientId, Error, Result, TrainerEndpoint};
use tokio::sync::Mutex;
use tracing::info;

use crate::store::{RegistryStore, RuntimeState};

/// Port for pre-provisioning a registering client's storage
///
/// Invoked inside the registration critical section, after the duplicate
/// check and before the connected-set is mutated: if provisioning fails, the
/// registration is not recorded and the caller never sees a success.
#[async_trait]
pub trait ClientProvisioner: Send + Sync {
    /// Ensure per-client storage exists for every known job
    async fn provision(&self, client_id: ClientId) -> Result<()>;
}

/// Registry of currently-connected trainer endpoints
///
/// Single instance per process; every read-modify-persist sequence runs
/// under `lock` so concurrent registrations cannot read a stale
/// connected-set and lose an update.
pub struct TrainerRegistry {
    store: Arc<dyn RegistryStore>,
    lock: Mutex<()>,
}

impl TrainerRegistry {
    /// Create a registry over an injected persistence port
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Register a trainer endpoint
    ///
    /// Fails with `RegistryUnavailable` if the persisted record is missing
    /// or unreadable at call time, `AlreadyConnected` if the endpoint is
    /// already in the connected-set. Provisioning errors abort the
    /// registration before the set is mutated.
    pub async fn register(
        &self,
        endpoint: &TrainerEndpoint,
        client_id: ClientId,
        provisioner: &dyn ClientProvisioner,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut state = self.store.load().await?;
        let addr = endpoint.addr();
        if state.contains(&addr) {
            return Err(Error::AlreadyConnected { endpoint: addr });
        }

        provisioner.provision(client_id).await?;

        state.insert(addr.clone());
        state.touch();
        self.store.save(&state).await?;

        info!(
            endpoint = %addr,
            client_id,
            connected = state.connected_trainers.len(),
            "Trainer registered"
        );
        Ok(())
    }

    /// Remove a trainer endpoint from the connected-set
    ///
    /// A missing or unreadable state record reads as an empty connected-set:
    /// going offline always succeeds or reports `AlreadyOffline`, never a
    /// service-level error.
    pub async fn deregister(&self, endpoint: &TrainerEndpoint) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut state = self.store.load().await.unwrap_or_default();
        let addr = endpoint.addr();
        if !state.remove(&addr) {
            return Err(Error::AlreadyOffline { endpoint: addr });
        }

        state.touch();
        self.store.save(&state).await?;

        info!(
            endpoint = %addr,
            connected = state.connected_trainers.len(),
            "Trainer deregistered"
        );
        Ok(())
    }

    /// Snapshot of the connected-set; empty when the record is unavailable
    pub async fn connected(&self) -> Vec<String> {
        self.store
            .load()
            .await
            .map(|s| s.connected_trainers)
            .unwrap_or_default()
    }
}
