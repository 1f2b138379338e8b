//! Registry - persisted connected-trainer set for the coordination hub
//!
//! The registry owns the set of trainer endpoints currently participating in
//! federated rounds. The set is loaded from a persisted runtime-state record
//! on every mutation, changed, and written back atomically, so it survives
//! process restarts. All read-modify-persist sequences run under a single
//! process-wide lock to rule out lost updates between concurrent requests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use registry::{JsonFileStore, TrainerRegistry};
//!
//! # async fn example() -> runtime_core::Result<()> {
//! let store = Arc::new(JsonFileStore::new("/var/lib/hub/runtime_state.json"));
//! store.ensure_initialized().await?;
//! let registry = TrainerRegistry::new(store);
//! # Ok(())
//! # }
//! ```

mod store;
mod trainer_registry;

pub use store::{JsonFileStore, RegistryStore, RuntimeState};
pub use trainer_registry::{ClientProvisioner, TrainerRegistry};
