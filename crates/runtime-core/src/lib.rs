//! Runtime Core - Foundation for the federated coordination hub
//!
//! Provides the shared types, error handling, and configuration used by the
//! trainer registry, job catalog, model store, and coordination service.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CoordinatorConfig, HubConfig, StorageConfig};
pub use error::{Error, Result};
pub use types::*;
