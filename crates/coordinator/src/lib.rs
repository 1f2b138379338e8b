//! Coordination service for federated training
//!
//! This crate provides the HTTP hub that remote trainers talk to:
//! - **Membership**: trainer registration and offline handling backed by the
//!   persisted registry
//! - **Discovery**: job catalog listing and per-job connected-client queries
//! - **Parameter exchange**: initial model downloads plus round-indexed
//!   upload and peer download of local model parameters
//! - **Hygiene**: path-parameter validation, request metrics, uniform
//!   error-to-status mapping
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use coordinator::{CoordinationService, CoordinatorServer};
//!
//! #[tokio::main]
//! async fn main() -> runtime_core::Result<()> {
//!     let service = Arc::new(CoordinationService::new(registry, catalog, models));
//!     CoordinatorServer::new(service).run().await
//! }
//! ```

pub mod http_api;
pub mod middleware;
pub mod server;
pub mod service;

pub use server::CoordinatorServer;
pub use service::CoordinationService;
