//! Model Store - per-job, per-client, per-round parameter storage
//!
//! Stores opaque model-parameter blobs in a directory tree whose layout is
//! part of the external contract (trainers and the aggregation collaborator
//! both address it). Writes are atomic (temp + rename), so a reader of a
//! given round key never observes a partially-written artifact.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use model_store::ModelStore;
//!
//! # async fn example() -> runtime_core::Result<()> {
//! let store = ModelStore::new("/var/lib/hub/models");
//! store.put_round_artifact("j1", 1, 1, Bytes::from(vec![0, 1])).await?;
//! let data = store.round_artifact("j1", 1, 1).await?;
//! # Ok(())
//! # }
//! ```

pub mod layout;
mod store;

pub use store::ModelStore;
