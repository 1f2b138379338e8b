//! Persistence port for the runtime-state record
//!
//! The connected-trainer set is persisted as a single JSON record that is
//! read and written as a whole on every registry mutation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runtime_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Persisted runtime state of the hub
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Connected trainer endpoints as `"host:port"` strings, no duplicates
    pub connected_trainers: Vec<String>,

    /// When this record was last written
    pub updated_at: Option<DateTime<Utc>>,
}

impl RuntimeState {
    /// Whether the endpoint is currently in the connected-set
    pub fn contains(&self, addr: &str) -> bool {
        self.connected_trainers.iter().any(|t| t == addr)
    }

    /// Append an endpoint; callers check membership first
    pub fn insert(&mut self, addr: String) {
        self.connected_trainers.push(addr);
    }

    /// Remove an endpoint, returning whether it was present
    pub fn remove(&mut self, addr: &str) -> bool {
        let before = self.connected_trainers.len();
        self.connected_trainers.retain(|t| t != addr);
        self.connected_trainers.len() != before
    }

    /// Stamp the record before persisting
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Async port for loading and saving the runtime-state record
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load the whole record
    ///
    /// # Errors
    /// Returns `RegistryUnavailable` if the persisted record is missing or
    /// unreadable.
    async fn load(&self) -> Result<RuntimeState>;

    /// Write the whole record back, atomically
    async fn save(&self, state: &RuntimeState) -> Result<()>;
}

/// JSON-file implementation of the registry store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed an empty record if the file does not exist yet
    ///
    /// Called once at bootstrap; a record that goes missing after startup is
    /// the unavailable condition registration reports to callers.
    pub async fn ensure_initialized(&self) -> Result<()> {
        if fs::metadata(&self.path).await.is_ok() {
            return Ok(());
        }
        debug!(path = ?self.path, "Seeding empty runtime state");
        let mut state = RuntimeState::default();
        state.touch();
        self.save(&state).await
    }

    fn unavailable(&self) -> Error {
        Error::RegistryUnavailable {
            path: self.path.display().to_string(),
        }
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<RuntimeState> {
        let raw = fs::read(&self.path).await.map_err(|_| self.unavailable())?;
        serde_json::from_slice(&raw).map_err(|_| self.unavailable())
    }

    #[instrument(skip(self, state), fields(path = ?self.path, connected = state.connected_trainers.len()))]
    async fn save(&self, state: &RuntimeState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::Storage {
                message: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let raw = serde_json::to_vec_pretty(state)?;
        let temp_path = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create temp state file {:?}: {}", temp_path, e),
            })?;
        file.write_all(&raw).await.map_err(|e| Error::Storage {
            message: format!("Failed to write runtime state: {}", e),
        })?;
        file.sync_all().await.map_err(|e| Error::Storage {
            message: format!("Failed to sync runtime state: {}", e),
        })?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::Storage {
                message: format!(
                    "Failed to rename {:?} to {:?}: {}",
                    temp_path, self.path, e
                ),
            })?;

        debug!(connected = state.connected_trainers.len(), "Runtime state persisted");
        Ok(())
    }
}
