//! Hub configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main hub configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    /// Coordination server settings
    pub coordinator: CoordinatorConfig,

    /// Storage locations
    pub storage: StorageConfig,
}

impl HubConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read(path.as_ref()).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to read config {:?}: {}", path.as_ref(), e),
        })?;
        serde_json::from_slice(&raw).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to parse config {:?}: {}", path.as_ref(), e),
        })
    }
}

/// Coordination server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Address to bind the HTTP server
    pub bind_address: String,

    /// Port for the HTTP server
    pub port: u16,

    /// API version prefix all routes are nested under
    pub api_prefix: String,

    /// Per-request timeout
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,

    /// Upper bound on uploaded parameter payloads in bytes
    pub max_upload_bytes: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8383,
            api_prefix: "/api/v1".to_string(),
            request_timeout: Duration::from_secs(300),
            max_upload_bytes: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// Storage locations for the hub's persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the model directory tree
    pub model_dir: PathBuf,

    /// Directory scanned for job definitions
    pub job_dir: PathBuf,

    /// Path of the persisted runtime state record
    pub runtime_state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./data/models"),
            job_dir: PathBuf::from("./data/jobs"),
            runtime_state_path: PathBuf::from("./data/runtime_state.json"),
        }
    }
}

/// Duration serialization helper, milliseconds on the wire
mod duration_ms {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
