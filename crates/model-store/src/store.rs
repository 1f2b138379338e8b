//! Filesystem-backed model store

use std::path::{Path, PathBuf};

use bytes::Bytes;
use runtime_core::{ClientId, Error, FedStep, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::layout;

/// Store of model-parameter artifacts under a single base directory
///
/// Writes to distinct round keys are independent; each write becomes
/// visible to readers of its key atomically via temp + rename.
#[derive(Debug, Clone)]
pub struct ModelStore {
    base: PathBuf,
}

impl ModelStore {
    /// Create a store rooted at the given base directory
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// The storage root
    pub fn base_path(&self) -> &Path {
        &self.base
    }

    fn abs(&self, rel: &Path) -> PathBuf {
        self.base.join(rel)
    }

    /// Fetch the job's initial global model
    ///
    /// Provisioned by the job-creation collaborator, never by this store;
    /// absence is a true not-found.
    #[instrument(skip(self))]
    pub async fn initial_model(&self, job_id: &str) -> Result<Bytes> {
        self.read_provisioned(&layout::init_model(job_id), job_id, "init_model")
            .await
    }

    /// Fetch the job's initial model parameters
    #[instrument(skip(self))]
    pub async fn initial_model_params(&self, job_id: &str) -> Result<Bytes> {
        self.read_provisioned(&layout::init_model_params(job_id), job_id, "init_model_pars")
            .await
    }

    async fn read_provisioned(&self, rel: &Path, job_id: &str, artifact: &str) -> Result<Bytes> {
        match fs::read(self.abs(rel)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ModelNotFound {
                job_id: job_id.to_string(),
                artifact: artifact.to_string(),
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to read {} for job {}: {}", artifact, job_id, e),
            }),
        }
    }

    /// Store one round's parameters for a `(job, client, fed_step)` key
    ///
    /// Creates parent directories as needed; a repeat upload for the same
    /// key overwrites (last write wins).
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn put_round_artifact(
        &self,
        job_id: &str,
        client_id: ClientId,
        fed_step: FedStep,
        data: Bytes,
    ) -> Result<u64> {
        let rel = layout::round_artifact(job_id, client_id, fed_step);
        self.write_atomic(&rel, data).await
    }

    /// Fetch one round's parameters for a `(job, client, fed_step)` key
    ///
    /// An absent key yields `ArtifactNotPrepared`: the peer has simply not
    /// finished the round yet, and the caller is expected to re-poll.
    #[instrument(skip(self))]
    pub async fn round_artifact(
        &self,
        job_id: &str,
        client_id: ClientId,
        fed_step: FedStep,
    ) -> Result<Bytes> {
        let rel = layout::round_artifact(job_id, client_id, fed_step);
        match fs::read(self.abs(&rel)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ArtifactNotPrepared {
                job_id: job_id.to_string(),
                client_id,
                fed_step,
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to read round artifact {:?}: {}", rel, e),
            }),
        }
    }

    /// Client ids with a provisioned directory under the job
    ///
    /// Directory names outside the `models_{id}` convention are skipped; a
    /// job with no directory tree yet yields an empty list.
    #[instrument(skip(self))]
    pub async fn connected_clients(&self, job_id: &str) -> Result<Vec<ClientId>> {
        let dir = self.abs(&layout::job_dir(job_id));
        let mut ids = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => {
                return Err(Error::Storage {
                    message: format!("Failed to scan job dir {:?}: {}", dir, e),
                })
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(id) = layout::parse_client_dir(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        debug!(job_id, count = ids.len(), "Enumerated connected clients");
        Ok(ids)
    }

    /// Idempotently create the per-client directory for a job
    pub async fn ensure_client_dir(&self, job_id: &str, client_id: ClientId) -> Result<()> {
        let dir = self.abs(&layout::client_dir(job_id, client_id));
        fs::create_dir_all(&dir).await.map_err(|e| Error::Storage {
            message: format!("Failed to create client dir {:?}: {}", dir, e),
        })
    }

    /// Pass through whatever the aggregation collaborator has produced
    ///
    /// Empty until the collaborator writes its combined parameters.
    #[instrument(skip(self))]
    pub async fn aggregate_params(&self) -> Result<Bytes> {
        match fs::read(self.base.join(layout::AGGREGATE_FILE)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Bytes::new()),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to read aggregate parameters: {}", e),
            }),
        }
    }

    async fn write_atomic(&self, rel: &Path, data: Bytes) -> Result<u64> {
        let full_path = self.abs(rel);
        let size = data.len() as u64;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::Storage {
                message: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        // Stage under a unique temp name so a concurrent writer to the same
        // key cannot interleave, then rename into place.
        let temp_name = format!(
            ".{}.{}.tmp",
            full_path.file_name().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        let temp_path = full_path.with_file_name(temp_name);

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create temp file {:?}: {}", temp_path, e),
            })?;
        file.write_all(&data).await.map_err(|e| Error::Storage {
            message: format!("Failed to write artifact: {}", e),
        })?;
        file.sync_all().await.map_err(|e| Error::Storage {
            message: format!("Failed to sync artifact: {}", e),
        })?;

        fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to rename {:?} to {:?}: {}", temp_path, full_path, e),
            })?;

        debug!(path = ?full_path, size, "Artifact written");
        Ok(size)
    }
}
