//! Directory-backed job catalog

use std::path::{Path, PathBuf};

use runtime_core::{Error, JobMeta, Result};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Catalog of training jobs defined under a single directory
///
/// Each `*.json` file in the directory deserializes to one [`JobMeta`].
#[derive(Debug, Clone)]
pub struct JobCatalog {
    job_dir: PathBuf,
}

impl JobCatalog {
    /// Create a catalog over the given job-definition directory
    pub fn new<P: AsRef<Path>>(job_dir: P) -> Self {
        Self {
            job_dir: job_dir.as_ref().to_path_buf(),
        }
    }

    /// The scanned directory
    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// List all defined jobs, sorted by id
    ///
    /// Scans the directory fresh on every call. A missing directory or an
    /// empty one yields an empty catalog; files that fail to deserialize
    /// are skipped with a warning.
    #[instrument(skip(self), fields(job_dir = ?self.job_dir))]
    pub async fn list_jobs(&self) -> Result<Vec<JobMeta>> {
        let mut jobs = Vec::new();

        let mut entries = match fs::read_dir(&self.job_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Job directory does not exist yet, catalog is empty");
                return Ok(jobs);
            }
            Err(e) => {
                return Err(Error::Storage {
                    message: format!("Failed to scan job dir {:?}: {}", self.job_dir, e),
                })
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let raw = match fs::read(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable job definition");
                    continue;
                }
            };
            match serde_json::from_slice::<JobMeta>(&raw) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unparsable job definition");
                }
            }
        }

        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = jobs.len(), "Scanned job catalog");
        Ok(jobs)
    }
}
