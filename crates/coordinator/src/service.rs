//! Coordination service binding the registry, catalog, and model store
//!
//! Each method validates its raw path parameters, then performs exactly one
//! logical operation; callers observe multi-step handlers (registration)
//! as a single outcome.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use job_catalog::JobCatalog;
use model_store::ModelStore;
use registry::{ClientProvisioner, TrainerRegistry};
use runtime_core::{ClientId, JobMeta, Result};
use tracing::{debug, info};

use crate::middleware::{InputValidator, RequestMetrics};

/// Pre-provisions per-client directories for every job in the catalog
///
/// Runs inside the registration critical section, so a registration is only
/// recorded once every known job can list the new client.
struct JobDirProvisioner {
    catalog: Arc<JobCatalog>,
    store: Arc<ModelStore>,
}

#[async_trait]
impl ClientProvisioner for JobDirProvisioner {
    async fn provision(&self, client_id: ClientId) -> Result<()> {
        let jobs = self.catalog.list_jobs().await?;
        for job in &jobs {
            self.store.ensure_client_dir(&job.id, client_id).await?;
        }
        debug!(client_id, jobs = jobs.len(), "Provisioned client directories");
        Ok(())
    }
}

/// The coordination hub's request-handling core
pub struct CoordinationService {
    registry: Arc<TrainerRegistry>,
    catalog: Arc<JobCatalog>,
    store: Arc<ModelStore>,
    validator: InputValidator,
    metrics: RequestMetrics,
    start_time: Instant,
}

impl CoordinationService {
    /// Create a service over the three backing components
    pub fn new(
        registry: Arc<TrainerRegistry>,
        catalog: Arc<JobCatalog>,
        store: Arc<ModelStore>,
    ) -> Self {
        Self {
            registry,
            catalog,
            store,
            validator: InputValidator::new(),
            metrics: RequestMetrics::new(),
            start_time: Instant::now(),
        }
    }

    /// Register a trainer endpoint and pre-provision its per-job directories
    pub async fn register_trainer(&self, ip: &str, port: &str, client_id: &str) -> Result<()> {
        let endpoint = self.validator.endpoint(ip, port)?;
        let client_id = self.validator.client_id(client_id)?;

        let provisioner = JobDirProvisioner {
            catalog: Arc::clone(&self.catalog),
            store: Arc::clone(&self.store),
        };
        self.registry
            .register(&endpoint, client_id, &provisioner)
            .await
    }

    /// Take a trainer endpoint offline
    pub async fn deregister_trainer(&self, ip: &str, port: &str) -> Result<()> {
        let endpoint = self.validator.endpoint(ip, port)?;
        self.registry.deregister(&endpoint).await
    }

    /// List all defined training jobs
    pub async fn list_jobs(&self) -> Result<Vec<JobMeta>> {
        self.catalog.list_jobs().await
    }

    /// Fetch a job's initial global model
    pub async fn initial_model(&self, job_id: &str) -> Result<Bytes> {
        let job_id = self.validator.job_id(job_id)?;
        self.store.initial_model(job_id).await
    }

    /// Fetch a job's initial model parameters
    pub async fn initial_model_params(&self, job_id: &str) -> Result<Bytes> {
        let job_id = self.validator.job_id(job_id)?;
        self.store.initial_model_params(job_id).await
    }

    /// Store one round's local parameters for a client
    pub async fn submit_parameters(
        &self,
        client_id: &str,
        job_id: &str,
        fed_step: &str,
        data: Bytes,
    ) -> Result<u64> {
        let client_id = self.validator.client_id(client_id)?;
        let job_id = self.validator.job_id(job_id)?;
        let fed_step = self.validator.fed_step(fed_step)?;

        let size = self
            .store
            .put_round_artifact(job_id, client_id, fed_step, data)
            .await?;
        info!(job_id, client_id, fed_step, size, "Round parameters submitted");
        Ok(size)
    }

    /// Fetch a peer's parameters for one round key
    pub async fn peer_parameters(
        &self,
        job_id: &str,
        client_id: &str,
        fed_step: &str,
    ) -> Result<Bytes> {
        let job_id = self.validator.job_id(job_id)?;
        let client_id = self.validator.client_id(client_id)?;
        let fed_step = self.validator.fed_step(fed_step)?;
        self.store.round_artifact(job_id, client_id, fed_step).await
    }

    /// Client ids currently provisioned under a job
    pub async fn connected_clients(&self, job_id: &str) -> Result<Vec<ClientId>> {
        let job_id = self.validator.job_id(job_id)?;
        self.store.connected_clients(job_id).await
    }

    /// Whatever the aggregation collaborator has produced so far
    pub async fn aggregate_parameters(&self) -> Result<Bytes> {
        self.store.aggregate_params().await
    }

    /// Snapshot of the connected trainer endpoints
    pub async fn connected_trainers(&self) -> Vec<String> {
        self.registry.connected().await
    }

    /// Server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Request metrics collector
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}
