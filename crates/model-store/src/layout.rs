//! Key-to-path mapping for the model directory tree
//!
//! The on-disk naming scheme is externally observable and must stay stable:
//!
//! ```text
//! models_{job_id}/init_model_{job_id}
//! models_{job_id}/init_model_pars_{job_id}
//! models_{job_id}/models_{client_id}/tmp_parameters_{fed_step}
//! aggregate_pars
//! ```
//!
//! Every path string in the store is built here and nowhere else.

use std::path::PathBuf;

use runtime_core::{ClientId, FedStep};

/// File the aggregation collaborator writes its combined parameters to
pub const AGGREGATE_FILE: &str = "aggregate_pars";

const CLIENT_DIR_PREFIX: &str = "models_";

/// Directory holding everything belonging to one job
pub fn job_dir(job_id: &str) -> PathBuf {
    PathBuf::from(format!("models_{}", job_id))
}

/// Per-client directory under a job
pub fn client_dir(job_id: &str, client_id: ClientId) -> PathBuf {
    job_dir(job_id).join(format!("{}{}", CLIENT_DIR_PREFIX, client_id))
}

/// Round artifact for one `(job, client, fed_step)` key
pub fn round_artifact(job_id: &str, client_id: ClientId, fed_step: FedStep) -> PathBuf {
    client_dir(job_id, client_id).join(format!("tmp_parameters_{}", fed_step))
}

/// The job's initial global model
pub fn init_model(job_id: &str) -> PathBuf {
    job_dir(job_id).join(format!("init_model_{}", job_id))
}

/// The job's initial model parameters
pub fn init_model_params(job_id: &str) -> PathBuf {
    job_dir(job_id).join(format!("init_model_pars_{}", job_id))
}

/// Recover a client id from a per-client directory name
///
/// Names that do not follow the convention yield `None` and are skipped by
/// the caller.
pub fn parse_client_dir(name: &str) -> Option<ClientId> {
    name.strip_prefix(CLIENT_DIR_PREFIX)?.parse().ok()
}
