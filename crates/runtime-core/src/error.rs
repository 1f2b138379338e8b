//! Error types for the federated coordination hub

use thiserror::Error;

/// Result type alias using the hub Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the coordination hub
#[derive(Error, Debug)]
pub enum Error {
    // Catalog errors
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    // Model store errors
    #[error("Initial artifact missing for job {job_id}: {artifact}")]
    ModelNotFound { job_id: String, artifact: String },

    #[error("Parameters not prepared: job={job_id} client={client_id} step={fed_step}")]
    ArtifactNotPrepared {
        job_id: String,
        client_id: u64,
        fed_step: u64,
    },

    // Registry errors
    #[error("Trainer already connected: {endpoint}")]
    AlreadyConnected { endpoint: String },

    #[error("Trainer already offline: {endpoint}")]
    AlreadyOffline { endpoint: String },

    #[error("Runtime state unavailable: {path}")]
    RegistryUnavailable { path: String },

    // Request errors
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Returns true if this error is a safe-no-op conflict (duplicate
    /// register or offline); the operation left the connected-set unchanged.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::AlreadyConnected { .. } | Error::AlreadyOffline { .. }
        )
    }

    /// Returns true if the requested artifact or job does not exist at all.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::JobNotFound { .. } | Error::ModelNotFound { .. })
    }

    /// Returns true if the caller should simply re-poll: the artifact is not
    /// there yet but is expected to appear once the peer finishes its round.
    pub fn is_not_prepared(&self) -> bool {
        matches!(self, Error::ArtifactNotPrepared { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
