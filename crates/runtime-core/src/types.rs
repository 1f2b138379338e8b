//! Core type definitions for the federated coordination hub

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Unique identifier types
pub type JobId = String;
pub type DatasetId = String;

/// Numeric trainer identifier used in the model directory tree
pub type ClientId = u64;

/// Federated round counter; increases by one per local-training iteration
pub type FedStep = u64;

/// Network endpoint of a remote trainer
///
/// The external identity of a trainer is the concatenated `"host:port"`
/// string; the struct form exists only while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerEndpoint {
    /// Host name or IP address
    pub host: String,

    /// TCP port the trainer listens on
    pub port: u16,
}

impl TrainerEndpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The `"host:port"` identity used in the connected-set
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for TrainerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for TrainerEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.rsplit_once(':').ok_or_else(|| Error::InvalidParameter {
            message: format!("endpoint `{}` is not of the form host:port", s),
        })?;
        if host.is_empty() {
            return Err(Error::InvalidParameter {
                message: format!("endpoint `{}` has an empty host", s),
            });
        }
        let port = port.parse().map_err(|_| Error::InvalidParameter {
            message: format!("endpoint `{}` has an invalid port", s),
        })?;
        Ok(Self::new(host, port))
    }
}

/// Training job metadata
///
/// Owned by the job catalog; the coordination core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    /// Unique job identifier
    pub id: JobId,

    /// Submitting owner
    pub owner: String,

    /// Creation timestamp, epoch milliseconds
    pub create_time: i64,

    /// Serialized job definition content
    pub content: String,

    /// Dataset ids this job trains on, in declaration order
    #[serde(default)]
    pub datasets: Vec<DatasetId>,
}

/// Dataset metadata
///
/// `used_cnt` is mutated by collaborators outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Unique dataset identifier
    pub id: DatasetId,

    /// Submitting owner
    pub owner: String,

    /// Creation timestamp, epoch milliseconds
    pub create_time: i64,

    /// Serialized dataset descriptor content
    pub content: String,

    /// Dataset size in bytes
    #[serde(default)]
    pub size: u64,

    /// Number of jobs that have used this dataset
    #[serde(default)]
    pub used_cnt: u64,
}
