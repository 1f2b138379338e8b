//! Request hygiene for the coordination service
//!
//! Provides path-parameter validation and per-route request metrics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use runtime_core::{ClientId, Error, FedStep, Result, TrainerEndpoint};
use serde::Serialize;

use crate::http_api::AppState;

/// Validator for path parameters
///
/// Every parameter is checked before any storage is touched; a rejected
/// parameter never reaches the registry or the model store.
pub struct InputValidator {
    max_id_len: usize,
    /// Job ids: alphanumeric, hyphens, underscores, and dots
    id_pattern: regex::Regex,
    /// Hosts: hostname or IPv4 characters
    host_pattern: regex::Regex,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl InputValidator {
    /// Create a validator with default limits
    pub fn new() -> Self {
        Self {
            max_id_len: 256,
            id_pattern: regex::Regex::new(r"^[a-zA-Z0-9_\-\.]+$").expect("static pattern"),
            host_pattern: regex::Regex::new(r"^[a-zA-Z0-9\.\-]+$").expect("static pattern"),
        }
    }

    /// Validate a job id
    pub fn job_id<'a>(&self, id: &'a str) -> Result<&'a str> {
        if id.is_empty() {
            return Err(Error::InvalidParameter {
                message: "job id cannot be empty".to_string(),
            });
        }
        if id.len() > self.max_id_len {
            return Err(Error::InvalidParameter {
                message: format!("job id exceeds {} characters", self.max_id_len),
            });
        }
        if !self.id_pattern.is_match(id) {
            return Err(Error::InvalidParameter {
                message: format!("job id `{}` contains invalid characters", id),
            });
        }
        Ok(id)
    }

    /// Validate a numeric client id
    pub fn client_id(&self, raw: &str) -> Result<ClientId> {
        raw.parse().map_err(|_| Error::InvalidParameter {
            message: format!("client id `{}` is not a non-negative integer", raw),
        })
    }

    /// Validate a federated round counter
    pub fn fed_step(&self, raw: &str) -> Result<FedStep> {
        raw.parse().map_err(|_| Error::InvalidParameter {
            message: format!("fed step `{}` is not a non-negative integer", raw),
        })
    }

    /// Validate a host/port pair into an endpoint
    pub fn endpoint(&self, host: &str, port: &str) -> Result<TrainerEndpoint> {
        if host.is_empty() || host.len() > 253 || !self.host_pattern.is_match(host) {
            return Err(Error::InvalidParameter {
                message: format!("host `{}` is not a valid hostname or address", host),
            });
        }
        let port: u16 = port.parse().map_err(|_| Error::InvalidParameter {
            message: format!("port `{}` is not a valid TCP port", port),
        })?;
        if port == 0 {
            return Err(Error::InvalidParameter {
                message: "port 0 is not addressable".to_string(),
            });
        }
        Ok(TrainerEndpoint::new(host, port))
    }
}

/// Per-route counters and latency samples
#[derive(Default)]
struct RouteStats {
    requests: AtomicU64,
    errors: AtomicU64,
    latencies_us: Mutex<Vec<u64>>,
}

/// Request metrics collector
pub struct RequestMetrics {
    routes: DashMap<String, RouteStats>,
    max_samples: usize,
}

/// Point-in-time summary for one route
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub requests: u64,
    pub errors: u64,
    pub p99_latency_us: Option<u64>,
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
            max_samples: 1000,
        }
    }

    /// Record one handled request
    pub fn record(&self, route: &str, failed: bool, latency_us: u64) {
        let stats = self.routes.entry(route.to_string()).or_default();
        stats.requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            stats.errors.fetch_add(1, Ordering::Relaxed);
        }

        let mut samples = stats
            .latencies_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if samples.len() >= self.max_samples {
            samples.remove(0);
        }
        samples.push(latency_us);
    }

    /// Requests seen for a route
    pub fn request_count(&self, route: &str) -> u64 {
        self.routes
            .get(route)
            .map(|s| s.requests.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Failed requests seen for a route
    pub fn error_count(&self, route: &str) -> u64 {
        self.routes
            .get(route)
            .map(|s| s.errors.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// p99 latency for a route in microseconds
    pub fn p99_latency_us(&self, route: &str) -> Option<u64> {
        let stats = self.routes.get(route)?;
        let samples = stats
            .latencies_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * 0.99) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied()
    }

    /// Summary of all routes seen so far
    pub fn summary(&self) -> BTreeMap<String, RouteSummary> {
        self.routes
            .iter()
            .map(|entry| {
                let route = entry.key().clone();
                let summary = RouteSummary {
                    requests: entry.value().requests.load(Ordering::Relaxed),
                    errors: entry.value().errors.load(Ordering::Relaxed),
                    p99_latency_us: self.p99_latency_us(&route),
                };
                (route, summary)
            })
            .collect()
    }
}

/// Axum middleware recording per-route metrics
pub async fn track_requests(
    State(service): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let route = format!("{} {}", req.method(), path);

    let response = next.run(req).await;

    let failed = response.status().is_client_error() || response.status().is_server_error();
    service
        .metrics()
        .record(&route, failed, start.elapsed().as_micros() as u64);
    response
}
