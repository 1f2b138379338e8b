//! HTTP server with graceful shutdown
//!
//! Wraps the API router with the outer layers (trailing-slash
//! normalization, request timeout) and runs it until a shutdown signal.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;
use runtime_core::{CoordinatorConfig, Error, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use crate::http_api;
use crate::service::CoordinationService;

/// Coordination HTTP server
pub struct CoordinatorServer {
    config: CoordinatorConfig,
    service: Arc<CoordinationService>,
}

impl CoordinatorServer {
    /// Create a server with default configuration
    pub fn new(service: Arc<CoordinationService>) -> Self {
        Self {
            config: CoordinatorConfig::default(),
            service,
        }
    }

    /// Create with custom configuration
    pub fn with_config(service: Arc<CoordinationService>, config: CoordinatorConfig) -> Self {
        Self { config, service }
    }

    /// Server configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::InvalidConfig {
                message: format!("Invalid bind address: {}", e),
            })?;
        self.run_until(addr, shutdown_signal()).await
    }

    /// Run the server on a specific address until the given future resolves
    pub async fn run_until<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = http_api::create_router(Arc::clone(&self.service), &self.config)
            .layer(TimeoutLayer::new(self.config.request_timeout));

        // Normalization wraps the whole router so `/jobs/` routes like `/jobs`.
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        let listener = TcpListener::bind(addr).await.map_err(Error::Io)?;
        info!(address = %addr, prefix = %self.config.api_prefix, "Coordination server listening");

        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                error!(error = %e, "Server error");
                Error::Io(e)
            })?;

        info!("Coordination server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
