//! Coordination hub binary entry point
//!
//! Seeds the persisted state locations, then serves the trainer-facing HTTP
//! API until shutdown.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coordinator::{CoordinationService, CoordinatorServer};
use job_catalog::JobCatalog;
use model_store::ModelStore;
use registry::{JsonFileStore, TrainerRegistry};
use runtime_core::HubConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coordinator=info,registry=info,job_catalog=info,model_store=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional config file path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => HubConfig::from_file(&path)?,
        None => HubConfig::default(),
    };

    // Seed the data tree so registration has a state record to mutate.
    tokio::fs::create_dir_all(&config.storage.model_dir).await?;
    tokio::fs::create_dir_all(&config.storage.job_dir).await?;
    let state_store = Arc::new(JsonFileStore::new(&config.storage.runtime_state_path));
    state_store.ensure_initialized().await?;

    let registry = Arc::new(TrainerRegistry::new(state_store));
    let catalog = Arc::new(JobCatalog::new(&config.storage.job_dir));
    let models = Arc::new(ModelStore::new(&config.storage.model_dir));
    let service = Arc::new(CoordinationService::new(registry, catalog, models));

    tracing::info!(
        port = config.coordinator.port,
        prefix = %config.coordinator.api_prefix,
        model_dir = ?config.storage.model_dir,
        "Starting coordination hub"
    );

    CoordinatorServer::with_config(service, config.coordinator)
        .run()
        .await?;
    Ok(())
}
