//! Concurrency properties exercised over real HTTP
//!
//! The hub serves requests task-per-request; these tests drive many
//! trainers at once and assert nothing is lost or corrupted.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use coordinator::{CoordinationService, CoordinatorServer};
use job_catalog::JobCatalog;
use model_store::ModelStore;
use registry::{JsonFileStore, TrainerRegistry};
use runtime_core::HubConfig;
use tokio::time::sleep;

async fn start_hub() -> Result<(String, tempfile::TempDir, tokio::sync::oneshot::Sender<()>)> {
    let data = tempfile::tempdir()?;

    let mut config = HubConfig::default();
    config.storage.model_dir = data.path().join("models");
    config.storage.job_dir = data.path().join("jobs");
    config.storage.runtime_state_path = data.path().join("runtime_state.json");

    std::fs::create_dir_all(&config.storage.model_dir)?;
    std::fs::create_dir_all(&config.storage.job_dir)?;
    let state_store = Arc::new(JsonFileStore::new(&config.storage.runtime_state_path));
    state_store.ensure_initialized().await?;

    let service = Arc::new(CoordinationService::new(
        Arc::new(TrainerRegistry::new(state_store)),
        Arc::new(JobCatalog::new(&config.storage.job_dir)),
        Arc::new(ModelStore::new(&config.storage.model_dir)),
    ));

    let port = portpicker::pick_unused_port().expect("No ports free");
    let addr = SocketAddr::from_str(&format!("127.0.0.1:{}", port))?;
    let api_prefix = config.coordinator.api_prefix.clone();

    let (tx, rx) = tokio::sync::oneshot::channel();
    let server = CoordinatorServer::with_config(service, config.coordinator);
    tokio::spawn(server.run_until(addr, async {
        rx.await.ok();
    }));
    sleep(Duration::from_millis(100)).await;

    Ok((format!("http://127.0.0.1:{}{}", port, api_prefix), data, tx))
}

#[tokio::test]
async fn test_concurrent_registrations_lose_nothing() -> Result<()> {
    let (base_url, _data, _shutdown) = start_hub().await?;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for i in 0..12u16 {
        let client = client.clone();
        let url = format!("{}/register/10.0.0.{}/9000/{}", base_url, i + 1, i);
        handles.push(tokio::spawn(async move { client.post(url).send().await }));
    }

    for handle in handles {
        let resp = handle.await??;
        assert_eq!(resp.status().as_u16(), 200);
    }

    // Every one of the 12 distinct endpoints made it into the set.
    let status: serde_json::Value = client
        .get(format!("{}/status", base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(status["connected_trainers"], 12);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_round_uploads_stay_isolated() -> Result<()> {
    let (base_url, _data, _shutdown) = start_hub().await?;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for client_id in 0..8u64 {
        let client = client.clone();
        let url = format!("{}/modelpars/{}/j1/1", base_url, client_id);
        handles.push(tokio::spawn(async move {
            let payload = vec![client_id as u8; 4096];
            let part = reqwest::multipart::Part::bytes(payload).file_name("tmp_parameters");
            let form = reqwest::multipart::Form::new().part("tmp_parameter_file", part);
            client.post(url).multipart(form).send().await
        }));
    }
    for handle in handles {
        let resp = handle.await??;
        assert_eq!(resp.status().as_u16(), 200);
    }

    // Each key reads back exactly the bytes written for it.
    for client_id in 0..8u64 {
        let resp = client
            .get(format!("{}/otherparameters/j1/{}/1", base_url, client_id))
            .send()
            .await?;
        assert_eq!(resp.status().as_u16(), 202);
        let body = resp.bytes().await?;
        assert_eq!(body.as_ref(), vec![client_id as u8; 4096].as_slice());
    }

    Ok(())
}

#[tokio::test]
async fn test_repeat_upload_for_same_key_overwrites() -> Result<()> {
    let (base_url, _data, _shutdown) = start_hub().await?;
    let client = reqwest::Client::new();

    for payload in [b"first".to_vec(), b"second".to_vec()] {
        let part = reqwest::multipart::Part::bytes(payload).file_name("tmp_parameters");
        let form = reqwest::multipart::Form::new().part("tmp_parameter_file", part);
        let resp = client
            .post(format!("{}/modelpars/1/j1/1", base_url))
            .multipart(form)
            .send()
            .await?;
        assert_eq!(resp.status().as_u16(), 200);
    }

    let resp = client
        .get(format!("{}/otherparameters/j1/1/1", base_url))
        .send()
        .await?;
    assert_eq!(resp.bytes().await?.to_vec(), b"second".to_vec());

    Ok(())
}
