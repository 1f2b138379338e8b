//! End-to-end protocol tests over real HTTP
//!
//! Each test starts a hub on an unused port with a fresh data directory and
//! drives it the way a remote trainer would.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use coordinator::{CoordinationService, CoordinatorServer};
use job_catalog::JobCatalog;
use model_store::ModelStore;
use registry::{JsonFileStore, TrainerRegistry};
use runtime_core::{HubConfig, JobMeta};
use tempfile::TempDir;
use tokio::time::sleep;

struct TestHub {
    base_url: String,
    data: TempDir,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestHub {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn job_dir(&self) -> PathBuf {
        self.data.path().join("jobs")
    }

    fn model_dir(&self) -> PathBuf {
        self.data.path().join("models")
    }

    fn state_path(&self) -> PathBuf {
        self.data.path().join("runtime_state.json")
    }

    fn write_job(&self, id: &str) {
        let job = JobMeta {
            id: id.to_string(),
            owner: "alice".to_string(),
            create_time: 1_700_000_000_000,
            content: "{}".to_string(),
            datasets: vec!["d1".to_string()],
        };
        std::fs::write(
            self.job_dir().join(format!("{}.json", id)),
            serde_json::to_vec(&job).unwrap(),
        )
        .unwrap();
    }
}

async fn start_hub() -> Result<TestHub> {
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

    // Give it a moment to start
    sleep(Duration::from_millis(100)).await;

    Ok(TestHub {
        base_url: format!("http://127.0.0.1:{}{}", port, api_prefix),
        data,
        _shutdown: tx,
    })
}

fn parameter_form(payload: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(payload).file_name("tmp_parameters");
    reqwest::multipart::Form::new().part("tmp_parameter_file", part)
}

#[tokio::test]
async fn test_full_protocol_flow() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    // Register a trainer
    let resp = client
        .post(hub.url("/register/10.0.0.1/9000/1"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await?, "register_success");

    // Duplicate registration is a reported no-op
    let resp = client
        .post(hub.url("/register/10.0.0.1/9000/1"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.text().await?, "already connected");

    // Empty catalog lists as an empty array
    let resp = client.get(hub.url("/jobs")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let jobs: Vec<serde_json::Value> = resp.json().await?;
    assert!(jobs.is_empty());

    // Submit round parameters for (job=j1, client=1, step=1)
    let resp = client
        .post(hub.url("/modelpars/1/j1/1"))
        .multipart(parameter_form(vec![0x00, 0x01]))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await?, "submit_success");

    // The same key reads back exactly the submitted bytes, at 202
    let resp = client
        .get(hub.url("/otherparameters/j1/1/1"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 202);
    assert_eq!(resp.bytes().await?.to_vec(), vec![0x00, 0x01]);

    // An unsubmitted step is not-prepared, not not-found
    let resp = client
        .get(hub.url("/otherparameters/j1/1/2"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.text().await?, "file not prepared");

    // The submitting client shows up under the job
    let resp = client.get(hub.url("/otherclients/j1")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let clients: Vec<u64> = resp.json().await?;
    assert_eq!(clients, vec![1]);

    // Aggregate parameters are a placeholder until the aggregator runs
    let resp = client.get(hub.url("/aggregatepars")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.bytes().await?.is_empty());

    // Offline, then offline again
    let resp = client.put(hub.url("/offline/10.0.0.1/9000")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await?, "offline success");

    let resp = client.put(hub.url("/offline/10.0.0.1/9000")).send().await?;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.text().await?, "already offline");

    Ok(())
}

#[tokio::test]
async fn test_initial_model_endpoints() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    // Nothing provisioned yet
    let resp = client.get(hub.url("/init_model/j1")).send().await?;
    assert_eq!(resp.status().as_u16(), 404);
    let resp = client.get(hub.url("/modelpars/j1")).send().await?;
    assert_eq!(resp.status().as_u16(), 404);

    // The job-creation collaborator drops the artifacts in place
    let job_dir = hub.model_dir().join("models_j1");
    std::fs::create_dir_all(&job_dir)?;
    std::fs::write(job_dir.join("init_model_j1"), b"weights")?;
    std::fs::write(job_dir.join("init_model_pars_j1"), b"pars")?;

    let resp = client.get(hub.url("/init_model/j1")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("init_model_j1"));
    assert_eq!(resp.bytes().await?.to_vec(), b"weights".to_vec());

    let resp = client.get(hub.url("/modelpars/j1")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.bytes().await?.to_vec(), b"pars".to_vec());

    Ok(())
}

#[tokio::test]
async fn test_register_reports_server_error_when_state_removed() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    std::fs::remove_file(hub.state_path())?;

    let resp = client
        .post(hub.url("/register/10.0.0.1/9000/1"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 203);
    assert_eq!(resp.text().await?, "server has internal error");

    // Going offline never reports the unavailable state record
    let resp = client.put(hub.url("/offline/10.0.0.1/9000")).send().await?;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.text().await?, "already offline");

    Ok(())
}

#[tokio::test]
async fn test_trailing_slash_variants_are_equivalent() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    let resp = client.get(hub.url("/jobs/")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .post(hub.url("/register/10.0.0.1/9000/1/"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await?, "register_success");

    Ok(())
}

#[tokio::test]
async fn test_catalog_rescans_between_requests() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    let jobs: Vec<serde_json::Value> = client.get(hub.url("/jobs")).send().await?.json().await?;
    assert!(jobs.is_empty());

    hub.write_job("j1");
    let jobs: Vec<serde_json::Value> = client.get(hub.url("/jobs")).send().await?.json().await?;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], "j1");
    assert_eq!(jobs[0]["owner"], "alice");

    hub.write_job("j2");
    let jobs: Vec<serde_json::Value> = client.get(hub.url("/jobs")).send().await?.json().await?;
    assert_eq!(jobs.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_registration_provisions_dirs_for_known_jobs() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    hub.write_job("j1");

    let resp = client
        .post(hub.url("/register/10.0.0.2/9100/7"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    // Listing is well-defined before any upload from that client
    let clients: Vec<u64> = client
        .get(hub.url("/otherclients/j1"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(clients, vec![7]);

    Ok(())
}

#[tokio::test]
async fn test_validation_rejects_malformed_parameters() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(hub.url("/register/10.0.0.1/notaport/1"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .get(hub.url("/otherparameters/j1/1/notastep"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    // A submit without the expected multipart field is rejected
    let stray = reqwest::multipart::Form::new().text("unexpected", "field");
    let resp = client
        .post(hub.url("/modelpars/1/j1/1"))
        .multipart(stray)
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);

    Ok(())
}

#[tokio::test]
async fn test_health_and_status() -> Result<()> {
    let hub = start_hub().await?;
    let client = reqwest::Client::new();

    let resp = client.get(hub.url("/health")).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");

    client
        .post(hub.url("/register/10.0.0.1/9000/1"))
        .send()
        .await?;

    let status: serde_json::Value = client.get(hub.url("/status")).send().await?.json().await?;
    assert_eq!(status["connected_trainers"], 1);
    assert!(status["routes"]
        .as_object()
        .map(|r| !r.is_empty())
        .unwrap_or(false));

    Ok(())
}
