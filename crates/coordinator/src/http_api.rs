//! HTTP protocol surface for the coordination hub
//!
//! One router, versioned under a configurable prefix. Handlers return a
//! typed `Result`; the [`ApiError`] wrapper is the single place hub error
//! kinds become response statuses and short machine-readable messages.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use bytes::Bytes;
use runtime_core::{ClientId, CoordinatorConfig, Error, JobMeta};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::middleware::{track_requests, RouteSummary};
use crate::service::CoordinationService;

/// Multipart field carrying the uploaded parameter payload
const PARAMETER_FIELD: &str = "tmp_parameter_file";

/// Shared state for HTTP handlers
pub type AppState = Arc<CoordinationService>;

/// Error wrapper mapping hub errors to the protocol's response statuses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::AlreadyConnected { .. } => {
                (StatusCode::CREATED, "already connected".to_string())
            }
            Error::AlreadyOffline { .. } => (StatusCode::CREATED, "already offline".to_string()),
            Error::ArtifactNotPrepared { .. } => {
                (StatusCode::CREATED, "file not prepared".to_string())
            }
            Error::RegistryUnavailable { .. } => (
                StatusCode::NON_AUTHORITATIVE_INFORMATION,
                "server has internal error".to_string(),
            ),
            Error::JobNotFound { .. } | Error::ModelNotFound { .. } => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            Error::InvalidParameter { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            _ => {
                error!(error = %self.0, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, message).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Hub status for API response
#[derive(serde::Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub connected_trainers: usize,
    pub routes: BTreeMap<String, RouteSummary>,
}

/// Create the HTTP API router
pub fn create_router(service: AppState, config: &CoordinatorConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The two /modelpars routes overlap, so their first segment must share a
    // template name; path parameters are positional and the handlers bind
    // them to their real meanings (job id for GET, client id for POST).
    let api = Router::new()
        .route("/register/:ip/:port/:client_id", post(register_trainer))
        .route("/offline/:ip/:port", put(offline))
        .route("/jobs", get(list_jobs))
        .route("/modelpars/:id", get(initial_model_params))
        .route("/init_model/:job_id", get(initial_model))
        .route("/modelpars/:id/:job_id/:fed_step", post(submit_parameters))
        .route(
            "/otherparameters/:job_id/:client_id/:fed_step",
            get(peer_parameters),
        )
        .route("/otherclients/:job_id", get(connected_clients))
        .route("/aggregatepars", get(aggregate_parameters))
        .route("/health", get(health_check))
        .route("/status", get(get_status));

    let router = if config.api_prefix.is_empty() || config.api_prefix == "/" {
        api
    } else {
        Router::new().nest(&config.api_prefix, api)
    };

    router
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&service),
            track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(service)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// Get hub status and request metrics
async fn get_status(State(service): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        uptime_secs: service.uptime_secs(),
        connected_trainers: service.connected_trainers().await.len(),
        routes: service.metrics().summary(),
    })
}

/// Register a trainer endpoint
async fn register_trainer(
    State(service): State<AppState>,
    Path((ip, port, client_id)): Path<(String, String, String)>,
) -> ApiResult<&'static str> {
    service.register_trainer(&ip, &port, &client_id).await?;
    Ok("register_success")
}

/// Take a trainer endpoint offline
async fn offline(
    State(service): State<AppState>,
    Path((ip, port)): Path<(String, String)>,
) -> ApiResult<&'static str> {
    service.deregister_trainer(&ip, &port).await?;
    Ok("offline success")
}

/// List all defined jobs
async fn list_jobs(State(service): State<AppState>) -> ApiResult<Json<Vec<JobMeta>>> {
    Ok(Json(service.list_jobs().await?))
}

/// Download a job's initial model parameters
async fn initial_model_params(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let data = service.initial_model_params(&job_id).await?;
    Ok(file_attachment(format!("init_model_pars_{}", job_id), data))
}

/// Download a job's initial model
async fn initial_model(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let data = service.initial_model(&job_id).await?;
    Ok(file_attachment(format!("init_model_{}", job_id), data))
}

/// Upload one round's local parameters
async fn submit_parameters(
    State(service): State<AppState>,
    Path((client_id, job_id, fed_step)): Path<(String, String, String)>,
    mut multipart: Multipart,
) -> ApiResult<&'static str> {
    let mut payload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError(Error::InvalidParameter {
            message: format!("invalid multipart body: {}", e),
        })
    })? {
        if field.name() == Some(PARAMETER_FIELD) {
            let data = field.bytes().await.map_err(|e| {
                ApiError(Error::InvalidParameter {
                    message: format!("failed to read uploaded parameters: {}", e),
                })
            })?;
            payload = Some(data);
            break;
        }
    }

    let Some(data) = payload else {
        return Err(ApiError(Error::InvalidParameter {
            message: format!("missing multipart field `{}`", PARAMETER_FIELD),
        }));
    };

    service
        .submit_parameters(&client_id, &job_id, &fed_step, data)
        .await?;
    Ok("submit_success")
}

/// Download a peer's parameters for one round key
///
/// Success is 202: the payload is a round-in-progress exchange, not a
/// stable resource; an unsubmitted key reports `file not prepared` so
/// pollers can keep waiting.
async fn peer_parameters(
    State(service): State<AppState>,
    Path((job_id, client_id, fed_step)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let data = service.peer_parameters(&job_id, &client_id, &fed_step).await?;
    let mut response = file_attachment(format!("tmp_parameters_{}", fed_step), data);
    *response.status_mut() = StatusCode::ACCEPTED;
    Ok(response)
}

/// List client ids connected to a job
async fn connected_clients(
    State(service): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Vec<ClientId>>> {
    Ok(Json(service.connected_clients(&job_id).await?))
}

/// Download the aggregated parameters produced so far
async fn aggregate_parameters(State(service): State<AppState>) -> ApiResult<Response> {
    let data = service.aggregate_parameters().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream".to_string())],
        data,
    )
        .into_response())
}

fn file_attachment(filename: String, data: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response()
}
