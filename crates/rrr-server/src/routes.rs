//! HTTP routes
//!
//! - `POST /api/analyze` `{"folder_path": "..."}` → analysis JSON
//! - `GET /api/stats` → cache and worker pool counters
//! - `GET /health` → `{"status": "ok"}`
//! - `GET /visualizations/<file>` → rendered charts
//!
//! Every failure is answered with an [`ErrorBody`].

use rrr_core::{ErrorKind, Pipeline, PipelineError};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Body of `POST /api/analyze`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Folder holding the release PDFs
    pub folder_path: String,
}

/// JSON error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error class, e.g. `validation`
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Document the error concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Individual violations, for validation errors
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<String>,
}

impl ErrorBody {
    fn reply(self, status: StatusCode) -> Response {
        warp::reply::with_status(warp::reply::json(&self), status).into_response()
    }
}

impl From<&PipelineError> for ErrorBody {
    fn from(e: &PipelineError) -> Self {
        Self {
            kind: e.kind().as_str().to_string(),
            message: e.to_string(),
            document: e.document().map(str::to_string),
            details: e.details(),
        }
    }
}

/// All routes over `pipeline`
pub fn routes(
    pipeline: Arc<Pipeline>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let charts_dir = pipeline.config().visualizations_dir.clone();

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let analyze_route = warp::path!("api" / "analyze")
        .and(warp::post())
        .and(warp::body::content_length_limit(max_body_bytes))
        .and(warp::body::json())
        .and(with_pipeline(Arc::clone(&pipeline)))
        .and_then(analyze_handler);

    let stats_route = warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_pipeline(pipeline))
        .map(|pipeline: Arc<Pipeline>| {
            warp::reply::json(&serde_json::json!({
                "cache": pipeline.cache_stats(),
                "pool": pipeline.pool_stats(),
            }))
        });

    let charts = warp::path("visualizations").and(warp::fs::dir(charts_dir));

    health
        .or(analyze_route)
        .or(stats_route)
        .or(charts)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_pipeline(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (Arc<Pipeline>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&pipeline))
}

async fn analyze_handler(
    request: AnalyzeRequest,
    pipeline: Arc<Pipeline>,
) -> Result<Response, Rejection> {
    tracing::info!(folder = %request.folder_path, "analyze requested");
    match pipeline.analyze(&request.folder_path).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Map a pipeline failure to its HTTP response
#[must_use]
pub fn error_response(e: &PipelineError) -> Response {
    let status = StatusCode::from_u16(e.kind().http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    ErrorBody::from(e).reply(status)
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };

    let kind = if status.is_server_error() {
        ErrorKind::Internal
    } else {
        ErrorKind::Input
    };
    Ok(ErrorBody {
        kind: kind.as_str().to_string(),
        message,
        document: None,
        details: Vec::new(),
    }
    .reply(status))
}
