//! HTTP surface: `GET /api/transcript` and `GET /api/insight`.
//!
//! Every response, errors and preflight included, carries open CORS headers from the
//! router's `CorsLayer`. Errors are
//! always `{"error": "<message>"}` with 400 for unusable input and 500 for everything else.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use eyre::WrapErr;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, ErrorKind};
use crate::pipeline::Pipeline;
use crate::youtube::TranscriptProvider;
use crate::{VideoId, VideoInsight, extract_video_id};

#[derive(Clone)]
pub struct AppState {
    pub transcripts: Arc<dyn TranscriptProvider>,
    /// None when no Gemini credential is configured
    pub insights: Option<Arc<Pipeline>>,
}

#[derive(Debug, Deserialize)]
struct VideoQuery {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptBody {
    transcript: String,
    title: String,
    video_id: VideoId,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Any-origin CORS; every OPTIONS request is answered here as a preflight
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/transcript", get(transcript))
        .route("/api/insight", get(insight))
        .layer(cors())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(addr: SocketAddr, state: AppState) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("API server listening on http://{addr}");
    eprintln!("API server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running API server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
    }
}

/// A query string that fails to decode (e.g. a repeated `url`) counts as a missing url
fn video_id_from(query: std::result::Result<Query<VideoQuery>, QueryRejection>) -> ApiResult<VideoId> {
    let Query(query) = query.map_err(|rejection| {
        info!("Rejected query string: {rejection}");
        ApiError::bad_request("Missing url parameter")
    })?;
    let url = query
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing url parameter"))?;
    extract_video_id(url).ok_or_else(|| ApiError::bad_request("Invalid YouTube URL"))
}

async fn transcript(
    State(state): State<AppState>,
    query: std::result::Result<Query<VideoQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let video_id = video_id_from(query)?;
    let record = state.transcripts.fetch(&video_id).await.map_err(|e| {
        error!("Transcript request for {video_id} failed: {e}");
        ApiError::from(e)
    })?;

    let body = TranscriptBody {
        transcript: record.text,
        title: record.title,
        video_id: record.video_id,
    };
    Ok(Json(body).into_response())
}

async fn insight(
    State(state): State<AppState>,
    query: std::result::Result<Query<VideoQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let video_id = video_id_from(query)?;
    let pipeline = state.insights.as_ref().ok_or_else(|| {
        ApiError::from(Error::ApiKeyMissing(crate::config::API_KEY_VARS.join(" or ")))
    })?;

    let insight: VideoInsight = pipeline.run(video_id.as_str()).await.map_err(|e| {
        error!("Insight request for {video_id} failed: {e}");
        ApiError::from(e)
    })?;
    Ok(Json(insight).into_response())
}
