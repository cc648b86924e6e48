//! HTTP binding of the manager facade.
//!
//! Routes map 1:1 to facade operations; every response body is JSON. This
//! module is deliberately thin: no templates, no sessions, no state beyond
//! the shared manager handle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use scriptman_common::ScriptError;
use scriptman_manager::{ScriptLogs, ScriptManager, ScriptSnapshot};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

pub fn create_router(manager: Arc<ScriptManager>) -> Router {
    Router::new()
        .route("/scripts", get(list_scripts))
        .route("/scripts/:name", get(script_status))
        .route("/scripts/:name/start", post(start_script))
        .route("/scripts/:name/stop", post(stop_script))
        .route("/scripts/:name/logs", get(script_logs))
        .with_state(manager)
}

/// Error wrapper that turns `ScriptError` into a JSON response.
struct ApiError(ScriptError);

impl From<ScriptError> for ApiError {
    fn from(error: ScriptError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ScriptError::NotFound { .. } => StatusCode::NOT_FOUND,
            ScriptError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn list_scripts(
    State(manager): State<Arc<ScriptManager>>,
) -> Result<Json<Vec<ScriptSnapshot>>, ApiError> {
    Ok(Json(manager.list_scripts().await?))
}

async fn script_status(
    State(manager): State<Arc<ScriptManager>>,
    Path(name): Path<String>,
) -> Result<Json<ScriptSnapshot>, ApiError> {
    Ok(Json(manager.status(&name)?))
}

async fn start_script(
    State(manager): State<Arc<ScriptManager>>,
    Path(name): Path<String>,
) -> Result<Json<ScriptSnapshot>, ApiError> {
    Ok(Json(manager.start(&name).await?))
}

async fn stop_script(
    State(manager): State<Arc<ScriptManager>>,
    Path(name): Path<String>,
) -> Result<Json<ScriptSnapshot>, ApiError> {
    Ok(Json(manager.stop(&name).await?))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    cursor: Option<u64>,
}

async fn script_logs(
    State(manager): State<Arc<ScriptManager>>,
    Path(name): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ScriptLogs>, ApiError> {
    Ok(Json(manager.logs(&name, query.cursor)?))
}
