//! Control API: a two-route `axum` surface to start and stop a session.
//!
//! Grounded on the teacher's only `axum` usage
//! (`crates/service/src/observability.rs`'s `Router`/`State` pattern) and
//! the original FastAPI route shapes it replaces
//! (`original_source/src/forza_core/api/server.py`,
//! `.../api/schemas.py`).

#![warn(missing_docs, rust_2018_idioms)]

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use forza_telemetry_store::SessionRegistry;

/// Body of `POST /session/start`.
#[derive(Debug, Deserialize)]
pub struct SessionStartRequest {
    /// The car model ordinal for the session.
    pub car_id: i32,
    /// The track identifier for the session.
    pub track_id: String,
    /// Optional tuning configuration id.
    pub tuning_config_id: Option<i32>,
}

/// Response body shared by both routes.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OperationResponse {
    /// `"success"` or `"error"`.
    pub status: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl OperationResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

/// Builds the control API router over a shared session registry.
pub fn router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .with_state(registry)
}

async fn start_session(
    State(registry): State<Arc<SessionRegistry>>,
    body: Result<Json<SessionStartRequest>, JsonRejection>,
) -> (StatusCode, Json<OperationResponse>) {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(OperationResponse::error(format!("invalid request: {rejection}"))),
            )
        }
    };

    match registry
        .create(req.car_id, &req.track_id, req.tuning_config_id)
        .await
    {
        Ok(id) => (
            StatusCode::OK,
            Json(OperationResponse::success(format!("session {id} started"))),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OperationResponse::error(err.to_string())),
        ),
    }
}

async fn stop_session(State(registry): State<Arc<SessionRegistry>>) -> (StatusCode, Json<OperationResponse>) {
    registry.clear();
    (
        StatusCode::OK,
        Json(OperationResponse::success("session stopped")),
    )
}
