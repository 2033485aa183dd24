//! REST API for the swipe review session
//!
//! Exposes the review controller over HTTP so any UI layer can drive a
//! session: load, gesture, commit, undo, reset, summary.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::controller::{ReviewController, ReviewState};
use crate::models::Outcome;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct GestureRequest {
    pub displacement: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct CommitRequest {
    pub outcome: Outcome,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failure that still carries a payload, e.g. the load-error snapshot
    pub fn error_with<T: Serialize>(message: String, data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            ..Self::error(message)
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<ReviewController>,
}

type ApiResult = (StatusCode, Json<ApiResponse>);

async fn snapshot_response(controller: &ReviewController) -> ApiResult {
    (
        StatusCode::OK,
        Json(ApiResponse::success(controller.snapshot().await)),
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Session Endpoints
/// =============================

async fn get_session(State(state): State<ApiState>) -> ApiResult {
    snapshot_response(&state.controller).await
}

/// Load (or retry loading) the unclassified queue
async fn load_session(State(state): State<ApiState>) -> ApiResult {
    info!(user_id = state.controller.user_id(), "Session load requested");

    match state.controller.load().await {
        ReviewState::LoadError(message) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error_with(
                message,
                state.controller.snapshot().await,
            )),
        ),
        _ => snapshot_response(&state.controller).await,
    }
}

async fn apply_gesture(
    State(state): State<ApiState>,
    Json(req): Json<GestureRequest>,
) -> ApiResult {
    if !req.displacement.is_finite() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("displacement must be a finite number".into())),
        );
    }

    let gesture = state.controller.apply_gesture(req.displacement).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "gesture": gesture,
            "session": state.controller.snapshot().await,
        }))),
    )
}

async fn commit(
    State(state): State<ApiState>,
    Json(req): Json<CommitRequest>,
) -> ApiResult {
    state.controller.commit(req.outcome).await;
    snapshot_response(&state.controller).await
}

async fn undo(State(state): State<ApiState>) -> ApiResult {
    state.controller.undo().await;
    snapshot_response(&state.controller).await
}

async fn reset(State(state): State<ApiState>) -> ApiResult {
    state.controller.reset().await;
    snapshot_response(&state.controller).await
}

async fn summary(State(state): State<ApiState>) -> ApiResult {
    (
        StatusCode::OK,
        Json(ApiResponse::success(state.controller.summarize().await)),
    )
}

/// Completed sessions for the controller's user, oldest first, each with
/// its chain link re-verified
async fn history(State(state): State<ApiState>) -> ApiResult {
    let user_id = state.controller.user_id();
    let entries = state.controller.journal().history(user_id).await;

    (StatusCode::OK, Json(ApiResponse::success(entries)))
}

async fn history_entry(
    State(state): State<ApiState>,
    Path(record_id): Path<Uuid>,
) -> ApiResult {
    match state.controller.journal().entry(record_id).await {
        Some(entry) if entry.record.user_id == state.controller.user_id() => {
            (StatusCode::OK, Json(ApiResponse::success(entry)))
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No completed session {}", record_id))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(controller: Arc<ReviewController>) -> Router {
    let state = ApiState { controller };

    Router::new()
        .route("/health", get(health))
        .route("/api/session", get(get_session))
        .route("/api/session/load", post(load_session))
        .route("/api/session/gesture", post(apply_gesture))
        .route("/api/session/commit", post(commit))
        .route("/api/session/undo", post(undo))
        .route("/api/session/reset", post(reset))
        .route("/api/session/summary", get(summary))
        .route("/api/session/history", get(history))
        .route("/api/session/history/:record_id", get(history_entry))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    controller: Arc<ReviewController>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(controller);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Session API listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
