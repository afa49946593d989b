//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::capture::DeviceState;
use crate::inference::ModelStatus;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" once the model is loaded, otherwise "degraded"
    pub status: String,
    /// Module name ("pilah-scan")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub model: ModelStatus,
    pub camera: DeviceState,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let model = state.scanner.model_status();
    let status = match model {
        ModelStatus::Ready { .. } => "ok",
        _ => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "pilah-scan".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        model,
        camera: state.scanner.camera_state().await,
        last_error: state.last_error.read().await.clone(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
