//! Model status and reload

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::inference::ModelStatus;
use crate::AppState;

/// GET /model/status
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.scanner.model_status())
}

/// POST /model/reload
///
/// Starts a fresh load in the background and answers 202 right away with
/// the status at the time of the request; progress arrives as
/// `ModelLoaded` / `ModelLoadFailed` events. A loaded model keeps serving
/// until its replacement is ready.
pub async fn reload_model(State(state): State<AppState>) -> (StatusCode, Json<ModelStatus>) {
    info!("Model reload requested");
    let current = state.scanner.model_status();

    let scanner = Arc::clone(&state.scanner);
    let loader = Arc::clone(&state.model_loader);
    tokio::spawn(async move {
        // outcome is logged and broadcast by the scanner
        let _ = scanner.load_model(move || loader()).await;
    });

    (StatusCode::ACCEPTED, Json(current))
}

pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/model/status", get(model_status))
        .route("/model/reload", post(reload_model))
}
