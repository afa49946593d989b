//! Camera lifecycle endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::capture::DeviceState;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct CameraResponse {
    pub state: DeviceState,
    /// For stop: whether a session was actually released
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<bool>,
}

/// POST /camera/start
///
/// Restarts the session if one is already open.
pub async fn start_camera(State(state): State<AppState>) -> ApiResult<Json<CameraResponse>> {
    if let Err(e) = state.scanner.start_camera().await {
        state.record_error(e.to_string()).await;
        return Err(e.into());
    }
    Ok(Json(CameraResponse {
        state: DeviceState::Active,
        released: None,
    }))
}

/// POST /camera/stop
///
/// Idempotent.
pub async fn stop_camera(State(state): State<AppState>) -> Json<CameraResponse> {
    let released = state.scanner.stop_camera().await;
    Json(CameraResponse {
        state: DeviceState::Idle,
        released: Some(released),
    })
}

/// GET /camera
pub async fn camera_status(State(state): State<AppState>) -> Json<CameraResponse> {
    Json(CameraResponse {
        state: state.scanner.camera_state().await,
        released: None,
    })
}

pub fn camera_routes() -> Router<AppState> {
    Router::new()
        .route("/camera", get(camera_status))
        .route("/camera/start", post(start_camera))
        .route("/camera/stop", post(stop_camera))
}
