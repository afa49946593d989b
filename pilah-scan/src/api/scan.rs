//! Classification endpoints

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};

use crate::{ApiError, ApiResult, AppState, ScanOutcome};

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// POST /scan
///
/// Capture from the running camera and classify.
pub async fn scan(State(state): State<AppState>) -> ApiResult<Json<ScanOutcome>> {
    match state.scanner.scan().await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// POST /classify
///
/// Body is the raw image file (JPEG, PNG, ...). Stops the camera first.
pub async fn classify_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ScanOutcome>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }

    match state.scanner.classify_upload(body.to_vec()).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

pub fn scan_routes() -> Router<AppState> {
    Router::new().route("/scan", post(scan)).route(
        "/classify",
        post(classify_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}
