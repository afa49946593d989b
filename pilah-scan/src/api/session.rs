//! Stored login for the scoring backend
//!
//! The UI writes the identity id and token here after logging in against the
//! backend and deletes them on logout. Reporting only happens while they are
//! present.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use pilah_common::Credentials;
use serde::Serialize;
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let credentials = state.scanner.reporter().credentials().load().await;
    Json(SessionResponse {
        logged_in: credentials.is_some(),
        user_id: credentials.map(|c| c.user_id),
    })
}

/// PUT /session
///
/// Body: `{"userId": "...", "token": "..."}`
pub async fn put_session(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<SessionResponse>> {
    if !credentials.is_complete() {
        return Err(ApiError::BadRequest(
            "userId and token must both be non-empty".to_string(),
        ));
    }

    state
        .scanner
        .reporter()
        .credentials()
        .save(&credentials)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user_id = %credentials.user_id, "Credentials stored");

    Ok(Json(SessionResponse {
        logged_in: true,
        user_id: Some(credentials.user_id),
    }))
}

/// DELETE /session
pub async fn delete_session(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state
        .scanner
        .reporter()
        .credentials()
        .clear()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Credentials cleared");
    Ok(StatusCode::NO_CONTENT)
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route(
        "/session",
        get(get_session).put(put_session).delete(delete_session),
    )
}
