//! Error types for pilah-scan
//!
//! [`ScanError`] covers the capture → preprocess → inference chain. Reporting
//! failures live in [`BackendError`] and are absorbed by the reporter; they
//! only reach HTTP clients through the history/leaderboard proxies.
//! [`ApiError`] maps both onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pilah_common::api::{ErrorBody, ErrorResponse};
use thiserror::Error;

use crate::reporter::BackendError;

/// Classification pipeline error
#[derive(Debug, Error)]
pub enum ScanError {
    /// No capture API or device exists in this environment
    #[error("No capture device available: {0}")]
    DeviceUnavailable(String),

    /// Access to the capture device was refused
    #[error("Permission to use the capture device was denied: {0}")]
    PermissionDenied(String),

    /// The capture device failed while opening or streaming
    #[error("Capture device error: {0}")]
    DeviceError(String),

    /// `capture` was called while no session is active
    #[error("Camera is not active")]
    NotActive,

    /// Frame bytes could not be decoded into an image
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Inference requested before the model finished loading (or after it failed)
    #[error("Model is not ready: {0}")]
    ModelNotReady(String),

    /// Model artifact could not be loaded
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Forward pass failed or produced unusable scores
    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    /// Model output length does not match the category table
    #[error("Model produced {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
}

impl ScanError {
    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            ScanError::PermissionDenied(_) => "PERMISSION_DENIED",
            ScanError::DeviceError(_) => "DEVICE_ERROR",
            ScanError::NotActive => "NOT_ACTIVE",
            ScanError::InvalidFrame(_) => "INVALID_FRAME",
            ScanError::ModelNotReady(_) => "MODEL_NOT_READY",
            ScanError::ModelLoad(_) => "MODEL_LOAD_FAILED",
            ScanError::InferenceFailure(_) => "INFERENCE_FAILURE",
            ScanError::OutputShape { .. } => "OUTPUT_SHAPE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ScanError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScanError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ScanError::DeviceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScanError::NotActive => StatusCode::CONFLICT,
            ScanError::InvalidFrame(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScanError::ModelNotReady(_) | ScanError::ModelLoad(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ScanError::InferenceFailure(_) | ScanError::OutputShape { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Capture or classification failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Scoring backend call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Scan(err) => (err.status(), err.code(), err.to_string()),
            ApiError::Backend(err) => (
                err.http_status(),
                err.code(),
                err.user_message().to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
