//! pilah-scan: waste classification service
//!
//! Captures a still from a camera (or accepts an uploaded image), classifies
//! it into one of ten waste categories, attaches disposal advice and reports
//! the result to the scoring backend. A browser UI drives it over HTTP and
//! listens on `/events`.

pub mod advice;
pub mod api;
pub mod capture;
pub mod config;
pub mod error;
pub mod inference;
pub mod preprocess;
pub mod ranking;
pub mod reporter;
pub mod scanner;

pub use crate::error::{ApiError, ApiResult, ScanError};
pub use crate::scanner::{ScanOutcome, Scanner};

use axum::Router;
use chrono::{DateTime, Utc};
use pilah_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::inference::ModelLoader;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Camera, model and reporter
    pub scanner: Arc<Scanner>,
    /// Rebuilds the model on `POST /model/reload`
    pub model_loader: ModelLoader,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(scanner: Arc<Scanner>, model_loader: ModelLoader) -> Self {
        let event_bus = scanner.events().clone();
        Self {
            scanner,
            model_loader,
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::camera_routes())
        .merge(api::scan_routes())
        .merge(api::model_routes())
        .merge(api::score_routes())
        .merge(api::session_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
