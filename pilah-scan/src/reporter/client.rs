//! Scoring backend client
//!
//! REST endpoints:
//! - `POST {api}/scans` records a classification and may award points
//! - `GET {api}/scans/{userId}` lists a user's past scans
//! - `GET {api}/leaderboard` lists users by points

use axum::http::StatusCode;
use pilah_common::api::{
    BackendMessage, LeaderboardEntry, ScanRecord, ScanReport, ScanReportResponse,
};
use pilah_common::Credentials;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("pilah-scan/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scoring backend errors, classified by HTTP status
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered 500
    #[error("Scoring backend internal error")]
    Server,

    /// Backend answered 404
    #[error("Scoring backend endpoint not found")]
    NotFound,

    /// Backend answered 401
    #[error("Not authenticated with scoring backend")]
    Unauthenticated,

    /// Any other non-success status
    #[error("Scoring backend returned {status}")]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// No response (connection refused, DNS, timeout)
    #[error("Scoring backend unreachable: {0}")]
    Unreachable(String),

    /// Response body did not match the expected shape
    #[error("Invalid response from scoring backend: {0}")]
    Decode(String),

    /// Request could not be built (bad base URL, client setup)
    #[error("Scoring client error: {0}")]
    Client(String),
}

impl BackendError {
    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Server => {
                "The server ran into a problem. Please try again later.".to_string()
            }
            BackendError::NotFound => "Endpoint not found.".to_string(),
            BackendError::Unauthenticated => "You need to log in first.".to_string(),
            BackendError::Status {
                message: Some(message),
                ..
            } => format!("Something went wrong: {message}"),
            BackendError::Status { message: None, .. } => {
                "Something went wrong. Please try again.".to_string()
            }
            BackendError::Unreachable(_) => {
                "Cannot reach the server. Check your internet connection.".to_string()
            }
            BackendError::Decode(_) => "The server sent an unexpected response.".to_string(),
            BackendError::Client(detail) => format!("Something went wrong: {detail}"),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Server => "BACKEND_SERVER_ERROR",
            BackendError::NotFound => "BACKEND_NOT_FOUND",
            BackendError::Unauthenticated => "UNAUTHENTICATED",
            BackendError::Status { .. } => "BACKEND_ERROR",
            BackendError::Unreachable(_) => "BACKEND_UNREACHABLE",
            BackendError::Decode(_) => "BACKEND_INVALID_RESPONSE",
            BackendError::Client(_) => "CLIENT_ERROR",
        }
    }

    /// Status to return when proxying this error to our own clients
    pub fn http_status(&self) -> StatusCode {
        match self {
            BackendError::NotFound => StatusCode::NOT_FOUND,
            BackendError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BackendError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Classify a non-success response
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            500 => BackendError::Server,
            404 => BackendError::NotFound,
            401 => BackendError::Unauthenticated,
            _ => BackendError::Status {
                status,
                message: serde_json::from_str::<BackendMessage>(body)
                    .ok()
                    .and_then(|m| m.message)
                    .filter(|m| !m.trim().is_empty()),
            },
        }
    }
}

/// HTTP client for the scoring backend
#[derive(Debug, Clone)]
pub struct ScoringClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ScoringClient {
    /// `base_url` is the API root, e.g. `http://localhost:3005/api`
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Client(format!("invalid API URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Client(format!(
                "API URL cannot be a base: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Record one classification result
    pub async fn post_scan(
        &self,
        credentials: &Credentials,
        report: &ScanReport,
    ) -> Result<ScanReportResponse, BackendError> {
        let url = self.endpoint(&["scans"]);
        debug!(%url, classification = %report.classification, "Posting scan result");

        let request = self
            .http
            .post(url)
            .bearer_auth(&credentials.token)
            .json(report);
        let body = send(request).await?.text().await.map_err(decode_error)?;

        // Some backends answer with an empty body
        if body.trim().is_empty() {
            return Ok(ScanReportResponse::default());
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// A user's scans, newest first (records without a timestamp last)
    pub async fn history(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<Vec<ScanRecord>, BackendError> {
        let mut request = self.http.get(self.endpoint(&["scans", user_id]));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let mut records: Vec<ScanRecord> = json(send(request).await?).await?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub async fn leaderboard(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let mut request = self.http.get(self.endpoint(&["leaderboard"]));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        json(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Unreachable(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::from_status(status.as_u16(), &body))
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response.json().await.map_err(decode_error)
}

fn decode_error(e: reqwest::Error) -> BackendError {
    BackendError::Decode(e.to_string())
}
