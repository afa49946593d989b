//! Shared fixtures for pilah-scan integration tests
//!
//! - `StubModel`: fixed-output classifier
//! - `FakeCamera`: capture backend that counts open device handles
//! - `StubBackend`: in-process scoring backend on 127.0.0.1:0
//! - image helpers producing encoded PNG bytes

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use pilah_common::events::{EventBus, ScanEvent};
use pilah_common::{CredentialStore, Credentials};
use pilah_scan::capture::{CaptureBackend, CapturedFrame, DeviceHandle};
use pilah_scan::inference::{ClassificationModel, ModelSlot};
use pilah_scan::preprocess::InputTensor;
use pilah_scan::reporter::{Reporter, ScoringClient};
use pilah_scan::{ScanError, Scanner};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Model output that ranks plastic first with 0.55
pub const PLASTIC_SCORES: [f32; 10] = [0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.55, 0.05];

// ============================================================================
// Model
// ============================================================================

pub struct StubModel {
    scores: Vec<f32>,
    pub calls: AtomicUsize,
}

impl StubModel {
    pub fn new(scores: &[f32]) -> Arc<Self> {
        Arc::new(Self {
            scores: scores.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn plastic() -> Arc<Self> {
        Self::new(&PLASTIC_SCORES)
    }
}

impl ClassificationModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn forward(&self, input: &InputTensor) -> pilah_scan::error::Result<Vec<f32>> {
        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

pub fn ready_slot() -> ModelSlot {
    ModelSlot::ready(StubModel::plastic())
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Default)]
pub struct DeviceCounters {
    /// Handles currently open
    pub open: AtomicUsize,
    /// Handles ever opened
    pub opened: AtomicUsize,
    pub grabs: AtomicUsize,
}

impl DeviceCounters {
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }
}

/// Capture backend serving a fixed image
pub struct FakeCamera {
    pub counters: Arc<DeviceCounters>,
    frame: Vec<u8>,
    deny: bool,
}

impl FakeCamera {
    pub fn new(frame: Vec<u8>) -> (Self, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        (
            Self {
                counters: Arc::clone(&counters),
                frame,
                deny: false,
            },
            counters,
        )
    }

    /// Backend whose device always refuses access
    pub fn denied() -> (Self, Arc<DeviceCounters>) {
        let (mut camera, counters) = Self::new(Vec::new());
        camera.deny = true;
        (camera, counters)
    }
}

struct FakeHandle {
    counters: Arc<DeviceCounters>,
    frame: Vec<u8>,
    released: bool,
}

#[async_trait]
impl DeviceHandle for FakeHandle {
    async fn grab(&mut self) -> pilah_scan::error::Result<CapturedFrame> {
        self.counters.grabs.fetch_add(1, Ordering::SeqCst);
        Ok(CapturedFrame::from_camera(self.frame.clone()))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl CaptureBackend for FakeCamera {
    fn describe(&self) -> String {
        "fake-camera".to_string()
    }

    async fn open(&self) -> pilah_scan::error::Result<Box<dyn DeviceHandle>> {
        if self.deny {
            return Err(ScanError::PermissionDenied("fake-camera".to_string()));
        }
        self.counters.open.fetch_add(1, Ordering::SeqCst);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            counters: Arc::clone(&self.counters),
            frame: self.frame.clone(),
            released: false,
        }))
    }
}

// ============================================================================
// Images
// ============================================================================

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Encoded 224×224 all-black image
pub fn black_png() -> Vec<u8> {
    png_bytes(&RgbImage::new(224, 224))
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    png_bytes(&RgbImage::from_pixel(width, height, Rgb(color)))
}

// ============================================================================
// Scoring backend
// ============================================================================

#[derive(Default)]
pub struct BackendLog {
    pub hits: AtomicUsize,
    pub last_body: Mutex<Option<Value>>,
    pub last_auth: Mutex<Option<String>>,
}

impl BackendLog {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().unwrap().clone()
    }
}

/// What the stub answers to `POST /scans`
#[derive(Clone)]
pub enum ScanReply {
    Points(u32),
    Empty,
    Status(StatusCode),
    /// Accept the request and never answer within a test's lifetime
    Hang,
}

#[derive(Clone)]
struct StubState {
    log: Arc<BackendLog>,
    reply: ScanReply,
}

pub struct StubBackend {
    /// API root, e.g. `http://127.0.0.1:41234/api`
    pub api_url: String,
    pub log: Arc<BackendLog>,
}

impl StubBackend {
    pub async fn start(reply: ScanReply) -> Self {
        let log = Arc::new(BackendLog::default());
        let state = StubState {
            log: Arc::clone(&log),
            reply,
        };

        let app = Router::new()
            .route("/api/scans", post(post_scans))
            .route("/api/scans/:user_id", get(get_scans))
            .route("/api/leaderboard", get(get_leaderboard))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://{}/api", addr),
            log,
        }
    }
}

fn record(state: &StubState, headers: &HeaderMap, body: Option<Value>) {
    state.log.hits.fetch_add(1, Ordering::SeqCst);
    *state.log.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if body.is_some() {
        *state.log.last_body.lock().unwrap() = body;
    }
}

async fn post_scans(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, &headers, Some(body));
    match state.reply {
        ScanReply::Points(points) => Json(json!({ "pointsAdded": points })).into_response(),
        ScanReply::Empty => StatusCode::OK.into_response(),
        ScanReply::Status(status) => {
            (status, Json(json!({ "message": "stub failure" }))).into_response()
        }
        ScanReply::Hang => {
            tokio::time::sleep(Duration::from_secs(600)).await;
            StatusCode::OK.into_response()
        }
    }
}

async fn get_scans(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    record(&state, &headers, None);
    if user_id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        { "id": "a", "classification": "Kertas", "confidence": 0.7, "timestamp": "2024-05-01T08:00:00Z" },
        { "id": "b", "classification": "Plastik", "confidence": 0.9, "timestamp": "2024-05-03T08:00:00Z" },
        { "id": "c", "classification": "Baterai", "confidence": 0.8, "timestamp": "2024-05-02T08:00:00Z" },
        // 2024-04-30T08:00:00Z in the document-store encoding
        { "id": "d", "classification": "Styrofoam", "timestamp": { "_seconds": 1714464000, "_nanoseconds": 0 } }
    ]))
    .into_response()
}

async fn get_leaderboard(State(state): State<StubState>, headers: HeaderMap) -> Response {
    record(&state, &headers, None);
    Json(json!([
        { "id": "u1", "name": "Sari", "points": 120 },
        { "id": "u2", "points": 80 }
    ]))
    .into_response()
}

// ============================================================================
// Wiring
// ============================================================================

pub fn credential_store(dir: &tempfile::TempDir, logged_in: bool) -> CredentialStore {
    let path = dir.path().join("credentials.json");
    if logged_in {
        let credentials = Credentials::new("user-1", "secret-token");
        std::fs::write(&path, serde_json::to_string(&credentials).unwrap()).unwrap();
    }
    CredentialStore::new(path)
}

pub fn reporter(api_url: &str, store: CredentialStore, events: EventBus) -> Reporter {
    Reporter::new(
        Arc::new(ScoringClient::new(api_url).unwrap()),
        store,
        events,
    )
}

/// Scanner over a fake camera serving a black frame, with no stored login
/// and a backend URL nothing listens on
pub fn offline_scanner(
    dir: &tempfile::TempDir,
    model: ModelSlot,
) -> (Arc<Scanner>, Arc<DeviceCounters>) {
    let (camera, counters) = FakeCamera::new(black_png());
    let events = EventBus::new(100);
    let reporter = reporter(
        "http://127.0.0.1:9/api",
        credential_store(dir, false),
        events.clone(),
    );
    let scanner = Scanner::new(Box::new(camera), model, reporter, events);
    (Arc::new(scanner), counters)
}

/// Drain currently queued event types
pub fn drain_event_types(rx: &mut broadcast::Receiver<ScanEvent>) -> Vec<&'static str> {
    let mut types = Vec::new();
    while let Ok(event) = rx.try_recv() {
        types.push(event.event_type());
    }
    types
}

/// Wait for the first event of `event_type`
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<ScanEvent>,
    event_type: &str,
) -> Option<ScanEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if event.event_type() == event_type => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
