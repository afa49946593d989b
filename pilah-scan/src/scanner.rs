//! Classification orchestrator
//!
//! Owns the capture controller, the model slot and the reporter, and runs
//! one classification cycle per request:
//!
//! ```text
//! capture → decode → preprocess → classify → rank → enrich → report
//! ```
//!
//! Each stage's output is the next stage's only input. The camera lock is
//! held only for the capture itself, so stopping the camera never cancels a
//! cycle that already has its frame.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advice::{enrich, EnrichedResult};
use crate::capture::{CaptureBackend, CaptureController, CapturedFrame, DeviceState, FrameSource};
use crate::error::{Result, ScanError};
use crate::inference::{classify, ClassificationModel, ModelSlot, ModelStatus};
use crate::preprocess::preprocess;
use crate::ranking::{rank, Prediction};
use crate::reporter::Reporter;
use pilah_common::events::{EventBus, ScanEvent};

/// Result of one classification cycle
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub scan_id: Uuid,
    pub source: FrameSource,
    pub captured_at: DateTime<Utc>,
    /// All categories, highest probability first
    pub predictions: Vec<Prediction>,
    pub top: EnrichedResult,
    /// Whether the result was handed to the reporter
    pub reported: bool,
}

/// Camera, model and reporter behind one API
pub struct Scanner {
    camera: Mutex<CaptureController<Box<dyn CaptureBackend>>>,
    model: ModelSlot,
    reporter: Reporter,
    events: EventBus,
}

impl Scanner {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        model: ModelSlot,
        reporter: Reporter,
        events: EventBus,
    ) -> Self {
        Self {
            camera: Mutex::new(CaptureController::new(backend)),
            model,
            reporter,
            events,
        }
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model.status()
    }

    /// Load (or reload) the model and announce the outcome
    pub async fn load_model<F>(&self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<Arc<dyn ClassificationModel>> + Send + 'static,
    {
        let result = self.model.load_with(loader).await;
        let event = match (&result, self.model.status()) {
            (Ok(()), ModelStatus::Ready { model }) => ScanEvent::ModelLoaded {
                model,
                timestamp: Utc::now(),
            },
            (Err(e), _) => ScanEvent::ModelLoadFailed {
                reason: e.to_string(),
                timestamp: Utc::now(),
            },
            // a newer load owns the slot and will announce itself
            _ => return result,
        };
        self.events.emit_lossy(event);
        result
    }

    pub async fn camera_state(&self) -> DeviceState {
        self.camera.lock().await.state()
    }

    /// Acquire the camera (restarting it if already active)
    pub async fn start_camera(&self) -> Result<()> {
        let mut camera = self.camera.lock().await;
        camera.start().await?;
        self.events.emit_lossy(ScanEvent::CameraStarted {
            device: camera.backend().describe(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Release the camera; returns whether it was active
    pub async fn stop_camera(&self) -> bool {
        let stopped = self.camera.lock().await.stop();
        if stopped {
            self.events.emit_lossy(ScanEvent::CameraStopped {
                timestamp: Utc::now(),
            });
        }
        stopped
    }

    /// Capture from the live camera and classify
    ///
    /// # Errors
    /// [`ScanError::NotActive`] when the camera is not running, plus any
    /// capture or inference error.
    pub async fn scan(&self) -> Result<ScanOutcome> {
        let scan_id = Uuid::new_v4();
        let frame = {
            let mut camera = self.camera.lock().await;
            camera.capture().await
        };

        match frame {
            Ok(frame) => self.run_cycle(scan_id, frame).await,
            Err(e) => Err(self.fail(scan_id, e)),
        }
    }

    /// Classify an uploaded image
    ///
    /// The camera is released first; gallery uploads and the live feed are
    /// never used together.
    pub async fn classify_upload(&self, bytes: Vec<u8>) -> Result<ScanOutcome> {
        self.stop_camera().await;
        self.run_cycle(Uuid::new_v4(), CapturedFrame::from_upload(bytes))
            .await
    }

    /// Release long-lived resources; called on server teardown
    pub async fn shutdown(&self) {
        if self.stop_camera().await {
            info!("Camera released on shutdown");
        }
    }

    async fn run_cycle(&self, scan_id: Uuid, frame: CapturedFrame) -> Result<ScanOutcome> {
        debug!(%scan_id, source = ?frame.source(), bytes = frame.bytes().len(), "Classifying frame");

        match self.classify_frame(&frame).await {
            Ok((predictions, top)) => Ok(self.finish(scan_id, &frame, predictions, top).await),
            Err(e) => Err(self.fail(scan_id, e)),
        }
    }

    async fn classify_frame(
        &self,
        frame: &CapturedFrame,
    ) -> Result<(Vec<Prediction>, EnrichedResult)> {
        // Fail fast before spending time on decoding
        self.model.model()?;

        let image = frame.decode().await?;
        let tensor = preprocess(&image)?;
        drop(image);
        let set = classify(tensor, &self.model).await?;

        let predictions = rank(&set);
        let top = predictions
            .first()
            .map(enrich)
            .ok_or_else(|| ScanError::InferenceFailure("empty prediction set".to_string()))?;
        Ok((predictions, top))
    }

    async fn finish(
        &self,
        scan_id: Uuid,
        frame: &CapturedFrame,
        predictions: Vec<Prediction>,
        top: EnrichedResult,
    ) -> ScanOutcome {
        info!(
            %scan_id,
            category = %top.category,
            confidence = top.probability,
            "Scan completed"
        );

        let reported = self
            .reporter
            .report(top.label, top.probability)
            .await
            .is_some();

        self.events.emit_lossy(ScanEvent::ScanCompleted {
            scan_id,
            classification: top.label.to_string(),
            confidence: top.probability,
            timestamp: Utc::now(),
        });

        ScanOutcome {
            scan_id,
            source: frame.source(),
            captured_at: frame.captured_at(),
            predictions,
            top,
            reported,
        }
    }

    fn fail(&self, scan_id: Uuid, error: ScanError) -> ScanError {
        warn!(%scan_id, error = %error, "Scan failed");
        self.events.emit_lossy(ScanEvent::ScanFailed {
            scan_id,
            message: error.to_string(),
            timestamp: Utc::now(),
        });
        error
    }
}
