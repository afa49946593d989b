//! Captured still frames

use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;

use crate::error::{Result, ScanError};

/// Where a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    Camera,
    Upload,
}

/// Immutable encoded snapshot (JPEG, PNG, ...)
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    bytes: Arc<[u8]>,
    captured_at: DateTime<Utc>,
    source: FrameSource,
}

impl CapturedFrame {
    pub fn from_camera(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            captured_at: Utc::now(),
            source: FrameSource::Camera,
        }
    }

    /// Frame built from a user-supplied image file
    pub fn from_upload(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            captured_at: Utc::now(),
            source: FrameSource::Upload,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn source(&self) -> FrameSource {
        self.source
    }

    /// Decode to RGB on the blocking pool
    ///
    /// # Errors
    /// [`ScanError::InvalidFrame`] if the bytes are not a supported image.
    pub async fn decode(&self) -> Result<RgbImage> {
        let bytes = Arc::clone(&self.bytes);
        tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| ScanError::InvalidFrame(format!("decode task failed: {e}")))?
    }
}

/// Decode encoded image bytes into RGB8
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(ScanError::InvalidFrame("empty image data".to_string()));
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| ScanError::InvalidFrame(e.to_string()))
}
