//! Capture backend seam
//!
//! A [`CaptureBackend`] knows how to acquire a device; each acquisition
//! yields one [`DeviceHandle`] that owns the hardware until released.

use async_trait::async_trait;

use super::CapturedFrame;
use crate::error::Result;

/// Source of capture device sessions
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Human-readable device description for logs and events
    fn describe(&self) -> String;

    /// Acquire the device
    ///
    /// # Errors
    /// `DeviceUnavailable`, `PermissionDenied` or `DeviceError`.
    async fn open(&self) -> Result<Box<dyn DeviceHandle>>;
}

/// One open capture session
///
/// Implementations must release the device in `Drop` as well, so a handle
/// dropped on any path frees the hardware.
#[async_trait]
pub trait DeviceHandle: Send {
    /// Snapshot the current live image
    async fn grab(&mut self) -> Result<CapturedFrame>;

    /// Release the device; calling twice is a no-op
    fn release(&mut self);
}

#[async_trait]
impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn open(&self) -> Result<Box<dyn DeviceHandle>> {
        (**self).open().await
    }
}
