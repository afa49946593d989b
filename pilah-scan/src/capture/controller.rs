//! Capture device lifecycle
//!
//! ```text
//! Idle --start ok--> Active --stop--> Idle
//! Idle --start err--> Idle
//! Active --start--> Active   (old handle released before the new open)
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{CaptureBackend, CapturedFrame, DeviceHandle};
use crate::error::{Result, ScanError};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Idle,
    Active,
}

/// Owns at most one open device session
pub struct CaptureController<B: CaptureBackend> {
    backend: B,
    session: Option<Box<dyn DeviceHandle>>,
}

impl<B: CaptureBackend> CaptureController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> DeviceState {
        if self.session.is_some() {
            DeviceState::Active
        } else {
            DeviceState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Acquire the device, tearing down any existing session first
    ///
    /// On failure the controller is left Idle.
    pub async fn start(&mut self) -> Result<()> {
        if self.release_session() {
            debug!("Restarting capture session");
        }

        match self.backend.open().await {
            Ok(handle) => {
                info!(device = %self.backend.describe(), "Capture session started");
                self.session = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.backend.describe(), error = %e, "Failed to start capture");
                Err(e)
            }
        }
    }

    /// Snapshot the live feed
    ///
    /// # Errors
    /// [`ScanError::NotActive`] while Idle.
    pub async fn capture(&mut self) -> Result<CapturedFrame> {
        let session = self.session.as_mut().ok_or(ScanError::NotActive)?;
        session.grab().await
    }

    /// Release the device and return to Idle
    ///
    /// Returns whether a session was actually open.
    pub fn stop(&mut self) -> bool {
        let released = self.release_session();
        if released {
            info!(device = %self.backend.describe(), "Capture session stopped");
        }
        released
    }

    fn release_session(&mut self) -> bool {
        match self.session.take() {
            Some(mut handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

impl<B: CaptureBackend> Drop for CaptureController<B> {
    fn drop(&mut self) {
        self.release_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        open: AtomicUsize,
        opened_total: AtomicUsize,
    }

    struct CountingBackend {
        counters: Arc<Counters>,
        fail: bool,
    }

    struct CountingHandle {
        counters: Arc<Counters>,
        released: bool,
    }

    #[async_trait]
    impl DeviceHandle for CountingHandle {
        async fn grab(&mut self) -> Result<CapturedFrame> {
            Ok(CapturedFrame::from_camera(vec![1, 2, 3]))
        }

        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.counters.open.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl Drop for CountingHandle {
        fn drop(&mut self) {
            self.release();
        }
    }

    #[async_trait]
    impl CaptureBackend for CountingBackend {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn open(&self) -> Result<Box<dyn DeviceHandle>> {
            if self.fail {
                return Err(ScanError::PermissionDenied("denied".to_string()));
            }
            self.counters.open.fetch_add(1, Ordering::SeqCst);
            self.counters.opened_total.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingHandle {
                counters: Arc::clone(&self.counters),
                released: false,
            }))
        }
    }

    fn controller(fail: bool) -> (CaptureController<CountingBackend>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = CountingBackend {
            counters: Arc::clone(&counters),
            fail,
        };
        (CaptureController::new(backend), counters)
    }

    #[tokio::test]
    async fn test_failed_start_stays_idle() {
        let (mut controller, counters) = controller(true);
        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, ScanError::PermissionDenied(_)));
        assert_eq!(controller.state(), DeviceState::Idle);
        assert_eq!(counters.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_session() {
        let (mut controller, counters) = controller(false);
        controller.start().await.unwrap();
        assert_eq!(counters.open.load(Ordering::SeqCst), 1);

        drop(controller);
        assert_eq!(counters.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capture_after_stop_is_not_active() {
        let (mut controller, _) = controller(false);
        controller.start().await.unwrap();
        assert!(controller.capture().await.is_ok());

        assert!(controller.stop());
        assert!(matches!(
            controller.capture().await,
            Err(ScanError::NotActive)
        ));
    }
}
