//! Event types for the Pilah event system
//!
//! Provides the shared event definitions and EventBus. Events are transient
//! notifications for connected UIs (camera state, scan results, points
//! awarded); nothing downstream depends on them for correctness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pilah event types
///
/// Broadcast via [`EventBus`] and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// Capture device acquired and streaming
    CameraStarted {
        device: String,
        timestamp: DateTime<Utc>,
    },

    /// Capture device released
    CameraStopped { timestamp: DateTime<Utc> },

    /// Classification model finished loading and is ready
    ModelLoaded {
        model: String,
        timestamp: DateTime<Utc>,
    },

    /// Classification model failed to load; the UI should offer a reload
    ModelLoadFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A classification cycle produced a result
    ScanCompleted {
        scan_id: Uuid,
        /// Display label of the top category
        classification: String,
        /// Probability of the top category (0.0-1.0)
        confidence: f32,
        timestamp: DateTime<Utc>,
    },

    /// A classification cycle failed before producing a result
    ScanFailed {
        scan_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The scoring backend awarded points for a reported scan
    PointsAwarded {
        classification: String,
        points: u32,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::CameraStarted { .. } => "CameraStarted",
            ScanEvent::CameraStopped { .. } => "CameraStopped",
            ScanEvent::ModelLoaded { .. } => "ModelLoaded",
            ScanEvent::ModelLoadFailed { .. } => "ModelLoadFailed",
            ScanEvent::ScanCompleted { .. } => "ScanCompleted",
            ScanEvent::ScanFailed { .. } => "ScanFailed",
            ScanEvent::PointsAwarded { .. } => "PointsAwarded",
        }
    }
}

/// Broadcast bus for [`ScanEvent`]s
///
/// Cloning the bus shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use pilah_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let mut rx = event_bus.subscribe();
    /// assert!(rx.try_recv().is_err());
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }
}
