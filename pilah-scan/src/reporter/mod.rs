//! Fire-and-forget reporting of classification results
//!
//! Reporting is gated on stored credentials. Without them nothing is sent;
//! with them the POST runs on its own task and any failure is logged and
//! dropped. The classification flow never waits on it.

mod client;

pub use client::{BackendError, ScoringClient};

use chrono::Utc;
use pilah_common::api::ScanReport;
use pilah_common::events::{EventBus, ScanEvent};
use pilah_common::CredentialStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sends top results to the scoring backend
#[derive(Clone)]
pub struct Reporter {
    client: Arc<ScoringClient>,
    credentials: CredentialStore,
    events: EventBus,
}

impl Reporter {
    pub fn new(client: Arc<ScoringClient>, credentials: CredentialStore, events: EventBus) -> Self {
        Self {
            client,
            credentials,
            events,
        }
    }

    pub fn client(&self) -> &Arc<ScoringClient> {
        &self.client
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Report one result in the background
    ///
    /// Returns `None` without touching the network when no complete
    /// credential pair is stored. The returned handle never yields an
    /// error; awaiting it is optional.
    pub async fn report(&self, classification: &str, confidence: f32) -> Option<JoinHandle<()>> {
        let Some(credentials) = self.credentials.load().await else {
            debug!(classification, "No stored credentials, result not reported");
            return None;
        };

        let report = ScanReport {
            user_id: credentials.user_id.clone(),
            classification: classification.to_string(),
            confidence,
        };
        let client = Arc::clone(&self.client);
        let events = self.events.clone();

        Some(tokio::spawn(async move {
            match client.post_scan(&credentials, &report).await {
                Ok(response) => match response.points_added {
                    Some(points) if points > 0 => {
                        info!(
                            classification = %report.classification,
                            points,
                            "Scan recorded, points awarded"
                        );
                        events.emit_lossy(ScanEvent::PointsAwarded {
                            classification: report.classification,
                            points,
                            timestamp: Utc::now(),
                        });
                    }
                    _ => debug!(classification = %report.classification, "Scan recorded"),
                },
                Err(e) => warn!(
                    classification = %report.classification,
                    error = %e,
                    "Failed to record scan result"
                ),
            }
        }))
    }
}
