//! Server-Sent Events stream of scan events

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

/// GET /events
///
/// Streams every `ScanEvent` (camera, model, scan and points events) as
/// `event: <type>` with a JSON payload, plus a heartbeat comment every 15 s.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    debug!("SSE: Broadcasting {}", event_type);
                                    yield Ok(Event::default().event(event_type).data(json));
                                }
                                Err(e) => warn!("SSE: Failed to serialize {}: {}", event_type, e),
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("SSE: Client lagged, {} events dropped", skipped);
                        }
                        Err(RecvError::Closed) => {
                            info!("SSE: Event bus closed");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat"))
}
