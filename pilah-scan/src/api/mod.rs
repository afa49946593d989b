//! HTTP API handlers for pilah-scan
//!
//! Thin JSON layer over [`Scanner`](crate::Scanner) plus proxies to the
//! scoring backend for history and leaderboard pages.

pub mod camera;
pub mod health;
pub mod model;
pub mod scan;
pub mod scores;
pub mod session;
pub mod sse;

pub use camera::camera_routes;
pub use health::health_routes;
pub use model::model_routes;
pub use scan::scan_routes;
pub use scores::score_routes;
pub use session::session_routes;
pub use sse::event_stream;
