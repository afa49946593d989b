//! Wire types shared by Pilah services
//!
//! Request/response bodies for the remote scoring backend and the error
//! envelope returned by the Pilah HTTP surface. Pure data, no HTTP framework
//! dependencies.

pub mod types;

pub use types::{
    BackendMessage, ErrorBody, ErrorResponse, LeaderboardEntry, ScanRecord, ScanReport,
    ScanReportResponse,
};
