//! History and leaderboard, proxied from the scoring backend

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use pilah_common::api::ScanRecord;
use serde::Serialize;

use crate::advice::POINTS_PER_SCAN;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ScanRecord,
    pub points: u32,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub scans: Vec<HistoryEntry>,
    pub total_points: u32,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub points: i64,
}

/// GET /history/:user_id
///
/// Scans newest first, each credited [`POINTS_PER_SCAN`].
pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let reporter = state.scanner.reporter();
    let credentials = reporter.credentials().load().await;
    let token = credentials.as_ref().map(|c| c.token.as_str());

    let records = reporter.client().history(&user_id, token).await?;

    let scans: Vec<HistoryEntry> = records
        .into_iter()
        .map(|record| HistoryEntry {
            points: POINTS_PER_SCAN,
            record,
        })
        .collect();
    let total_points = scans.iter().map(|s| s.points).sum();

    Ok(Json(HistoryResponse {
        scans,
        total_points,
    }))
}

/// GET /leaderboard
pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Json<Vec<LeaderboardRow>>> {
    let reporter = state.scanner.reporter();
    let credentials = reporter.credentials().load().await;
    let token = credentials.as_ref().map(|c| c.token.as_str());

    let entries = reporter.client().leaderboard(token).await?;

    Ok(Json(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| LeaderboardRow {
                rank: i + 1,
                name: entry.display_name().to_string(),
                points: entry.points(),
            })
            .collect(),
    ))
}

pub fn score_routes() -> Router<AppState> {
    Router::new()
        .route("/history/:user_id", get(history))
        .route("/leaderboard", get(leaderboard))
}
