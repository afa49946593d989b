//! Shared API request/response types
//!
//! Field names follow the scoring backend's camelCase JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ========================================
// Scoring Backend Types
// ========================================

/// Body of `POST /scans`
///
/// # Examples
///
/// ```
/// use pilah_common::api::ScanReport;
///
/// let report = ScanReport {
///     user_id: "user-1".to_string(),
///     classification: "Plastik".to_string(),
///     confidence: 0.55,
/// };
/// let json = serde_json::to_value(&report).unwrap();
/// assert_eq!(json["userId"], "user-1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub user_id: String,
    /// Display label of the top category
    pub classification: String,
    /// Probability of the top category (0.0-1.0)
    pub confidence: f32,
}

/// Response of `POST /scans`
///
/// `pointsAdded` is optional; older backends return an empty object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReportResponse {
    #[serde(default)]
    pub points_added: Option<u32>,
}

/// One entry of `GET /scans/{userId}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub classification: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Accepts RFC 3339 strings, offset-less date-times (taken as UTC),
    /// epoch milliseconds and `{_seconds, _nanoseconds}` objects; anything
    /// else becomes `None` rather than failing the whole list
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(fields) => {
            let seconds = fields
                .get("_seconds")
                .or_else(|| fields.get("seconds"))?
                .as_i64()?;
            let nanos = fields
                .get("_nanoseconds")
                .or_else(|| fields.get("nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

/// One entry of `GET /leaderboard`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
}

impl LeaderboardEntry {
    /// Name shown on the leaderboard ("User" when the backend has none)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("User")
    }

    pub fn points(&self) -> i64 {
        self.points.unwrap_or(0)
    }
}

/// Error body the scoring backend may attach to non-success responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendMessage {
    #[serde(default)]
    pub message: Option<String>,
}

// ========================================
// Error Response Types
// ========================================

/// Error envelope returned by Pilah HTTP endpoints
///
/// ```json
/// {"error": {"code": "MODEL_NOT_READY", "message": "..."}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
