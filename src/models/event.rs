use serde::{Deserialize, Serialize};

use crate::models::status::StatusCode;

/// One point in a shipment's timeline.
///
/// `time` is the normalized `YYYY-MM-DD HH:MM:SS` form; when the wire value
/// could not be parsed it is the original string, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub time: String,
    pub status_code: StatusCode,
    pub status_name: String,
    pub description: String,
}

/// Transient result of a single track query. Never persisted.
///
/// `last_event` may be absent even when `events` is non-empty; the remote
/// API's last-event field is nullable independently of the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub last_event: Option<TrackingEvent>,
    pub events: Vec<TrackingEvent>,
}
