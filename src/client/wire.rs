//! GraphQL wire types and payload shaping for the tracking API.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Deserialize;

use crate::models::event::{FetchResult, TrackingEvent};
use crate::models::status::StatusCode;

pub const CARRIER_LIST_QUERY: &str = r#"
query CarrierList($after: String) {
    carriers(first: 40, after: $after) {
        pageInfo {
            hasNextPage
            endCursor
        }
        edges {
            node {
                id
                name
                displayName
            }
        }
    }
}
"#;

pub const TRACK_QUERY: &str = r#"
query Track($carrierId: ID!, $trackingNumber: String!) {
    track(carrierId: $carrierId, trackingNumber: $trackingNumber) {
        lastEvent {
            time
            status {
                code
                name
            }
            description
        }
        events(last: 10) {
            edges {
                node {
                    time
                    status {
                        code
                        name
                    }
                    description
                }
            }
        }
    }
}
"#;

/// Envelope common to every GraphQL response. A missing or null `data`
/// field is the remote's way of signalling failure.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphQlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct CarrierListData {
    pub carriers: CarrierConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierConnection {
    pub page_info: PageInfo,
    pub edges: Vec<CarrierEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CarrierEdge {
    pub node: CarrierNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl CarrierNode {
    /// Label preference: `displayName`, then `name`, then the raw id.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .filter(|label| !label.is_empty())
            .or_else(|| self.name.clone().filter(|label| !label.is_empty()))
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Merge one directory page into `carriers`. Returns the cursor for the next
/// page, or `None` when the listing is exhausted.
pub fn merge_carrier_page(
    page: CarrierListData,
    carriers: &mut BTreeMap<String, String>,
) -> Option<String> {
    for edge in page.carriers.edges {
        let label = edge.node.label();
        carriers.insert(label, edge.node.id);
    }

    let info = page.carriers.page_info;
    if info.has_next_page {
        info.end_cursor
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackData {
    #[serde(default)]
    pub track: Option<TrackInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    #[serde(default)]
    pub last_event: Option<WireEvent>,
    #[serde(default)]
    pub events: Option<EventConnection>,
}

#[derive(Debug, Deserialize)]
pub struct EventConnection {
    pub edges: Vec<EventEdge>,
}

#[derive(Debug, Deserialize)]
pub struct EventEdge {
    #[serde(default)]
    pub node: Option<WireEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WireEvent {
    pub time: String,
    pub status: WireStatus,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireStatus {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl WireEvent {
    fn into_event(self) -> TrackingEvent {
        let WireEvent {
            time,
            status,
            description,
        } = self;
        let status_code = StatusCode::from_code(&status.code);
        TrackingEvent {
            time: normalize_time(&time),
            status_code,
            status_name: status
                .name
                .unwrap_or_else(|| status_code.pretty_name().to_string()),
            description: description.unwrap_or_default(),
        }
    }
}

/// Normalize an ISO-8601 `Z`-suffixed timestamp to `YYYY-MM-DD HH:MM:SS`.
/// Malformed input passes through unmodified; a single bad timestamp must
/// not abort an otherwise-usable result.
pub fn normalize_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Flatten a track payload into a [`FetchResult`], with the timeline sorted
/// ascending by event time. Events whose time cannot be parsed sort after
/// the parseable ones, keeping their relative order.
pub fn into_fetch_result(info: TrackInfo) -> FetchResult {
    let mut wire_events: Vec<WireEvent> = info
        .events
        .map(|connection| {
            connection
                .edges
                .into_iter()
                .filter_map(|edge| edge.node)
                .collect()
        })
        .unwrap_or_default();
    wire_events.sort_by_key(|event| time_sort_key(&event.time));

    FetchResult {
        last_event: info.last_event.map(WireEvent::into_event),
        events: wire_events.into_iter().map(WireEvent::into_event).collect(),
    }
}

fn time_sort_key(raw: &str) -> (bool, i64) {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => (false, parsed.timestamp()),
        Err(_) => (true, 0),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{
        CarrierListData, GraphQlResponse, TrackData, into_fetch_result, merge_carrier_page,
        normalize_time,
    };
    use crate::models::status::StatusCode;

    fn carrier_page(value: serde_json::Value) -> CarrierListData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalize_converts_zulu_timestamps() {
        assert_eq!(
            normalize_time("2024-03-01T09:30:05Z"),
            "2024-03-01 09:30:05"
        );
    }

    #[test]
    fn normalize_passes_malformed_input_through() {
        assert_eq!(normalize_time("not-a-date"), "not-a-date");
    }

    #[test]
    fn carrier_label_prefers_display_name() {
        let page = carrier_page(json!({
            "carriers": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "edges": [
                    { "node": { "id": "kr.cjlogistics", "name": "CJ Logistics", "displayName": "CJ Logistics Korea" } },
                    { "node": { "id": "us.ups", "name": "UPS" } },
                    { "node": { "id": "de.dhl", "name": "" } }
                ]
            }
        }));

        let mut carriers = BTreeMap::new();
        let next = merge_carrier_page(page, &mut carriers);

        assert!(next.is_none());
        assert_eq!(carriers["CJ Logistics Korea"], "kr.cjlogistics");
        assert_eq!(carriers["UPS"], "us.ups");
        assert_eq!(carriers["de.dhl"], "de.dhl");
    }

    #[test]
    fn pagination_cursor_is_followed_until_exhausted() {
        let page = carrier_page(json!({
            "carriers": {
                "pageInfo": { "hasNextPage": true, "endCursor": "cursor-2" },
                "edges": [ { "node": { "id": "us.usps", "name": "USPS" } } ]
            }
        }));

        let mut carriers = BTreeMap::new();
        assert_eq!(
            merge_carrier_page(page, &mut carriers),
            Some("cursor-2".to_string())
        );
    }

    #[test]
    fn missing_data_field_is_detectable() {
        let body: GraphQlResponse<CarrierListData> =
            serde_json::from_value(json!({ "errors": [{ "message": "unauthorized" }] })).unwrap();
        assert!(body.data.is_none());
    }

    #[test]
    fn events_are_sorted_ascending_regardless_of_wire_order() {
        let body: GraphQlResponse<TrackData> = serde_json::from_value(json!({
            "data": {
                "track": {
                    "lastEvent": {
                        "time": "2024-03-03T10:00:00Z",
                        "status": { "code": "IN_TRANSIT", "name": "In transit" },
                        "description": "Departed facility"
                    },
                    "events": {
                        "edges": [
                            { "node": { "time": "2024-03-03T10:00:00Z", "status": { "code": "IN_TRANSIT", "name": "In transit" } } },
                            { "node": { "time": "2024-03-01T08:00:00Z", "status": { "code": "INFORMATION_RECEIVED", "name": "Info received" } } },
                            { "node": { "time": "2024-03-02T09:00:00Z", "status": { "code": "AT_PICKUP", "name": "At pickup" } } }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let result = into_fetch_result(body.data.unwrap().track.unwrap());
        let times: Vec<&str> = result.events.iter().map(|e| e.time.as_str()).collect();
        assert_eq!(
            times,
            vec![
                "2024-03-01 08:00:00",
                "2024-03-02 09:00:00",
                "2024-03-03 10:00:00"
            ]
        );
    }

    #[test]
    fn malformed_event_time_sorts_last_and_passes_through() {
        let track: TrackData = serde_json::from_value(json!({
            "track": {
                "lastEvent": null,
                "events": {
                    "edges": [
                        { "node": { "time": "not-a-date", "status": { "code": "EXCEPTION" } } },
                        { "node": { "time": "2024-03-01T08:00:00Z", "status": { "code": "IN_TRANSIT" } } }
                    ]
                }
            }
        }))
        .unwrap();

        let result = into_fetch_result(track.track.unwrap());
        assert!(result.last_event.is_none());
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].time, "2024-03-01 08:00:00");
        assert_eq!(result.events[1].time, "not-a-date");
        assert_eq!(result.events[1].status_code, StatusCode::Exception);
    }

    #[test]
    fn null_track_field_deserializes_to_none() {
        let track: TrackData = serde_json::from_value(json!({ "track": null })).unwrap();
        assert!(track.track.is_none());
    }
}
