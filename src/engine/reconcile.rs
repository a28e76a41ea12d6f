//! Pure merge of a fetch result against the stored record.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::engine::FetchJob;
use crate::models::event::{FetchResult, TrackingEvent};
use crate::models::parcel::ParcelRecord;
use crate::models::status::StatusCode;

/// Why (or why not) the caller should raise a desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyDecision {
    /// First successful fetch for a parcel the user just added.
    FirstFetch,
    /// Stored status differs from the freshly fetched one.
    StatusChanged { from: StatusCode, to: StatusCode },
    /// Same status as last time.
    Unchanged,
    /// The fetch carried no last event; nothing to conclude.
    Inconclusive,
    /// The parcel is known to the caller but has no stored record, so there
    /// is no baseline to compare against. Never notifies.
    BaselineMissing,
}

impl NotifyDecision {
    pub fn should_notify(&self) -> bool {
        matches!(
            self,
            NotifyDecision::FirstFetch | NotifyDecision::StatusChanged { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub record: ParcelRecord,
    pub decision: NotifyDecision,
}

/// Merge `result` with the previously stored record for this parcel.
///
/// `result.events` must already be sorted ascending by time (the client
/// guarantees this); `today` is passed in so the day arithmetic stays
/// deterministic under test.
pub fn reconcile(
    previous: Option<&ParcelRecord>,
    job: &FetchJob,
    result: &FetchResult,
    today: NaiveDate,
) -> Reconciliation {
    let Some(last_event) = result.last_event.as_ref() else {
        // Inconclusive fetch: keep whatever we already had.
        let record = previous
            .cloned()
            .unwrap_or_else(|| ParcelRecord::new(&job.name, &job.number, &job.courier));
        return Reconciliation {
            record,
            decision: NotifyDecision::Inconclusive,
        };
    };

    let decision = if job.is_new {
        NotifyDecision::FirstFetch
    } else {
        match previous {
            Some(prev) if prev.last_status != last_event.status_code => {
                NotifyDecision::StatusChanged {
                    from: prev.last_status,
                    to: last_event.status_code,
                }
            }
            Some(_) => NotifyDecision::Unchanged,
            None => NotifyDecision::BaselineMissing,
        }
    };

    let record = ParcelRecord {
        name: job.name.clone(),
        number: job.number.clone(),
        courier: job.courier.clone(),
        last_status: last_event.status_code,
        last_updated_time: Some(last_event.time.clone()),
        days_in_transit: days_in_transit(&result.events, last_event, today),
    };

    Reconciliation { record, decision }
}

/// Whole days between the earliest known event and either the delivery time
/// or today. `None` when the timeline is empty or its dates cannot be
/// parsed.
fn days_in_transit(
    events: &[TrackingEvent],
    last_event: &TrackingEvent,
    today: NaiveDate,
) -> Option<i64> {
    let start = parse_event_date(&events.first()?.time)?;
    let end = if last_event.status_code == StatusCode::Delivered {
        parse_event_date(&last_event.time)?
    } else {
        today
    };
    Some((end - start).num_days())
}

fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.date());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.date_naive())
}
