use crate::error::TrackerError;
use crate::models::event::FetchResult;
use crate::models::parcel::ParcelRecord;

/// Everything the engine tells its caller. The engine never renders; the
/// presentation layer subscribes and decides what to draw or dispatch.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// User-visible progress message for the caller's activity log.
    Log(String),

    /// One-second heartbeat counting down to the next automatic refresh.
    CountdownTick { seconds_remaining: u64 },

    /// A parcel fetch finished and the merged record was stored.
    FetchSucceeded {
        record: ParcelRecord,
        result: FetchResult,
        is_new: bool,
        interactive: bool,
        should_notify: bool,
    },

    /// A parcel fetch failed; the stored record is untouched.
    FetchFailed {
        name: String,
        number: String,
        error: TrackerError,
        is_new: bool,
        interactive: bool,
    },

    /// Desktop-notification request for the caller's dispatcher.
    Notify { title: String, body: String },

    /// Every fetch in a batch refresh has completed.
    BatchCompleted,

    /// The engine refused to start the scheduler without complete
    /// credentials; the caller should run its setup flow.
    CredentialsInvalid,
}
