//! Fetch workers: carrier resolution, per-parcel fetch, reconcile, persist.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::client::TrackingApi;
use crate::engine::FetchJob;
use crate::engine::reconcile::{NotifyDecision, Reconciliation, reconcile};
use crate::error::TrackerError;
use crate::events::EngineEvent;
use crate::models::event::FetchResult;
use crate::models::parcel::ParcelRecord;
use crate::state::{CachedDirectory, EngineState};

/// Pool worker: drains the shared batch queue until it closes.
pub async fn run_worker(
    id: usize,
    state: Arc<EngineState>,
    api: Arc<dyn TrackingApi>,
    job_rx: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
) {
    debug!(worker = id, "fetch worker started");

    loop {
        let job = { job_rx.lock().await.recv().await };
        match job {
            Some(job) => process_fetch(&state, api.as_ref(), job).await,
            None => break,
        }
    }

    warn!(worker = id, "fetch worker stopped: job queue closed");
}

/// Resolve a carrier label to its directory ID. The directory is fetched
/// per call unless the TTL cache option is enabled; per-fetch lookup is the
/// default.
pub async fn resolve_carrier(
    state: &EngineState,
    api: &dyn TrackingApi,
    label: &str,
) -> Result<String, TrackerError> {
    let carriers = directory(state, api).await?;
    carriers
        .get(label)
        .cloned()
        .ok_or_else(|| TrackerError::CarrierNotFound(label.to_string()))
}

async fn directory(
    state: &EngineState,
    api: &dyn TrackingApi,
) -> Result<BTreeMap<String, String>, TrackerError> {
    let ttl = state.config.cache_directory_ttl_secs;
    let endpoint = state.credentials.snapshot().endpoint;

    if ttl > 0 {
        if let Some(cached) = state.directory_cache.get(&endpoint) {
            if cached.fetched_at.elapsed() < Duration::from_secs(ttl) {
                return Ok(cached.carriers.clone());
            }
        }
    }

    let carriers = api.list_carriers().await?;
    if ttl > 0 {
        state.directory_cache.insert(
            endpoint,
            CachedDirectory {
                carriers: carriers.clone(),
                fetched_at: Instant::now(),
            },
        );
    }
    Ok(carriers)
}

/// Full per-parcel sequence. Pool workers call this for batch jobs; the
/// engine spawns it directly for interactive fetches, which never touch the
/// batch pending count.
pub async fn process_fetch(state: &EngineState, api: &dyn TrackingApi, job: FetchJob) {
    state.log(format!("checking '{}' ({})", job.name, job.number));

    match fetch_and_store(state, api, &job).await {
        Ok((reconciliation, result)) => {
            let Reconciliation { record, decision } = reconciliation;
            match &decision {
                NotifyDecision::StatusChanged { from, to } => {
                    info!(parcel = %job.number, %from, %to, "status change detected");
                }
                NotifyDecision::BaselineMissing => {
                    warn!(
                        parcel = %job.number,
                        "previous record missing for existing parcel; suppressing notification"
                    );
                }
                _ => {}
            }

            let should_notify = decision.should_notify();
            let body = result
                .last_event
                .as_ref()
                .map(|event| event.description.clone())
                .unwrap_or_default();

            state.emit(EngineEvent::FetchSucceeded {
                record,
                result,
                is_new: job.is_new,
                interactive: job.interactive,
                should_notify,
            });
            if should_notify {
                state.emit(EngineEvent::Notify {
                    title: format!("Tracking Status Updated: {}", job.name),
                    body,
                });
            }
        }
        Err(err) => {
            error!(parcel = %job.number, error = %err, "fetch failed");
            state.log(format!("error checking '{}': {err}", job.name));
            state.emit(EngineEvent::FetchFailed {
                name: job.name.clone(),
                number: job.number.clone(),
                error: err,
                is_new: job.is_new,
                interactive: job.interactive,
            });
        }
    }

    if job.batch {
        let remaining = state.pending.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            state.log("all pending updates completed");
            state.emit(EngineEvent::BatchCompleted);
        }
    }
}

/// Resolve, fetch, reconcile and persist one parcel. The reconcile and the
/// upsert happen under the store lock so two parcels completing at once
/// cannot interleave their read-modify-write cycles. A failed persist is
/// logged and the fetch still counts as a success; the display state is
/// merely stale.
async fn fetch_and_store(
    state: &EngineState,
    api: &dyn TrackingApi,
    job: &FetchJob,
) -> Result<(Reconciliation, FetchResult), TrackerError> {
    let carrier_id = resolve_carrier(state, api, &job.courier).await?;
    let result = api.fetch_tracking(&carrier_id, &job.number).await?;

    let today = Local::now().date_naive();
    let reconciliation = {
        let store = state.store.lock().await;
        let previous: Option<ParcelRecord> = store.find(&job.number);
        let reconciliation = reconcile(previous.as_ref(), job, &result, today);
        if let Err(err) = store.upsert(reconciliation.record.clone()) {
            error!(parcel = %job.number, error = %err, "failed to persist history; display state may be stale");
            state.log(format!("error saving history: {err}"));
        }
        reconciliation
    };

    Ok((reconciliation, result))
}
