//! Periodic refresh scheduling.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::engine::FetchJob;
use crate::events::EngineEvent;
use crate::state::EngineState;

/// One-second tick driving the user-visible countdown. When it reaches zero
/// the countdown resets and a batch refresh starts. A manual refresh resets
/// the countdown from outside; this loop just keeps counting.
pub async fn run_scheduler(state: Arc<EngineState>) {
    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;
        let remaining = state.countdown.fetch_sub(1, Ordering::SeqCst) - 1;
        state.emit(EngineEvent::CountdownTick {
            seconds_remaining: remaining.max(0) as u64,
        });

        if remaining <= 0 {
            state.reset_countdown();
            start_batch(&state).await;
        }
    }
}

/// Enqueue one fetch job per stored parcel. The pending count is raised by
/// the full batch size before the first job is queued, so a fast worker
/// cannot drive it to zero mid-enqueue. An empty store leaves the engine
/// idle.
pub async fn start_batch(state: &EngineState) {
    let records = { state.store.lock().await.load() };
    if records.is_empty() {
        state.log("no parcels to check for updates");
        return;
    }

    state.log(format!("checking {} parcel(s) for updates", records.len()));
    state.pending.fetch_add(records.len(), Ordering::SeqCst);

    for record in records {
        let job = FetchJob {
            name: record.name,
            number: record.number,
            courier: record.courier,
            is_new: false,
            interactive: false,
            batch: true,
        };
        if state.job_tx.send(job).await.is_err() {
            // Queue closed: the engine is shutting down. Give this job's
            // share of the pending count back.
            state.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
