//! Parcel synchronization engine: refresh scheduling, bounded fetch
//! fan-out, reconciliation, and event emission.

pub mod reconcile;
pub mod scheduler;
pub mod worker;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::client::TrackingApi;
use crate::config::{Config, CredentialProvider, Credentials};
use crate::error::TrackerError;
use crate::events::EngineEvent;
use crate::models::parcel::ParcelRecord;
use crate::state::EngineState;
use crate::store::HistoryStore;

/// One unit of fetch work.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub name: String,
    pub number: String,
    pub courier: String,
    /// First fetch for a parcel the user just added.
    pub is_new: bool,
    /// Triggered by direct user action on a single parcel.
    pub interactive: bool,
    /// Participates in the batch pending count.
    pub batch: bool,
}

/// Engine-level refresh state. One state for the whole session, not per
/// parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Refreshing { pending: usize },
}

/// Facade the presentation layer drives. Cheap to clone; all clones share
/// the same state and event channel.
#[derive(Clone)]
pub struct SyncEngine {
    state: Arc<EngineState>,
    api: Arc<dyn TrackingApi>,
    job_rx: Arc<std::sync::Mutex<Option<mpsc::Receiver<FetchJob>>>>,
}

impl SyncEngine {
    pub fn new(
        config: Config,
        credentials: CredentialProvider,
        store: HistoryStore,
        api: Arc<dyn TrackingApi>,
    ) -> Self {
        let (state, job_rx) = EngineState::new(config, credentials, store);
        Self {
            state: Arc::new(state),
            api,
            job_rx: Arc::new(std::sync::Mutex::new(Some(job_rx))),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.state.events_tx.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<EngineEvent> {
        BroadcastStream::new(self.subscribe())
    }

    pub fn status(&self) -> EngineStatus {
        match self.state.pending.load(Ordering::SeqCst) {
            0 => EngineStatus::Idle,
            pending => EngineStatus::Refreshing { pending },
        }
    }

    /// Spawn the fetch workers and the refresh scheduler, then kick off an
    /// immediate batch. Refuses to run without complete credentials so the
    /// caller can route to its setup flow instead.
    pub fn start(&self) -> Result<(), TrackerError> {
        if !self.state.credentials.snapshot().is_complete() {
            self.state.emit(EngineEvent::CredentialsInvalid);
            return Err(TrackerError::CredentialsMissing);
        }

        let receiver = self
            .job_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or_else(|| TrackerError::Config("engine already started".to_string()))?;

        let job_rx = Arc::new(Mutex::new(receiver));
        let workers = self.state.config.worker_count.max(1);
        for id in 0..workers {
            tokio::spawn(worker::run_worker(
                id,
                self.state.clone(),
                self.api.clone(),
                job_rx.clone(),
            ));
        }
        tokio::spawn(scheduler::run_scheduler(self.state.clone()));

        // Initial refresh on startup, before the first timer expiry.
        let state = self.state.clone();
        tokio::spawn(async move {
            scheduler::start_batch(&state).await;
        });

        info!(workers, "sync engine started");
        Ok(())
    }

    /// Manual batch refresh; resets the automatic countdown and starts
    /// immediately regardless of remaining time.
    pub async fn refresh_all(&self) {
        self.state.reset_countdown();
        scheduler::start_batch(&self.state).await;
    }

    /// Interactive first fetch for a parcel the user just added. Runs
    /// outside the batch pool and outside the pending count.
    pub fn track_new(
        &self,
        name: impl Into<String>,
        number: impl Into<String>,
        courier: impl Into<String>,
    ) {
        self.spawn_interactive(FetchJob {
            name: name.into(),
            number: number.into(),
            courier: courier.into(),
            is_new: true,
            interactive: true,
            batch: false,
        });
    }

    /// Interactive re-fetch of a parcel already on the caller's dashboard.
    pub fn refresh_parcel(
        &self,
        name: impl Into<String>,
        number: impl Into<String>,
        courier: impl Into<String>,
    ) {
        self.spawn_interactive(FetchJob {
            name: name.into(),
            number: number.into(),
            courier: courier.into(),
            is_new: false,
            interactive: true,
            batch: false,
        });
    }

    fn spawn_interactive(&self, job: FetchJob) {
        let state = self.state.clone();
        let api = self.api.clone();
        tokio::spawn(async move {
            worker::process_fetch(&state, api.as_ref(), job).await;
        });
    }

    /// Current store contents, most recently touched first.
    pub async fn parcels(&self) -> Vec<ParcelRecord> {
        self.state.store.lock().await.load()
    }

    pub async fn remove_parcel(&self, number: &str) -> Result<(), TrackerError> {
        let result = { self.state.store.lock().await.remove(number) };
        if result.is_ok() {
            self.state.log(format!("removed {number} from history"));
        }
        result
    }

    pub async fn clear_history(&self) -> Result<(), TrackerError> {
        let result = { self.state.store.lock().await.clear() };
        if result.is_ok() {
            self.state.log("history cleared");
        }
        result
    }

    /// Hot-swap API credentials; calls already in flight keep the snapshot
    /// they started with.
    pub fn replace_credentials(&self, credentials: Credentials) {
        self.state.credentials.replace(credentials);
        self.state.log("credentials updated");
    }

    /// Public tracking page URL for a stored parcel. Opening it is the
    /// caller's job.
    pub async fn tracking_link(&self, number: &str) -> Result<Option<String>, TrackerError> {
        let record = { self.state.store.lock().await.find(number) };
        let Some(record) = record else {
            return Ok(None);
        };

        let carrier_id =
            worker::resolve_carrier(&self.state, self.api.as_ref(), &record.courier).await?;
        let credentials = self.state.credentials.snapshot();
        Ok(Some(format!(
            "https://link.tracker.delivery/track?client_id={}&carrier_id={carrier_id}&tracking_number={}",
            credentials.client_id, record.number
        )))
    }
}
