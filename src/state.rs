use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast, mpsc};

use crate::config::{Config, CredentialProvider};
use crate::engine::FetchJob;
use crate::events::EngineEvent;
use crate::store::HistoryStore;

/// Snapshot of the carrier directory, kept only while the TTL cache option
/// is enabled. Keyed by endpoint so a hot-swapped endpoint never serves a
/// stale directory.
pub struct CachedDirectory {
    pub carriers: BTreeMap<String, String>,
    pub fetched_at: Instant,
}

/// State shared between the engine facade, the scheduler, and the fetch
/// workers. The history store is the only shared mutable resource; its
/// mutex enforces the single-writer discipline.
pub struct EngineState {
    pub config: Config,
    pub credentials: CredentialProvider,
    pub store: Mutex<HistoryStore>,
    pub events_tx: broadcast::Sender<EngineEvent>,
    pub job_tx: mpsc::Sender<FetchJob>,
    pub pending: AtomicUsize,
    pub countdown: AtomicI64,
    pub directory_cache: DashMap<String, CachedDirectory>,
}

impl EngineState {
    pub fn new(
        config: Config,
        credentials: CredentialProvider,
        store: HistoryStore,
    ) -> (Self, mpsc::Receiver<FetchJob>) {
        let (job_tx, job_rx) = mpsc::channel(config.job_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let countdown = AtomicI64::new(config.refresh_interval_secs as i64);

        (
            Self {
                config,
                credentials,
                store: Mutex::new(store),
                events_tx,
                job_tx,
                pending: AtomicUsize::new(0),
                countdown,
                directory_cache: DashMap::new(),
            },
            job_rx,
        )
    }

    /// Broadcast one event; a send with no subscribers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(EngineEvent::Log(message.into()));
    }

    pub fn reset_countdown(&self) {
        self.countdown
            .store(self.config.refresh_interval_secs as i64, Ordering::SeqCst);
    }
}
