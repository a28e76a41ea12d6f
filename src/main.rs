use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use parcel_sync::client::TrackingClient;
use parcel_sync::config::{Config, CredentialProvider};
use parcel_sync::engine::SyncEngine;
use parcel_sync::error::TrackerError;
use parcel_sync::events::EngineEvent;
use parcel_sync::store::HistoryStore;

#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    if !config.credentials.is_complete() {
        tracing::error!(
            "CLIENT_ID, CLIENT_SECRET and GRAPHQL_URL must be set; \
             get API credentials from tracker.delivery"
        );
        return Err(TrackerError::CredentialsMissing);
    }

    let credentials = CredentialProvider::new(config.credentials.clone());
    let store = HistoryStore::new(config.history_file.clone(), config.history_limit);
    let api = Arc::new(TrackingClient::new(
        credentials.clone(),
        config.fetch_timeout_secs,
    ));

    let engine = SyncEngine::new(config, credentials, store, api);
    let mut events = engine.subscribe();
    engine.start()?;

    // Headless renderer: surface engine events as log lines. A UI shell
    // would subscribe the same way and draw instead.
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::Log(message)) => tracing::info!("{message}"),
                Ok(EngineEvent::FetchSucceeded { record, .. }) => {
                    tracing::info!(
                        parcel = %record.number,
                        status = %record.last_status,
                        days_in_transit = %record.days_in_transit_label(),
                        "parcel updated"
                    );
                }
                Ok(EngineEvent::FetchFailed { number, error, .. }) => {
                    tracing::warn!(parcel = %number, error = %error, "parcel fetch failed");
                }
                Ok(EngineEvent::Notify { title, body }) => {
                    tracing::info!(%title, %body, "notification requested");
                }
                Ok(EngineEvent::BatchCompleted) => tracing::info!("batch refresh complete"),
                Ok(EngineEvent::CredentialsInvalid) => tracing::warn!("credentials rejected"),
                Ok(EngineEvent::CountdownTick { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    shutdown_signal().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
