//! Stateless client for the remote tracking API.
//!
//! Holds no mutable state across calls besides its configured endpoint and
//! the swappable credential provider; every request takes a fresh
//! credential snapshot so the onboarding flow can hot-swap keys mid-session.

pub mod wire;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::{CredentialProvider, Credentials};
use crate::error::TrackerError;
use crate::models::event::FetchResult;
use self::wire::{CARRIER_LIST_QUERY, CarrierListData, GraphQlResponse, TRACK_QUERY, TrackData};

/// Remote API surface the engine depends on. Implemented by
/// [`TrackingClient`] and by scripted stubs in tests.
#[async_trait]
pub trait TrackingApi: Send + Sync + 'static {
    /// Full carrier directory as a label-to-ID mapping. Pages are merged
    /// before returning; callers never see a partial directory.
    async fn list_carriers(&self) -> Result<BTreeMap<String, String>, TrackerError>;

    /// Current tracking state for one parcel.
    async fn fetch_tracking(
        &self,
        carrier_id: &str,
        tracking_number: &str,
    ) -> Result<FetchResult, TrackerError>;
}

pub struct TrackingClient {
    http: reqwest::Client,
    credentials: CredentialProvider,
    timeout: Duration,
}

impl TrackingClient {
    pub fn new(credentials: CredentialProvider, fetch_timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            timeout: Duration::from_secs(fetch_timeout_secs),
        }
    }

    /// Validate candidate credentials by listing the directory through an
    /// isolated one-shot client. The live provider is never touched, so a
    /// test probe cannot race real fetches.
    pub async fn verify_credentials(
        candidate: Credentials,
        fetch_timeout_secs: u64,
    ) -> Result<(), TrackerError> {
        let probe = TrackingClient::new(CredentialProvider::new(candidate), fetch_timeout_secs);
        probe.list_carriers().await.map(|_| ())
    }

    /// POST one GraphQL query. `Ok(None)` means the response had no usable
    /// `data` field; each operation maps that to its own error.
    async fn post_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<Option<T>, TrackerError> {
        let credentials = self.credentials.snapshot();
        let response = self
            .http
            .post(&credentials.endpoint)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, credentials.auth_header())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(TrackerError::from_reqwest)?
            .error_for_status()
            .map_err(TrackerError::from_reqwest)?;

        let body: GraphQlResponse<T> = response.json().await.map_err(TrackerError::from_reqwest)?;
        Ok(body.data)
    }
}

#[async_trait]
impl TrackingApi for TrackingClient {
    async fn list_carriers(&self) -> Result<BTreeMap<String, String>, TrackerError> {
        let mut carriers = BTreeMap::new();
        let mut after: Option<String> = None;

        loop {
            let data: Option<CarrierListData> = self
                .post_query(CARRIER_LIST_QUERY, json!({ "after": after }))
                .await
                .map_err(|err| match err {
                    TrackerError::Timeout => TrackerError::Timeout,
                    other => TrackerError::Directory(other.to_string()),
                })?;
            let page = data
                .ok_or_else(|| TrackerError::Directory("response missing 'data'".to_string()))?;

            after = wire::merge_carrier_page(page, &mut carriers);
            if after.is_none() {
                break;
            }
        }

        debug!(count = carriers.len(), "carrier directory fetched");
        Ok(carriers)
    }

    async fn fetch_tracking(
        &self,
        carrier_id: &str,
        tracking_number: &str,
    ) -> Result<FetchResult, TrackerError> {
        let data: Option<TrackData> = self
            .post_query(
                TRACK_QUERY,
                json!({ "carrierId": carrier_id, "trackingNumber": tracking_number }),
            )
            .await?;

        let info = data
            .and_then(|track| track.track)
            .ok_or(TrackerError::NoData)?;
        Ok(wire::into_fetch_result(info))
    }
}
