use std::env;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::TrackerError;
use crate::store::DEFAULT_HISTORY_LIMIT;

/// API credentials plus endpoint, consumed (not owned) by every client call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into().trim().to_string(),
            client_secret: client_secret.into().trim().to_string(),
            endpoint: endpoint.into().trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.endpoint.is_empty()
    }

    pub fn auth_header(&self) -> String {
        format!("TRACKQL-API-KEY {}:{}", self.client_id, self.client_secret)
    }
}

/// Swappable credential holder. Each call takes a snapshot, so the
/// onboarding flow can replace the value without restarting the engine and
/// without racing in-flight requests.
#[derive(Clone, Default)]
pub struct CredentialProvider {
    inner: Arc<RwLock<Credentials>>,
}

impl CredentialProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace(&self, credentials: Credentials) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = credentials;
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub history_file: PathBuf,
    pub history_limit: usize,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub worker_count: usize,
    /// 0 disables the cache: the carrier directory is fetched on every
    /// parcel fetch.
    pub cache_directory_ttl_secs: u64,
    pub job_queue_size: usize,
    pub event_buffer_size: usize,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, TrackerError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            credentials: Credentials::new(
                env::var("CLIENT_ID").unwrap_or_default(),
                env::var("CLIENT_SECRET").unwrap_or_default(),
                env::var("GRAPHQL_URL").unwrap_or_default(),
            ),
            history_file: env::var("HISTORY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_history_file()),
            history_limit: parse_or_default("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            refresh_interval_secs: parse_or_default("REFRESH_INTERVAL_SECS", 1800)?,
            fetch_timeout_secs: parse_or_default("FETCH_TIMEOUT_SECS", 15)?,
            worker_count: parse_or_default("WORKER_COUNT", 4)?,
            cache_directory_ttl_secs: parse_or_default("CACHE_DIRECTORY_TTL_SECS", 0)?,
            job_queue_size: parse_or_default("JOB_QUEUE_SIZE", 64)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 256)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            history_file: default_history_file(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            refresh_interval_secs: 1800,
            fetch_timeout_secs: 15,
            worker_count: 4,
            cache_directory_ttl_secs: 0,
            job_queue_size: 64,
            event_buffer_size: 256,
            log_level: "info".to_string(),
        }
    }
}

fn default_history_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parcel-sync")
        .join("history.json")
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, TrackerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| TrackerError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialProvider, Credentials};

    #[test]
    fn completeness_requires_all_three_fields() {
        assert!(!Credentials::default().is_complete());
        assert!(!Credentials::new("id", "", "https://example.test").is_complete());
        assert!(!Credentials::new("id", "  ", "https://example.test").is_complete());
        assert!(Credentials::new("id", "secret", "https://example.test").is_complete());
    }

    #[test]
    fn auth_header_format() {
        let credentials = Credentials::new("my-id", "my-secret", "https://example.test");
        assert_eq!(credentials.auth_header(), "TRACKQL-API-KEY my-id:my-secret");
    }

    #[test]
    fn replace_swaps_the_snapshot() {
        let provider = CredentialProvider::new(Credentials::new("a", "b", "c"));
        let before = provider.snapshot();
        provider.replace(Credentials::new("x", "y", "z"));
        assert_eq!(before.client_id, "a");
        assert_eq!(provider.snapshot().client_id, "x");
    }
}
