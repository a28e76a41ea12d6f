use thiserror::Error;

/// Failure taxonomy for the synchronization engine. Every variant is `Clone`
/// so errors can ride inside broadcast events to the presentation layer.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("carrier directory request failed: {0}")]
    Directory(String),

    #[error("carrier '{0}' not found in directory")]
    CarrierNotFound(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("no tracking information found for this number")]
    NoData,

    #[error("history store error: {0}")]
    Persistence(String),

    #[error("CLIENT_ID, CLIENT_SECRET and GRAPHQL_URL are required")]
    CredentialsMissing,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TrackerError::Timeout
        } else {
            TrackerError::Network(err.to_string())
        }
    }
}
