//! Error types for the transport client.

/// Why a single page read did not produce a usable body.
///
/// The crawler treats every variant the same way (retry until its
/// threshold); the cause is kept for logging and reporting.
#[derive(thiserror::Error, Debug)]
pub enum FetchFailure {
    /// The server answered with a non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16 },
    /// The read did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection, TLS, or body decoding failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The listing URL could not be built from the base URL and topic.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for FetchFailure {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}
