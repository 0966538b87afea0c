use std::time::Duration;

use thiserror::Error;

/// Failures that escape [`crate::FaceMatcher::match_faces`].
///
/// Service and network failures never show up here: they are folded into a
/// terminal [`crate::MatchResult`]. Only caller-side conditions do.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("match cancelled by caller")]
    Cancelled,

    #[error("match deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32 },

    #[error("threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("failed to encode match request: {0}")]
    Encode(String),
}

/// Failure of a single HTTP exchange, before any status code was seen.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Reason tag used once retries for this failure class are exhausted.
    pub fn reason_tag(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "request_timeout",
            TransportError::Connect(_) => "connection_error",
            TransportError::Other(_) => "transport_error",
        }
    }
}
