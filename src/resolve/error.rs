//! Error types for metadata resolution.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a single lookup attempt against the metadata service.
///
/// These never escape the resolver's public `resolve` call; they feed the
/// retry state machine and are then absorbed into an absent result.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Network-level failure (DNS, connect, timeout, dropped connection).
    #[error("network error contacting metadata service: {0}")]
    Network(String),

    /// Non-success HTTP status from the service.
    #[error("metadata service returned HTTP {status}")]
    HttpStatus {
        status: u16,
        /// Parsed Retry-After value, when the service sent one.
        retry_after: Option<Duration>,
    },

    /// Response body did not match the expected shape.
    #[error("malformed metadata response: {0}")]
    MalformedResponse(String),

    /// Resolver construction problem (bad contact identity, client build).
    #[error("invalid resolver configuration: {0}")]
    InvalidConfig(String),
}

impl ResolveError {
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus {
            status,
            retry_after: None,
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
