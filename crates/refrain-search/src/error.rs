//! Error types for retrieval and search orchestration.

use std::time::Duration;

use refrain_core::EntityType;
use thiserror::Error;

/// A failure talking to the sparse-vector index service.
///
/// Retrievers return these unchanged; the fan-out executor is the only
/// place they are absorbed.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The index service answered with a non-success status.
    #[error("index service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The index service asked us to slow down.
    #[error("rate limited by index service")]
    RateLimited,

    /// A retrieval did not complete within its time budget.
    #[error("{entity_type} retrieval timed out after {after:?}")]
    Timeout {
        entity_type: EntityType,
        after: Duration,
    },

    /// The response body could not be understood.
    #[error("malformed index response: {message}")]
    Parse { message: String },

    /// A matched point lacks a payload field its schema requires.
    #[error("index record is missing required field `{field}`")]
    MissingField { field: &'static str },

    /// An error propagated from `reqwest` (connection, timeout, body).
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl RetrievalError {
    /// Returns `true` when the error is transient and the request may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::RateLimited | Self::Timeout { .. } => true,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Parse { .. } | Self::MissingField { .. } => false,
        }
    }
}

/// Convenience alias for retrieval results.
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

/// Errors surfaced by the search entry point.
///
/// Backend failures never appear here; only requests that are invalid
/// before any I/O, and startup failures.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request was rejected before dispatch.
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// Vocabulary or encoder setup failed.
    #[error(transparent)]
    Core(#[from] refrain_core::Error),

    /// The index service client could not be built.
    #[error("failed to create index client: {0}")]
    Client(#[source] reqwest::Error),
}
