// Error types shared across the fetcher, the list store and the batch jobs.

use std::path::PathBuf;

use thiserror::Error;

/// Why a retrying fetch gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Retryable status that persisted through every attempt.
    #[error("HTTP {status} persisted after {attempts} attempt(s)")]
    Transient { status: u16, attempts: u32 },

    /// Connection, DNS or timeout failure that persisted through every attempt.
    #[error("network error persisted after {attempts} attempt(s): {message}")]
    Network { message: String, attempts: u32 },

    /// Non-retryable status such as 404.
    #[error("HTTP {status} (non-retryable)")]
    Permanent { status: u16 },

    /// Body could not be decompressed or parsed.
    #[error("malformed response: {0}")]
    Decode(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Permanent { status: 404 })
    }
}

/// Failure of one network attempt, before retry classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// Local persistence errors. A missing file is not one of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is not a JSON array of strings")]
    NotAnArray { path: PathBuf },
}

/// Errors that end a batch job with a failing exit status.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to fetch data for all {worlds} world(s); check API availability")]
    TotalOutage { worlds: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("metrics server failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}
