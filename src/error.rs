//! Error types for hpc-gateway operations.
//!
//! Each subsystem has its own error enum:
//! - Record store access
//! - Scheduler command output parsing
//! - Remote command execution and file copy
//! - Source fetching (HTTP and object storage)
//!
//! [`GatewayError`] aggregates them for the public operations exposed by
//! [`crate::gateway::Gateway`].

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while reading or writing persisted records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record '{0}' not found")]
    NotFound(String),

    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the scheduler adapters.
///
/// None of these are retried: they indicate misconfiguration or drift in
/// the scheduler's output format.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Unsupported scheduler: {0}")]
    UnsupportedScheduler(String),

    #[error("{scheduler} status is undefined or not supported: '{status}'")]
    UnrecognizedStatus { scheduler: String, status: String },

    #[error("{scheduler} submission output has no job id: '{output}'")]
    MalformedSubmissionOutput { scheduler: String, output: String },

    #[error("Malformed {listing} line '{line}': {reason}")]
    MalformedListing {
        listing: &'static str,
        line: String,
        reason: String,
    },
}

/// Errors from the remote execution and remote copy channels.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote execution on {host} failed: {reason}")]
    ExecutionFailed { host: String, reason: String },

    #[error("Copy of '{local}' to {host}:{remote} failed: {reason}")]
    CopyFailed {
        host: String,
        local: String,
        remote: String,
        reason: String,
    },
}

/// Errors that can occur while fetching a transfer source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid source URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("HTTP request to '{uri}' failed: {reason}")]
    Http { uri: String, reason: String },

    #[error("HTTP {status} while fetching '{uri}'")]
    Status { uri: String, status: u16 },

    #[error("Object storage retrieval of '{bucket}/{object}' failed: {reason}")]
    ObjectStorage {
        bucket: String,
        object: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the public gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Staging directory error: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

impl GatewayError {
    /// Returns true when the error is an unknown record id or name.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    /// Returns true for errors a caller must not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::Scheduler(
                SchedulerError::UnsupportedScheduler(_) | SchedulerError::UnrecognizedStatus { .. }
            )
        )
    }

    /// Maps a store lookup failure onto a typed not-found outcome.
    pub(crate) fn from_store(kind: &'static str, id: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => GatewayError::NotFound {
                kind,
                id: id.to_string(),
            },
            other => GatewayError::Store(other),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        GatewayError::Store(err)
    }
}
