//! Synthetic hierarchical record keys.

use serde::{Deserialize, Serialize};

/// Kind segment of a record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Registered infrastructure (cluster).
    Cluster,
    /// Submitted job.
    Job,
    /// HTTP-sourced file transfer.
    FileTransfer,
    /// Object-storage-sourced file transfer.
    S3Transfer,
}

impl RecordKind {
    /// Returns the key segment for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Cluster => "cluster",
            RecordKind::Job => "job",
            RecordKind::FileTransfer => "file_transfer",
            RecordKind::S3Transfer => "s3_transfer",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds `{namespace}/{kind}/{id}`.
pub fn record_key(namespace: &str, kind: RecordKind, id: &str) -> String {
    format!("{}/{}/{}", namespace.trim_end_matches('/'), kind, id)
}
