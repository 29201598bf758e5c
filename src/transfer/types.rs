use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fetch::{FetchSource, ObjectStorageSource};
use crate::storage::RecordKind;

/// Kind of transfer source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Http,
    ObjectStorage,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Http => "http",
            TransferKind::ObjectStorage => "object_storage",
        }
    }

    /// Returns the record kind transfers of this kind are stored under.
    pub fn record_kind(&self) -> RecordKind {
        match self {
            TransferKind::Http => RecordKind::FileTransfer,
            TransferKind::ObjectStorage => RecordKind::S3Transfer,
        }
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer from an HTTP(S) URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferRequest {
    pub infrastructure: String,
    pub src: String,
    pub dst: String,
}

impl FileTransferRequest {
    pub fn new(
        infrastructure: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Self {
        Self {
            infrastructure: infrastructure.into(),
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Transfer from an object in S3-compatible storage.
///
/// The access and secret keys are used for the fetch only and never
/// persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3FileTransferRequest {
    pub infrastructure: String,
    pub endpoint: String,
    pub bucket: String,
    pub object: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub dst: String,
}

impl std::fmt::Debug for S3FileTransferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3FileTransferRequest")
            .field("infrastructure", &self.infrastructure)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("object", &self.object)
            .field("region", &self.region)
            .field("dst", &self.dst)
            .finish_non_exhaustive()
    }
}

/// Any transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRequest {
    Http(FileTransferRequest),
    ObjectStorage(S3FileTransferRequest),
}

impl TransferRequest {
    pub fn kind(&self) -> TransferKind {
        match self {
            TransferRequest::Http(_) => TransferKind::Http,
            TransferRequest::ObjectStorage(_) => TransferKind::ObjectStorage,
        }
    }

    pub fn infrastructure(&self) -> &str {
        match self {
            TransferRequest::Http(request) => &request.infrastructure,
            TransferRequest::ObjectStorage(request) => &request.infrastructure,
        }
    }

    pub fn dst(&self) -> &str {
        match self {
            TransferRequest::Http(request) => &request.dst,
            TransferRequest::ObjectStorage(request) => &request.dst,
        }
    }

    /// Returns the source with its credentials, for the fetch.
    pub fn fetch_source(&self) -> FetchSource {
        match self {
            TransferRequest::Http(request) => FetchSource::http(&request.src),
            TransferRequest::ObjectStorage(request) => {
                FetchSource::ObjectStorage(ObjectStorageSource::new(
                    &request.endpoint,
                    &request.region,
                    &request.bucket,
                    &request.object,
                    &request.access_key,
                    &request.secret_key,
                ))
            }
        }
    }

    /// Returns the source as recorded, without credentials.
    pub fn source(&self) -> TransferSource {
        match self {
            TransferRequest::Http(request) => TransferSource::Http {
                uri: request.src.clone(),
            },
            TransferRequest::ObjectStorage(request) => TransferSource::ObjectStorage {
                endpoint: request.endpoint.clone(),
                bucket: request.bucket.clone(),
                object: request.object.clone(),
                region: request.region.clone(),
            },
        }
    }
}

impl From<FileTransferRequest> for TransferRequest {
    fn from(request: FileTransferRequest) -> Self {
        TransferRequest::Http(request)
    }
}

impl From<S3FileTransferRequest> for TransferRequest {
    fn from(request: S3FileTransferRequest) -> Self {
        TransferRequest::ObjectStorage(request)
    }
}

/// Source descriptor kept in the transfer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferSource {
    Http {
        uri: String,
    },
    ObjectStorage {
        endpoint: String,
        bucket: String,
        object: String,
        region: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTransferStatusCode {
    Transferring,
    Completed,
    Failure,
}

impl FileTransferStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileTransferStatusCode::Transferring => "TRANSFERRING",
            FileTransferStatusCode::Completed => "COMPLETED",
            FileTransferStatusCode::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FileTransferStatusCode::Transferring)
    }
}

impl std::fmt::Display for FileTransferStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transfer as persisted in the record store.
///
/// `reason` is set exactly when `status` is FAILURE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferRecord {
    pub id: String,
    pub kind: TransferKind,
    pub infrastructure: String,
    pub source: TransferSource,
    pub dst: String,
    pub status: FileTransferStatusCode,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileTransferRecord {
    /// Creates a TRANSFERRING record with a fresh id.
    pub fn transferring(request: &TransferRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind: request.kind(),
            infrastructure: request.infrastructure().to_string(),
            source: request.source(),
            dst: request.dst().to_string(),
            status: FileTransferStatusCode::Transferring,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            status: FileTransferStatusCode::Completed,
            reason: None,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn failed(&self, reason: impl Into<String>) -> Self {
        Self {
            status: FileTransferStatusCode::Failure,
            reason: Some(reason.into()),
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
