//! File transfer management.
//!
//! A transfer stages its source (an HTTP URI or an object in S3-compatible
//! storage) into a local temporary directory, then copies the staged file
//! to the target infrastructure. Each transfer is accepted immediately as
//! TRANSFERRING and finalized exactly once by its background task.
//!
//! # Example
//!
//! ```rust,ignore
//! use hpc_gateway::transfer::FileTransferRequest;
//!
//! let record = gateway
//!     .submit_transfer(FileTransferRequest::new("hpc1", "http://host/file.txt", "/tmp/file.txt"))
//!     .await?;
//! let record = gateway.get_transfer(record.kind, &record.id).await?;
//! ```

pub mod manager;
pub mod types;

pub use manager::TransferManager;
pub use types::{
    FileTransferRecord, FileTransferRequest, FileTransferStatusCode, S3FileTransferRequest,
    TransferKind, TransferRequest, TransferSource,
};
