//! Source fetching for file transfers.
//!
//! A transfer first pulls its source into a local staging file, then copies
//! that file to the cluster. This module covers the first hop:
//!
//! - **HttpFetcher**: streams an HTTP(S) body to disk
//! - **ObjectStorageFetcher**: streams an S3-compatible object to disk
//! - **DefaultFetcher**: dispatches on [`FetchSource`]
//!
//! # Example
//!
//! ```rust,ignore
//! use hpc_gateway::fetch::{DefaultFetcher, FetchSource, SourceFetcher};
//!
//! let fetcher = DefaultFetcher::new(8192);
//! let source = FetchSource::http("http://host/file.txt");
//! let bytes = fetcher.fetch(&source, &staging_dir.join(source.staging_filename())).await?;
//! ```

pub mod http;
pub mod object_storage;

use std::path::Path;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::error::FetchError;

pub use http::HttpFetcher;
pub use object_storage::{ObjectStorageFetcher, ObjectStorageSource};

/// Fallback staging filename when the source names no file.
pub const DEFAULT_STAGING_FILENAME: &str = "download";

/// Where a transfer's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    Http { uri: String },
    ObjectStorage(ObjectStorageSource),
}

impl FetchSource {
    pub fn http(uri: impl Into<String>) -> Self {
        FetchSource::Http { uri: uri.into() }
    }

    /// Returns the name of the staging file this source is fetched into.
    ///
    /// This is the percent-decoded basename of the URI path, or of the object
    /// key, falling back to [`DEFAULT_STAGING_FILENAME`].
    pub fn staging_filename(&self) -> String {
        match self {
            FetchSource::Http { uri } => {
                let path = reqwest::Url::parse(uri)
                    .map(|url| url.path().to_string())
                    .unwrap_or_else(|_| uri.split(['?', '#']).next().unwrap_or_default().to_string());
                staging_filename(&path)
            }
            FetchSource::ObjectStorage(source) => staging_filename(&source.object),
        }
    }
}

/// Returns the decoded final segment of `path`, suitable as a local filename.
pub fn staging_filename(path: &str) -> String {
    let basename = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(basename)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| basename.to_string());
    // A decoded %2F must not escape the staging directory.
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or_default();

    match name {
        "" | "." | ".." => DEFAULT_STAGING_FILENAME.to_string(),
        name => name.to_string(),
    }
}

/// Fetches a transfer source into a local file.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Writes the whole source to `destination` and returns the byte count.
    async fn fetch(&self, source: &FetchSource, destination: &Path) -> Result<u64, FetchError>;
}

/// Fetcher handling every [`FetchSource`] kind.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    http: HttpFetcher,
    object_storage: ObjectStorageFetcher,
}

impl DefaultFetcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            http: HttpFetcher::new(chunk_size),
            object_storage: ObjectStorageFetcher::new(chunk_size),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.chunk_size)
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(&self, source: &FetchSource, destination: &Path) -> Result<u64, FetchError> {
        match source {
            FetchSource::Http { uri } => self.http.fetch(uri, destination).await,
            FetchSource::ObjectStorage(source) => {
                self.object_storage.fetch(source, destination).await
            }
        }
    }
}
