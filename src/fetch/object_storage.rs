//! S3-compatible object retrieval.

use std::path::Path;

use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::FetchError;

/// Location and credentials of one object in S3-compatible storage.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStorageSource {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub object: String,
    pub access_key: String,
    pub secret_key: String,
}

impl ObjectStorageSource {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
        object: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
            object: object.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn error(&self, reason: impl ToString) -> FetchError {
        FetchError::ObjectStorage {
            bucket: self.bucket.clone(),
            object: self.object.clone(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for ObjectStorageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageSource")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("object", &self.object)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Streams objects from S3-compatible endpoints to local files.
#[derive(Debug, Clone)]
pub struct ObjectStorageFetcher {
    chunk_size: usize,
}

impl ObjectStorageFetcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Builds a client for the source's endpoint and bucket.
    ///
    /// Path-style requests are used so that self-hosted endpoints work
    /// without bucket DNS entries.
    pub fn build_store(source: &ObjectStorageSource) -> Result<AmazonS3, FetchError> {
        if source.bucket.trim().is_empty() {
            return Err(source.error("bucket cannot be empty"));
        }
        if source.object.trim().is_empty() {
            return Err(source.error("object key cannot be empty"));
        }

        let mut builder = AmazonS3Builder::new()
            .with_region(&source.region)
            .with_bucket_name(&source.bucket)
            .with_access_key_id(&source.access_key)
            .with_secret_access_key(&source.secret_key)
            .with_virtual_hosted_style_request(false);

        if !source.endpoint.trim().is_empty() {
            builder = builder
                .with_endpoint(source.endpoint.trim_end_matches('/'))
                .with_allow_http(source.endpoint.starts_with("http://"));
        }

        builder.build().map_err(|e| source.error(e))
    }

    /// Downloads the object into `destination`, returning the number of bytes written.
    pub async fn fetch(
        &self,
        source: &ObjectStorageSource,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let store = Self::build_store(source)?;
        let location = ObjectPath::from(source.object.trim_start_matches('/'));

        let result = store.get(&location).await.map_err(|e| source.error(e))?;
        let mut stream = result.into_stream();

        let file = File::create(destination).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| source.error(e))?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!(
            bucket = %source.bucket,
            object = %source.object,
            bytes = written,
            "Object storage fetch complete"
        );
        Ok(written)
    }
}
