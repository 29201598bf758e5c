use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::FetchError;

/// Streams HTTP(S) response bodies to local files.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    chunk_size: usize,
}

impl HttpFetcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Downloads `uri` into `destination`, returning the number of bytes written.
    pub async fn fetch(&self, uri: &str, destination: &Path) -> Result<u64, FetchError> {
        let url = Url::parse(uri).map_err(|e| FetchError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let http_error = |e: reqwest::Error| FetchError::Http {
            uri: uri.to_string(),
            reason: e.to_string(),
        };

        let mut response = self.client.get(url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let file = File::create(destination).await?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!(uri = %uri, bytes = written, "HTTP fetch complete");
        Ok(written)
    }
}
