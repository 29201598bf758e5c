//! Background staging and copy of transfers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::{FileTransferRecord, TransferKind, TransferRequest};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::fetch::{FetchSource, SourceFetcher};
use crate::infrastructure::InfrastructureRegistry;
use crate::metrics::{MetricsCollector, TaskKind};
use crate::remote::RemoteCopier;
use crate::storage::RecordStore;
use crate::supervisor::Supervisor;

/// Failure reason recorded for cancelled transfers.
pub const CANCELLED_REASON: &str = "transfer cancelled";

/// Accepts transfers and runs them in the background.
#[derive(Clone)]
pub struct TransferManager {
    store: RecordStore,
    registry: InfrastructureRegistry,
    copier: Arc<dyn RemoteCopier>,
    fetcher: Arc<dyn SourceFetcher>,
    supervisor: Supervisor,
    staging_dir: Option<PathBuf>,
    metrics: MetricsCollector,
}

impl TransferManager {
    pub fn new(
        config: &GatewayConfig,
        store: RecordStore,
        copier: Arc<dyn RemoteCopier>,
        fetcher: Arc<dyn SourceFetcher>,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            registry: InfrastructureRegistry::new(store.clone()),
            store,
            copier,
            fetcher,
            supervisor,
            staging_dir: config.staging_dir.clone(),
            metrics: MetricsCollector::new(),
        }
    }

    /// Persists a TRANSFERRING record and starts the copy in the background.
    ///
    /// Failures after acceptance, including an unknown infrastructure, end
    /// up in the record as FAILURE with a reason.
    pub async fn transfer(
        &self,
        request: TransferRequest,
    ) -> Result<FileTransferRecord, GatewayError> {
        if request.infrastructure().trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "infrastructure cannot be empty".to_string(),
            ));
        }
        if request.dst().trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "dst cannot be empty".to_string(),
            ));
        }

        let record = FileTransferRecord::transferring(&request);
        self.store
            .save_record(record.kind.record_kind(), &record.id, &record)
            .await?;

        info!(
            transfer_id = %record.id,
            kind = %record.kind,
            infrastructure = %record.infrastructure,
            dst = %record.dst,
            "Transfer accepted"
        );

        let runner = self.clone();
        let initial = record.clone();
        let source = request.fetch_source();
        self.supervisor
            .spawn(TaskKind::Transfer, &record.id, move |token| {
                runner.run(initial, source, token)
            });

        Ok(record)
    }

    pub async fn get(
        &self,
        kind: TransferKind,
        id: &str,
    ) -> Result<FileTransferRecord, GatewayError> {
        let record_kind = kind.record_kind();
        self.store
            .get_record(record_kind, id)
            .await
            .map_err(|e| GatewayError::from_store(record_kind.as_str(), id, e))
    }

    /// Cancels transfer `id`; it is finalized as FAILURE.
    pub fn cancel(&self, id: &str) -> bool {
        self.supervisor.cancel(id)
    }

    /// Runs the copy and writes the final record exactly once.
    async fn run(self, record: FileTransferRecord, source: FetchSource, token: CancellationToken) {
        let started = Instant::now();

        let outcome = tokio::select! {
            _ = token.cancelled() => Err(CANCELLED_REASON.to_string()),
            result = self.copy(&record, &source) => result.map_err(|e| e.to_string()),
        };

        let finished = match outcome {
            Ok(()) => {
                info!(transfer_id = %record.id, dst = %record.dst, "Transfer completed");
                record.completed()
            }
            Err(reason) => {
                warn!(transfer_id = %record.id, reason = %reason, "Transfer failed");
                record.failed(reason)
            }
        };

        if let Err(e) = self
            .store
            .save_record(finished.kind.record_kind(), &finished.id, &finished)
            .await
        {
            error!(
                transfer_id = %finished.id,
                error = %e,
                "Failed to persist final transfer record"
            );
        }

        self.metrics.record_transfer(
            finished.kind.as_str(),
            finished.status.as_str(),
            started.elapsed().as_secs_f64(),
        );
    }

    /// Stages the source locally and copies it to the destination host.
    async fn copy(
        &self,
        record: &FileTransferRecord,
        source: &FetchSource,
    ) -> Result<(), GatewayError> {
        let infrastructure = self.registry.resolve(&record.infrastructure).await?;

        // Removed on drop, whichever way this function exits.
        let staging = self.staging_directory()?;
        let local_path = staging.path().join(source.staging_filename());

        let bytes = self.fetcher.fetch(source, &local_path).await?;
        debug!(
            transfer_id = %record.id,
            staged = %local_path.display(),
            bytes,
            "Source staged"
        );

        self.copier
            .put(&infrastructure.remote_target(), &local_path, &record.dst)
            .await?;
        Ok(())
    }

    fn staging_directory(&self) -> Result<TempDir, GatewayError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hpc-gateway-");
        let dir = match &self.staging_dir {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

impl std::fmt::Debug for TransferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferManager")
            .field("store", &self.store)
            .field("staging_dir", &self.staging_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::FetchError;
    use crate::scheduler::SchedulerKind;
    use crate::test_support::{infrastructure, RecordingCopier, StaticFetcher};
    use crate::transfer::{FileTransferRequest, FileTransferStatusCode, S3FileTransferRequest};

    /// Never finishes fetching.
    struct StalledFetcher;

    #[async_trait]
    impl SourceFetcher for StalledFetcher {
        async fn fetch(&self, _source: &FetchSource, _dst: &Path) -> Result<u64, FetchError> {
            std::future::pending().await
        }
    }

    async fn manager(
        staging: &Path,
        copier: Arc<dyn RemoteCopier>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> TransferManager {
        let store = RecordStore::in_memory("test");
        InfrastructureRegistry::new(store.clone())
            .register(infrastructure("hpc1", SchedulerKind::Slurm))
            .await
            .unwrap();
        let config = GatewayConfig::default().with_staging_dir(staging);
        TransferManager::new(
            &config,
            store,
            copier,
            fetcher,
            Supervisor::new(Duration::from_secs(5)),
        )
    }

    fn http_request() -> TransferRequest {
        FileTransferRequest::new("hpc1", "http://host/file.txt", "/tmp/file.txt").into()
    }

    #[tokio::test]
    async fn test_http_transfer_completes() {
        let staging = tempfile::tempdir().unwrap();
        let copier = Arc::new(RecordingCopier::new());
        let manager = manager(
            staging.path(),
            copier.clone(),
            Arc::new(StaticFetcher::serving("payload")),
        )
        .await;

        let record = manager.transfer(http_request()).await.unwrap();
        assert_eq!(record.status, FileTransferStatusCode::Transferring);

        manager.supervisor.drain().await;

        let done = manager.get(TransferKind::Http, &record.id).await.unwrap();
        assert_eq!(done.status, FileTransferStatusCode::Completed);
        assert_eq!(done.reason, None);
        assert_eq!(
            copier.copies(),
            vec![("payload".to_string(), "/tmp/file.txt".to_string())]
        );

        // Staging directory is gone.
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_copy_failure_is_recorded() {
        let staging = tempfile::tempdir().unwrap();
        let manager = manager(
            staging.path(),
            Arc::new(RecordingCopier::failing("permission denied")),
            Arc::new(StaticFetcher::serving("payload")),
        )
        .await;

        let record = manager.transfer(http_request()).await.unwrap();
        manager.supervisor.drain().await;

        let failed = manager.get(TransferKind::Http, &record.id).await.unwrap();
        assert_eq!(failed.status, FileTransferStatusCode::Failure);
        assert!(failed.reason.unwrap().contains("permission denied"));
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded() {
        let staging = tempfile::tempdir().unwrap();
        let copier = Arc::new(RecordingCopier::new());
        let manager = manager(
            staging.path(),
            copier.clone(),
            Arc::new(StaticFetcher::failing("connection refused")),
        )
        .await;

        let record = manager.transfer(http_request()).await.unwrap();
        manager.supervisor.drain().await;

        let failed = manager.get(TransferKind::Http, &record.id).await.unwrap();
        assert_eq!(failed.status, FileTransferStatusCode::Failure);
        assert!(failed.reason.unwrap().contains("connection refused"));
        assert!(copier.copies().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_infrastructure_fails_in_background() {
        let staging = tempfile::tempdir().unwrap();
        let manager = manager(
            staging.path(),
            Arc::new(RecordingCopier::new()),
            Arc::new(StaticFetcher::serving("payload")),
        )
        .await;

        let record = manager
            .transfer(FileTransferRequest::new("nowhere", "http://host/f", "/tmp/f").into())
            .await
            .unwrap();
        manager.supervisor.drain().await;

        let failed = manager.get(TransferKind::Http, &record.id).await.unwrap();
        assert_eq!(failed.status, FileTransferStatusCode::Failure);
        assert!(failed.reason.unwrap().contains("nowhere"));
    }

    #[tokio::test]
    async fn test_cancel_transfer() {
        let staging = tempfile::tempdir().unwrap();
        let manager = manager(
            staging.path(),
            Arc::new(RecordingCopier::new()),
            Arc::new(StalledFetcher),
        )
        .await;

        let record = manager.transfer(http_request()).await.unwrap();
        assert!(manager.cancel(&record.id));
        manager.supervisor.drain().await;

        let failed = manager.get(TransferKind::Http, &record.id).await.unwrap();
        assert_eq!(failed.status, FileTransferStatusCode::Failure);
        assert_eq!(failed.reason.as_deref(), Some(CANCELLED_REASON));
    }

    #[tokio::test]
    async fn test_object_storage_transfer_uses_its_own_kind() {
        let staging = tempfile::tempdir().unwrap();
        let copier = Arc::new(RecordingCopier::new());
        let manager = manager(
            staging.path(),
            copier.clone(),
            Arc::new(StaticFetcher::serving("object bytes")),
        )
        .await;

        let request = S3FileTransferRequest {
            infrastructure: "hpc1".to_string(),
            endpoint: "http://minio:9000".to_string(),
            bucket: "datasets".to_string(),
            object: "runs/output.nc".to_string(),
            region: "us-east-1".to_string(),
            access_key: "AKIA".to_string(),
            secret_key: "s3cr3t".to_string(),
            dst: "/scratch/output.nc".to_string(),
        };
        let record = manager.transfer(request.into()).await.unwrap();
        manager.supervisor.drain().await;

        let done = manager
            .get(TransferKind::ObjectStorage, &record.id)
            .await
            .unwrap();
        assert_eq!(done.status, FileTransferStatusCode::Completed);
        assert!(manager
            .get(TransferKind::Http, &record.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(copier.copies()[0].1, "/scratch/output.nc");
    }

    #[tokio::test]
    async fn test_empty_destination_is_rejected() {
        let staging = tempfile::tempdir().unwrap();
        let manager = manager(
            staging.path(),
            Arc::new(RecordingCopier::new()),
            Arc::new(StaticFetcher::serving("")),
        )
        .await;

        let err = manager
            .transfer(FileTransferRequest::new("hpc1", "http://host/f", " ").into())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }
}
