//! The gateway facade.
//!
//! [`Gateway`] wires the record store, the remote capabilities and the
//! managers together and exposes the operations a request-routing layer
//! needs. Every operation takes and returns plain records.
//!
//! # Example
//!
//! ```rust,ignore
//! use hpc_gateway::{Gateway, GatewayConfig};
//!
//! let gateway = Gateway::from_config(GatewayConfig::from_env()?).await?;
//! let summary = gateway.register_infrastructure(record).await?;
//! let job = gateway.submit_job(JobRequest::new(&summary.name)).await?;
//! gateway.shutdown().await?;
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::fetch::{DefaultFetcher, SourceFetcher};
use crate::infrastructure::{InfrastructureRecord, InfrastructureRegistry, InfrastructureSummary};
use crate::jobs::{JobManager, JobRecord, JobRequest};
use crate::remote::{OpenSshClient, RemoteCopier, RemoteExecutor};
use crate::storage::{RecordStore, RedisBackend};
use crate::supervisor::Supervisor;
use crate::telemetry::{InfrastructureTelemetry, TelemetryAggregator};
use crate::transfer::{FileTransferRecord, TransferKind, TransferManager, TransferRequest};

/// Entry point for all gateway operations.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: InfrastructureRegistry,
    jobs: JobManager,
    transfers: TransferManager,
    telemetry: TelemetryAggregator,
    supervisor: Supervisor,
}

impl Gateway {
    /// Builds a gateway over explicit capabilities.
    pub fn new(
        config: &GatewayConfig,
        store: RecordStore,
        executor: Arc<dyn RemoteExecutor>,
        copier: Arc<dyn RemoteCopier>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        let supervisor = Supervisor::new(config.shutdown_timeout);
        let registry = InfrastructureRegistry::new(store.clone());

        Self {
            jobs: JobManager::new(config, store.clone(), executor.clone(), supervisor.clone()),
            transfers: TransferManager::new(config, store, copier, fetcher, supervisor.clone()),
            telemetry: TelemetryAggregator::new(registry.clone(), executor),
            registry,
            supervisor,
        }
    }

    /// Builds a gateway using OpenSSH, the default fetchers, and Redis when
    /// a URL is configured (memory otherwise).
    pub async fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        let store = match &config.redis_url {
            Some(url) => {
                let backend = RedisBackend::connect(url).await?;
                info!(namespace = %config.namespace, "Using Redis record store");
                RecordStore::new(Arc::new(backend), &config.namespace)
            }
            None => {
                info!(namespace = %config.namespace, "Using in-memory record store");
                RecordStore::in_memory(&config.namespace)
            }
        };

        let ssh = Arc::new(OpenSshClient::from_config(&config));
        let fetcher = Arc::new(DefaultFetcher::from_config(&config));
        Ok(Self::new(&config, store, ssh.clone(), ssh, fetcher))
    }

    pub async fn register_infrastructure(
        &self,
        record: InfrastructureRecord,
    ) -> Result<InfrastructureSummary, GatewayError> {
        self.registry.register(record).await
    }

    pub async fn get_infrastructure(
        &self,
        name: &str,
    ) -> Result<InfrastructureSummary, GatewayError> {
        self.registry.get(name).await
    }

    /// Submits a job; see [`JobManager::submit`].
    pub async fn submit_job(&self, request: JobRequest) -> Result<JobRecord, GatewayError> {
        self.jobs.submit(request).await
    }

    pub async fn get_job(&self, id: &str) -> Result<JobRecord, GatewayError> {
        self.jobs.get(id).await
    }

    /// Stops watching job `id`. Returns false if no watch was running.
    pub fn cancel_job_watch(&self, id: &str) -> bool {
        self.jobs.cancel_watch(id)
    }

    pub async fn get_telemetry(&self, name: &str) -> Result<InfrastructureTelemetry, GatewayError> {
        self.telemetry.get(name).await
    }

    /// Accepts a transfer; see [`TransferManager::transfer`].
    pub async fn submit_transfer(
        &self,
        request: impl Into<TransferRequest>,
    ) -> Result<FileTransferRecord, GatewayError> {
        self.transfers.transfer(request.into()).await
    }

    pub async fn get_transfer(
        &self,
        kind: TransferKind,
        id: &str,
    ) -> Result<FileTransferRecord, GatewayError> {
        self.transfers.get(kind, id).await
    }

    /// Cancels transfer `id`. Returns false if it already finished.
    pub fn cancel_transfer(&self, id: &str) -> bool {
        self.transfers.cancel(id)
    }

    /// Number of watches and transfers still running.
    pub fn active_tasks(&self) -> usize {
        self.supervisor.active_tasks()
    }

    /// Waits for every watch and transfer to finish on its own.
    pub async fn drain(&self) {
        self.supervisor.drain().await
    }

    /// Cancels all background work and waits for it to stop.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        self.supervisor.shutdown().await
    }
}
