//! Supervision of background watch and transfer tasks.
//!
//! Every detached unit of work runs on one [`TaskTracker`] under a child of
//! the supervisor's root [`CancellationToken`]. A chain can be cancelled by
//! its record id; shutdown cancels everything and waits, bounded by a
//! timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::error::GatewayError;
use crate::metrics::{MetricsCollector, TaskKind};

type ChainMap = HashMap<String, CancellationToken>;

/// Tracks and cancels the gateway's background tasks.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tracker: TaskTracker,
    root: CancellationToken,
    chains: Arc<Mutex<ChainMap>>,
    shutdown_timeout: Duration,
    metrics: MetricsCollector,
}

impl Supervisor {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
            chains: Arc::new(Mutex::new(HashMap::new())),
            shutdown_timeout,
            metrics: MetricsCollector::new(),
        }
    }

    fn chains(&self) -> MutexGuard<'_, ChainMap> {
        lock_chains(&self.chains)
    }

    /// Spawns `task` as the chain for record `id`.
    ///
    /// The task receives its cancellation token and is expected to return
    /// promptly once it is cancelled.
    pub fn spawn<F, Fut>(&self, kind: TaskKind, id: &str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        self.chains().insert(id.to_string(), token.clone());

        let chains = Arc::clone(&self.chains);
        let metrics = self.metrics.clone();
        let id = id.to_string();
        let future = task(token);

        metrics.task_started(kind);
        debug!(id = %id, kind = kind.as_str(), "Spawning background task");

        self.tracker.spawn(async move {
            future.await;
            lock_chains(&chains).remove(&id);
            metrics.task_finished(kind);
            debug!(id = %id, kind = kind.as_str(), "Background task finished");
        });
    }

    /// Cancels the chain for record `id`.
    ///
    /// Returns false when no such chain is running.
    pub fn cancel(&self, id: &str) -> bool {
        match self.chains().get(id) {
            Some(token) => {
                token.cancel();
                info!(id = %id, "Cancelled background task");
                true
            }
            None => false,
        }
    }

    /// Returns true while the chain for record `id` is running.
    pub fn is_running(&self, id: &str) -> bool {
        self.chains().contains_key(id)
    }

    /// Number of background tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every background task has finished on its own.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancels every chain and waits for the tasks to finish.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ShutdownTimeout` if tasks are still running
    /// after the shutdown timeout.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        info!(active = self.tracker.len(), "Initiating background task shutdown");

        self.root.cancel();
        self.tracker.close();

        match tokio::time::timeout(self.shutdown_timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("Background task shutdown complete");
                Ok(())
            }
            Err(_) => {
                error!(
                    timeout = ?self.shutdown_timeout,
                    remaining = self.tracker.len(),
                    "Background task shutdown timed out"
                );
                Err(GatewayError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

fn lock_chains(chains: &Mutex<ChainMap>) -> MutexGuard<'_, ChainMap> {
    chains.lock().unwrap_or_else(|e| e.into_inner())
}
