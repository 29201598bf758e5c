//! Job submission and the watch loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::{JobRecord, JobRequest};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::infrastructure::InfrastructureRegistry;
use crate::metrics::{MetricsCollector, PollOutcome, TaskKind};
use crate::remote::RemoteExecutor;
use crate::scheduler::SchedulerAdapter;
use crate::storage::{RecordKind, RecordStore};
use crate::supervisor::Supervisor;

/// Submits jobs and tracks them to completion.
#[derive(Clone)]
pub struct JobManager {
    store: RecordStore,
    registry: InfrastructureRegistry,
    executor: Arc<dyn RemoteExecutor>,
    supervisor: Supervisor,
    default_watch_period: Duration,
    job_workdir: String,
    job_script: String,
    metrics: MetricsCollector,
}

impl JobManager {
    pub fn new(
        config: &GatewayConfig,
        store: RecordStore,
        executor: Arc<dyn RemoteExecutor>,
        supervisor: Supervisor,
    ) -> Self {
        Self {
            registry: InfrastructureRegistry::new(store.clone()),
            store,
            executor,
            supervisor,
            default_watch_period: config.default_watch_period,
            job_workdir: config.job_workdir.clone(),
            job_script: config.job_script.clone(),
            metrics: MetricsCollector::new(),
        }
    }

    /// Returns the command that submits the canned job.
    pub fn submission_command(&self, adapter: &SchedulerAdapter) -> String {
        let submit = format!("{} {}", adapter.submit_command(), self.job_script);
        if self.job_workdir.trim().is_empty() {
            submit
        } else {
            format!("cd {} && {}", self.job_workdir, submit)
        }
    }

    /// Submits a job and starts its watch chain.
    ///
    /// Returns as soon as the scheduler has assigned an id; the record
    /// starts out QUEUED.
    ///
    /// # Errors
    ///
    /// - `GatewayError::NotFound` if the infrastructure is not registered
    /// - `GatewayError::Remote` if the submit command cannot be run
    /// - `GatewayError::Scheduler` if the output carries no job id
    pub async fn submit(&self, request: JobRequest) -> Result<JobRecord, GatewayError> {
        let period = match request.watch_period_secs {
            Some(0) => {
                return Err(GatewayError::InvalidRequest(
                    "watch_period_secs must be greater than 0".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => self.default_watch_period,
        };

        let infrastructure = self.registry.resolve(&request.infrastructure).await?;
        let adapter = infrastructure.adapter();
        let command = self.submission_command(&adapter);

        let output = self
            .executor
            .exec(&infrastructure.remote_target(), &command)
            .await?;
        let scheduler_id = adapter.parse_submitted_id(&output.stdout)?;

        let record = JobRecord::queued(scheduler_id, &infrastructure.name, period.as_secs());
        self.store
            .save_record(RecordKind::Job, &record.id, &record)
            .await?;

        self.metrics
            .record_job_submitted(infrastructure.scheduler.as_str());
        info!(
            job_id = %record.id,
            scheduler_id = %record.scheduler_id,
            infrastructure = %record.infrastructure,
            "Job submitted"
        );

        let watcher = self.clone();
        let initial = record.clone();
        self.supervisor.spawn(TaskKind::Watch, &record.id, move |token| {
            watcher.watch(initial, period, token)
        });

        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<JobRecord, GatewayError> {
        self.store
            .get_record(RecordKind::Job, id)
            .await
            .map_err(|e| GatewayError::from_store("job", id, e))
    }

    /// Stops polling job `id`; its record is left as it is.
    pub fn cancel_watch(&self, id: &str) -> bool {
        self.supervisor.cancel(id)
    }

    /// Polls the scheduler every `period` until the job is terminal, the
    /// chain is cancelled, or a poll fails.
    async fn watch(self, mut record: JobRecord, period: Duration, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!(job_id = %record.id, "Job watch cancelled");
                    return;
                }
                _ = tokio::time::sleep(period) => {}
            }

            match self.poll(&record).await {
                Ok(Some(updated)) => {
                    let terminal = updated.status.is_terminal();
                    record = updated;
                    if terminal {
                        self.metrics.record_poll(PollOutcome::Terminal);
                        info!(job_id = %record.id, status = %record.status, "Job finished");
                        return;
                    }
                    self.metrics.record_poll(PollOutcome::Changed);
                }
                Ok(None) => self.metrics.record_poll(PollOutcome::Unchanged),
                Err(e) => {
                    // Fail-stop: the record keeps its last persisted status.
                    self.metrics.record_poll(PollOutcome::Error);
                    error!(
                        job_id = %record.id,
                        scheduler_id = %record.scheduler_id,
                        error = %e,
                        "Job watch stopped"
                    );
                    return;
                }
            }
        }
    }

    /// Runs one status query; returns the persisted record if the status
    /// moved forward. A status that would move the job backwards (a requeued
    /// Slurm job reports PENDING again) is logged and ignored.
    async fn poll(&self, record: &JobRecord) -> Result<Option<JobRecord>, GatewayError> {
        let infrastructure = self.registry.resolve(&record.infrastructure).await?;
        let adapter = infrastructure.adapter();

        let output = self
            .executor
            .exec(
                &infrastructure.remote_target(),
                &adapter.status_query_command(&record.scheduler_id),
            )
            .await?;
        let status = adapter.parse_status(&output.stdout)?;

        debug!(job_id = %record.id, status = %status, "Polled job status");

        if status == record.status {
            return Ok(None);
        }
        if !record.status.advances_to(status) {
            warn!(
                job_id = %record.id,
                current = %record.status,
                reported = %status,
                "Ignoring status that would move the job backwards"
            );
            return Ok(None);
        }

        let updated = record.with_status(status);
        self.store
            .save_record(RecordKind::Job, &updated.id, &updated)
            .await?;
        info!(
            job_id = %updated.id,
            from = %record.status,
            to = %updated.status,
            "Job status changed"
        );
        Ok(Some(updated))
    }
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("store", &self.store)
            .field("default_watch_period", &self.default_watch_period)
            .field("job_workdir", &self.job_workdir)
            .field("job_script", &self.job_script)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{JobStatusCode, SchedulerKind};
    use crate::test_support::{infrastructure, ScriptedExecutor};

    async fn manager_with(executor: Arc<ScriptedExecutor>) -> JobManager {
        let store = RecordStore::in_memory("test");
        InfrastructureRegistry::new(store.clone())
            .register(infrastructure("hpc1", SchedulerKind::Slurm))
            .await
            .unwrap();
        JobManager::new(
            &GatewayConfig::default(),
            store,
            executor,
            Supervisor::new(Duration::from_secs(5)),
        )
    }

    #[test]
    fn test_submission_command() {
        let manager = JobManager::new(
            &GatewayConfig::default(),
            RecordStore::in_memory("test"),
            Arc::new(ScriptedExecutor::new()),
            Supervisor::new(Duration::from_secs(5)),
        );
        assert_eq!(
            manager.submission_command(&SchedulerAdapter::new(SchedulerKind::Slurm)),
            "cd test/ && sbatch test-job-openmpi-example.sh"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_then_watch_to_completion() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("sbatch", &["Submitted batch job 1763"])
                .on(
                    "scontrol",
                    &["JobState=PENDING", "JobState=RUNNING", "JobState=COMPLETED"],
                ),
        );
        let manager = manager_with(executor.clone()).await;

        let job = manager
            .submit(JobRequest::new("hpc1").with_watch_period_secs(5))
            .await
            .unwrap();
        assert_eq!(job.scheduler_id, "1763");
        assert_eq!(job.status, JobStatusCode::Queued);
        assert_eq!(manager.get(&job.id).await.unwrap().status, JobStatusCode::Queued);

        manager.supervisor.drain().await;

        let done = manager.get(&job.id).await.unwrap();
        assert_eq!(done.status, JobStatusCode::Completed);
        assert_eq!(done.created_at, job.created_at);

        let polls = executor
            .calls()
            .iter()
            .filter(|c| c.contains("scontrol show job -dd 1763"))
            .count();
        assert_eq!(polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_error_leaves_record_untouched() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("sbatch", &["Submitted batch job 42"])
                .on("scontrol", &["JobState=BOOT_FAIL"]),
        );
        let manager = manager_with(executor).await;

        let job = manager.submit(JobRequest::new("hpc1")).await.unwrap();
        manager.supervisor.drain().await;

        assert_eq!(manager.get(&job.id).await.unwrap(), job);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeued_job_keeps_running_status() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("sbatch", &["Submitted batch job 88"])
                .on(
                    "scontrol",
                    &["JobState=RUNNING", "JobState=PENDING", "JobState=COMPLETED"],
                ),
        );
        let manager = manager_with(executor.clone()).await;

        let job = manager
            .submit(JobRequest::new("hpc1").with_watch_period_secs(5))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(12)).await;
        let after_requeue = manager.get(&job.id).await.unwrap();
        assert_eq!(after_requeue.status, JobStatusCode::Running);

        manager.supervisor.drain().await;
        assert_eq!(manager.get(&job.id).await.unwrap().status, JobStatusCode::Completed);
        let polls = executor
            .calls()
            .iter()
            .filter(|c| c.contains("scontrol"))
            .count();
        assert_eq!(polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_stops_watch() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("sbatch", &["Submitted batch job 51"])
                .fail_on("scontrol", "Connection reset by peer"),
        );
        let manager = manager_with(executor.clone()).await;

        let job = manager.submit(JobRequest::new("hpc1")).await.unwrap();
        manager.supervisor.drain().await;

        assert_eq!(manager.get(&job.id).await.unwrap(), job);
        assert!(!manager.cancel_watch(&job.id));
        let polls = executor
            .calls()
            .iter()
            .filter(|c| c.contains("scontrol"))
            .count();
        assert_eq!(polls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_watch() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("sbatch", &["Submitted batch job 7"])
                .on("scontrol", &["JobState=RUNNING"]),
        );
        let manager = manager_with(executor).await;

        let job = manager.submit(JobRequest::new("hpc1")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(manager.cancel_watch(&job.id));
        manager.supervisor.drain().await;

        assert_eq!(manager.get(&job.id).await.unwrap().status, JobStatusCode::Running);
        assert!(!manager.cancel_watch(&job.id));
    }

    #[tokio::test]
    async fn test_unknown_infrastructure_fails_before_exec() {
        let executor = Arc::new(ScriptedExecutor::new());
        let manager = manager_with(executor.clone()).await;

        let err = manager.submit(JobRequest::new("missing")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_submission_output() {
        let executor = Arc::new(ScriptedExecutor::new().on("sbatch", &["sbatch: error: invalid"]));
        let manager = manager_with(executor).await;

        let err = manager.submit(JobRequest::new("hpc1")).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Scheduler(crate::error::SchedulerError::MalformedSubmissionOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_watch_period_is_rejected() {
        let manager = manager_with(Arc::new(ScriptedExecutor::new())).await;
        let err = manager
            .submit(JobRequest::new("hpc1").with_watch_period_secs(0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_job() {
        let manager = manager_with(Arc::new(ScriptedExecutor::new())).await;
        assert!(manager.get("nope").await.unwrap_err().is_not_found());
    }
}
