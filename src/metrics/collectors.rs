//! Recording helpers for gateway metrics.
//!
//! Every method is a no-op until `init_metrics()` has run, so library users
//! that never export metrics pay nothing.

use super::prometheus::{
    ACTIVE_TASKS, JOBS_SUBMITTED_TOTAL, JOB_POLLS_TOTAL, TELEMETRY_REQUESTS_TOTAL,
    TRANSFERS_TOTAL, TRANSFER_DURATION,
};

/// Result of one job watch poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Changed,
    Terminal,
    Error,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Unchanged => "unchanged",
            PollOutcome::Changed => "changed",
            PollOutcome::Terminal => "terminal",
            PollOutcome::Error => "error",
        }
    }
}

/// Kind of supervised background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Watch,
    Transfer,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Watch => "watch",
            TaskKind::Transfer => "transfer",
        }
    }
}

/// Metrics collector for gateway operations.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn record_job_submitted(&self, scheduler: &str) {
        if let Some(jobs) = JOBS_SUBMITTED_TOTAL.get() {
            jobs.with_label_values(&[scheduler]).inc();
        }
    }

    pub fn record_poll(&self, outcome: PollOutcome) {
        if let Some(polls) = JOB_POLLS_TOTAL.get() {
            polls.with_label_values(&[outcome.as_str()]).inc();
        }

        tracing::trace!(outcome = outcome.as_str(), "Recorded poll metric");
    }

    /// Record a finished transfer.
    ///
    /// # Arguments
    ///
    /// * `kind` - Transfer kind (`http` or `object_storage`)
    /// * `status` - Final transfer status
    /// * `duration_secs` - Time from acceptance to the final write
    pub fn record_transfer(&self, kind: &str, status: &str, duration_secs: f64) {
        if let Some(transfers) = TRANSFERS_TOTAL.get() {
            transfers.with_label_values(&[kind, status]).inc();
        }

        if let Some(duration) = TRANSFER_DURATION.get() {
            duration.with_label_values(&[kind]).observe(duration_secs);
        }

        tracing::trace!(
            kind = kind,
            status = status,
            duration_secs = duration_secs,
            "Recorded transfer metric"
        );
    }

    pub fn task_started(&self, kind: TaskKind) {
        if let Some(active) = ACTIVE_TASKS.get() {
            active.with_label_values(&[kind.as_str()]).inc();
        }
    }

    pub fn task_finished(&self, kind: TaskKind) {
        if let Some(active) = ACTIVE_TASKS.get() {
            active.with_label_values(&[kind.as_str()]).dec();
        }
    }

    pub fn record_telemetry_request(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        if let Some(requests) = TELEMETRY_REQUESTS_TOTAL.get() {
            requests.with_label_values(&[status]).inc();
        }
    }
}
