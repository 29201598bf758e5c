//! Prometheus metrics for gateway operations.
//!
//! Covers job submissions and watch polls, file transfers, background task
//! counts and telemetry requests.
//!
//! # Example
//!
//! ```ignore
//! use hpc_gateway::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_job_submitted("SLURM");
//!
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

// Re-export key types for convenient access
pub use collectors::{MetricsCollector, PollOutcome, TaskKind};
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    ACTIVE_TASKS, JOBS_SUBMITTED_TOTAL, JOB_POLLS_TOTAL, REGISTRY, TELEMETRY_REQUESTS_TOTAL,
    TRANSFERS_TOTAL, TRANSFER_DURATION,
};
