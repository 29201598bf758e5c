//! Scheduler abstraction for PBS and Slurm clusters.
//!
//! This module normalizes job submission, status polling and resource
//! listings across batch schedulers:
//!
//! - **SchedulerKind**: tagged union of the supported schedulers
//! - **SchedulerAdapter**: command strings and output parsers for one kind
//! - **listing**: parser for comma-delimited node and job listings
//!
//! Every adapter operation is a pure function; the callers run the returned
//! commands over the remote execution channel and feed the output back.
//!
//! # Example
//!
//! ```rust,ignore
//! use hpc_gateway::scheduler::SchedulerAdapter;
//!
//! let adapter = SchedulerAdapter::from_name("SLURM")?;
//! let scheduler_id = adapter.parse_submitted_id("Submitted batch job 1763")?;
//! let query = adapter.status_query_command(&scheduler_id);
//! ```

pub mod listing;
pub mod pbs;
pub mod slurm;
pub mod types;

// Re-export main types for convenience
pub use types::{JobResourceInfo, JobStatusCode, NodeInfo, NodeState, SchedulerKind};

use crate::error::SchedulerError;

/// Command strings and output parsers for one scheduler kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerAdapter {
    kind: SchedulerKind,
}

impl SchedulerAdapter {
    /// Returns the adapter for `kind`.
    pub fn new(kind: SchedulerKind) -> Self {
        Self { kind }
    }

    /// Returns the adapter for a scheduler name such as `"SLURM"`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::UnsupportedScheduler` for unknown names.
    pub fn from_name(name: &str) -> Result<Self, SchedulerError> {
        Ok(Self::new(name.parse()?))
    }

    /// Returns the scheduler kind served by this adapter.
    pub fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub fn submit_command(&self) -> &'static str {
        match self.kind {
            SchedulerKind::Pbs => pbs::SUBMIT_COMMAND,
            SchedulerKind::Slurm => slurm::SUBMIT_COMMAND,
        }
    }

    /// Extracts the scheduler-assigned id from the submit command's stdout.
    pub fn parse_submitted_id(&self, output: &str) -> Result<String, SchedulerError> {
        match self.kind {
            SchedulerKind::Pbs => pbs::parse_submitted_id(output),
            SchedulerKind::Slurm => slurm::parse_submitted_id(output),
        }
    }

    pub fn status_query_command(&self, scheduler_id: &str) -> String {
        match self.kind {
            SchedulerKind::Pbs => pbs::status_query_command(scheduler_id),
            SchedulerKind::Slurm => slurm::status_query_command(scheduler_id),
        }
    }

    pub fn parse_status(&self, output: &str) -> Result<JobStatusCode, SchedulerError> {
        match self.kind {
            SchedulerKind::Pbs => pbs::parse_status(output),
            SchedulerKind::Slurm => slurm::parse_status(output),
        }
    }

    pub fn node_listing_command(&self) -> &'static str {
        match self.kind {
            SchedulerKind::Pbs => pbs::NODE_LISTING_COMMAND,
            SchedulerKind::Slurm => slurm::NODE_LISTING_COMMAND,
        }
    }

    pub fn job_listing_command(&self) -> &'static str {
        match self.kind {
            SchedulerKind::Pbs => pbs::JOB_LISTING_COMMAND,
            SchedulerKind::Slurm => slurm::JOB_LISTING_COMMAND,
        }
    }

    pub fn parse_node_listing(&self, output: &str) -> Result<Vec<NodeInfo>, SchedulerError> {
        match self.kind {
            SchedulerKind::Pbs => pbs::parse_node_listing(output),
            SchedulerKind::Slurm => slurm::parse_node_listing(output),
        }
    }

    pub fn parse_job_listing(&self, output: &str) -> Result<Vec<JobResourceInfo>, SchedulerError> {
        match self.kind {
            SchedulerKind::Pbs => pbs::parse_job_listing(output),
            SchedulerKind::Slurm => slurm::parse_job_listing(output),
        }
    }
}

impl From<SchedulerKind> for SchedulerAdapter {
    fn from(kind: SchedulerKind) -> Self {
        Self::new(kind)
    }
}
