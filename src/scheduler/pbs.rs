//! PBS command set and output parsers.
//!
//! Telemetry is not available for PBS: the listing parsers return empty
//! sequences.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{JobResourceInfo, JobStatusCode, NodeInfo};
use crate::error::SchedulerError;

const SCHEDULER: &str = "PBS";

pub const SUBMIT_COMMAND: &str = "qsub";
pub const NODE_LISTING_COMMAND: &str = "pbsnodes -a";
pub const JOB_LISTING_COMMAND: &str = "qstat -a";

/// Ids are spliced into the status query shell command.
static JOB_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._\-\[\]]+$").expect("Invalid regex for PBS job id")
});

/// `qsub` prints the assigned id and nothing else.
pub fn parse_submitted_id(output: &str) -> Result<String, SchedulerError> {
    let id = output.trim();
    if !JOB_ID.is_match(id) {
        return Err(SchedulerError::MalformedSubmissionOutput {
            scheduler: SCHEDULER.to_string(),
            output: output.to_string(),
        });
    }
    Ok(id.to_string())
}

/// Prints the single-letter `job_state` of a job.
pub fn status_query_command(scheduler_id: &str) -> String {
    format!(
        "qstat -f {} | grep 'job_state' | grep -o '.$'",
        scheduler_id
    )
}

pub fn parse_status(output: &str) -> Result<JobStatusCode, SchedulerError> {
    match output.trim() {
        "C" => Ok(JobStatusCode::Completed),
        "Q" => Ok(JobStatusCode::Queued),
        "R" => Ok(JobStatusCode::Running),
        other => Err(SchedulerError::UnrecognizedStatus {
            scheduler: SCHEDULER.to_string(),
            status: other.to_string(),
        }),
    }
}

pub fn parse_node_listing(_output: &str) -> Result<Vec<NodeInfo>, SchedulerError> {
    Ok(Vec::new())
}

pub fn parse_job_listing(_output: &str) -> Result<Vec<JobResourceInfo>, SchedulerError> {
    Ok(Vec::new())
}
