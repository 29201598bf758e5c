//! Slurm command set and output parsers.

use std::sync::LazyLock;

use regex::Regex;

use super::listing;
use super::types::{JobResourceInfo, JobStatusCode, NodeInfo};
use crate::error::SchedulerError;

const SCHEDULER: &str = "SLURM";

pub const SUBMIT_COMMAND: &str = "sbatch";
pub const NODE_LISTING_COMMAND: &str = "sinfo -h -o '%n,%N,%R,%T,%c,%X,%Y,%Z,%m'";
pub const JOB_LISTING_COMMAND: &str = "squeue -h -o '%A,%C,%D,%e,%H,%I,%J,%L,%m,%N,%P,%T,%Y'";

const JOB_STATE_PREFIX: &str = "JobState=";

static JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid regex for Slurm job id"));

/// Extracts the first run of digits, e.g. `Submitted batch job 1763` -> `1763`.
pub fn parse_submitted_id(output: &str) -> Result<String, SchedulerError> {
    JOB_ID
        .find(output)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SchedulerError::MalformedSubmissionOutput {
            scheduler: SCHEDULER.to_string(),
            output: output.to_string(),
        })
}

/// Prints the `JobState=<STATE>` token of a job.
pub fn status_query_command(scheduler_id: &str) -> String {
    format!(
        "scontrol show job -dd {} | grep -o 'JobState=[A-Z]*'",
        scheduler_id
    )
}

/// Parses the status query output; the `JobState=` prefix is optional.
pub fn parse_status(output: &str) -> Result<JobStatusCode, SchedulerError> {
    let trimmed = output.trim();
    map_status(trimmed.strip_prefix(JOB_STATE_PREFIX).unwrap_or(trimmed))
}

/// Maps a Slurm state word onto the normalized status.
///
/// `FAILED` is reported as `COMPLETED`: the job ran to an end on the cluster.
pub fn map_status(state: &str) -> Result<JobStatusCode, SchedulerError> {
    match state {
        "COMPLETED" | "FAILED" => Ok(JobStatusCode::Completed),
        "PENDING" => Ok(JobStatusCode::Queued),
        "COMPLETING" | "RUNNING" => Ok(JobStatusCode::Running),
        other => Err(SchedulerError::UnrecognizedStatus {
            scheduler: SCHEDULER.to_string(),
            status: other.to_string(),
        }),
    }
}

pub fn parse_node_listing(output: &str) -> Result<Vec<NodeInfo>, SchedulerError> {
    listing::parse_nodes(output)
}

pub fn parse_job_listing(output: &str) -> Result<Vec<JobResourceInfo>, SchedulerError> {
    listing::parse_jobs(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_id_from_sbatch_output() {
        assert_eq!(
            parse_submitted_id("Submitted batch job 1763").unwrap(),
            "1763"
        );
        assert_eq!(
            parse_submitted_id("Submitted batch job 17 on cluster c2").unwrap(),
            "17"
        );
    }

    #[test]
    fn test_submitted_id_without_digits_fails() {
        let err = parse_submitted_id("sbatch: error: invalid partition").unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::MalformedSubmissionOutput { .. }
        ));
        assert!(parse_submitted_id("").is_err());
    }

    #[test]
    fn test_status_words() {
        assert_eq!(map_status("COMPLETED").unwrap(), JobStatusCode::Completed);
        assert_eq!(map_status("FAILED").unwrap(), JobStatusCode::Completed);
        assert_eq!(map_status("PENDING").unwrap(), JobStatusCode::Queued);
        assert_eq!(map_status("COMPLETING").unwrap(), JobStatusCode::Running);
        assert_eq!(map_status("RUNNING").unwrap(), JobStatusCode::Running);
    }

    #[test]
    fn test_unknown_status_words_fail() {
        for word in ["CANCELLED", "SUSPENDED", "running", ""] {
            assert!(matches!(
                map_status(word),
                Err(SchedulerError::UnrecognizedStatus { .. })
            ));
        }
    }

    #[test]
    fn test_parse_status_strips_job_state_prefix() {
        assert_eq!(
            parse_status("JobState=RUNNING\n").unwrap(),
            JobStatusCode::Running
        );
        assert_eq!(parse_status("PENDING").unwrap(), JobStatusCode::Queued);
    }

    #[test]
    fn test_status_query_command() {
        assert_eq!(
            status_query_command("1763"),
            "scontrol show job -dd 1763 | grep -o 'JobState=[A-Z]*'"
        );
    }
}
