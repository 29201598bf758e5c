//! Resource listing parser.
//!
//! Turns the comma-delimited node and job listings printed by `sinfo` and
//! `squeue` into [`NodeInfo`] and [`JobResourceInfo`] records. Count fields
//! must be integers; every other field passes through verbatim, including
//! sentinels such as `N/A`, `*` and `(null)`.

use tracing::trace;

use super::slurm;
use super::types::{JobResourceInfo, NodeInfo, NodeState};
use crate::error::SchedulerError;

const NODE_FIELDS: usize = 9;
const JOB_FIELDS: usize = 13;

/// Parses a node listing: one `hostname,node,partition,state,cpus,sockets,cores,threads,memory`
/// record per line. Blank lines are skipped.
pub fn parse_nodes(data: &str) -> Result<Vec<NodeInfo>, SchedulerError> {
    let mut nodes = Vec::new();
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        let fields = split_fields(line);
        if fields.len() != NODE_FIELDS {
            return Err(field_count_error("node listing", line, NODE_FIELDS, fields.len()));
        }

        nodes.push(NodeInfo {
            hostname: fields[0].to_string(),
            node: fields[1].to_string(),
            partition: fields[2].to_string(),
            state: NodeState::from(fields[3].to_string()),
            cpus: parse_count("node listing", line, "cpus", fields[4])?,
            sockets: parse_count("node listing", line, "sockets", fields[5])?,
            cores: parse_count("node listing", line, "cores", fields[6])?,
            threads: parse_count("node listing", line, "threads", fields[7])?,
            memory: parse_count("node listing", line, "memory", fields[8])?,
        });
    }
    trace!(count = nodes.len(), "Parsed node listing");
    Ok(nodes)
}

/// Parses a job listing: one
/// `schedulerId,cpus,nodes,endTime,socketsPerNode,coresPerSocket,threadsPerCore,timeLeft,minMemory,nodeList,partition,state,schedNodes`
/// record per line. Blank lines are skipped.
pub fn parse_jobs(data: &str) -> Result<Vec<JobResourceInfo>, SchedulerError> {
    let mut jobs = Vec::new();
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        let fields = split_fields(line);
        if fields.len() != JOB_FIELDS {
            return Err(field_count_error("job listing", line, JOB_FIELDS, fields.len()));
        }

        let raw_state = fields[11].to_string();
        jobs.push(JobResourceInfo {
            scheduler_id: fields[0].to_string(),
            cpus: parse_count("job listing", line, "cpus", fields[1])?,
            nodes: parse_count("job listing", line, "nodes", fields[2])?,
            end_time: fields[3].to_string(),
            sockets_per_node: fields[4].to_string(),
            cores_per_socket: fields[5].to_string(),
            threads_per_core: fields[6].to_string(),
            time_left: fields[7].to_string(),
            min_memory: fields[8].to_string(),
            nodelist: fields[9].to_string(),
            partition: fields[10].to_string(),
            state: slurm::map_status(&raw_state).ok(),
            raw_state,
            schednodes: fields[12].to_string(),
        });
    }
    trace!(count = jobs.len(), "Parsed job listing");
    Ok(jobs)
}

/// Splits a line on commas that are not inside a `[...]` hostlist range,
/// so `node[01,03-04]` stays a single field.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

fn parse_count<T: std::str::FromStr>(
    listing: &'static str,
    line: &str,
    field: &str,
    value: &str,
) -> Result<T, SchedulerError> {
    value.trim().parse().map_err(|_| SchedulerError::MalformedListing {
        listing,
        line: line.to_string(),
        reason: format!("{} is not an integer: '{}'", field, value),
    })
}

fn field_count_error(
    listing: &'static str,
    line: &str,
    expected: usize,
    actual: usize,
) -> SchedulerError {
    SchedulerError::MalformedListing {
        listing,
        line: line.to_string(),
        reason: format!("expected {} fields, got {}", expected, actual),
    }
}
