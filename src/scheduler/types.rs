//! Types shared by the scheduler adapters and their consumers.

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Batch scheduler flavor of an infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SchedulerKind {
    Pbs,
    Slurm,
}

impl SchedulerKind {
    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::Pbs => "PBS",
            SchedulerKind::Slurm => "SLURM",
        }
    }
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchedulerKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PBS" => Ok(SchedulerKind::Pbs),
            "SLURM" => Ok(SchedulerKind::Slurm),
            _ => Err(SchedulerError::UnsupportedScheduler(s.to_string())),
        }
    }
}

impl TryFrom<String> for SchedulerKind {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchedulerKind> for String {
    fn from(kind: SchedulerKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Normalized job status, independent of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatusCode {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatusCode {
    /// Returns true once the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatusCode::Completed | JobStatusCode::Failed)
    }

    /// Position on the QUEUED -> RUNNING -> terminal progression.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatusCode::Queued => 0,
            JobStatusCode::Running => 1,
            JobStatusCode::Completed | JobStatusCode::Failed => 2,
        }
    }

    /// Returns true if moving from `self` to `next` goes forward.
    pub fn advances_to(&self, next: JobStatusCode) -> bool {
        next.rank() > self.rank()
    }
}

impl std::fmt::Display for JobStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatusCode::Queued => write!(f, "QUEUED"),
            JobStatusCode::Running => write!(f, "RUNNING"),
            JobStatusCode::Completed => write!(f, "COMPLETED"),
            JobStatusCode::Failed => write!(f, "FAILED"),
        }
    }
}

/// State of a compute node as reported by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    Idle,
    Allocated,
    Mixed,
    Down,
    Drained,
    Draining,
    Completing,
    Reserved,
    /// Any state without a dedicated variant, kept verbatim.
    Other(String),
}

impl From<String> for NodeState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "idle" => NodeState::Idle,
            "allocated" => NodeState::Allocated,
            "mixed" => NodeState::Mixed,
            "down" => NodeState::Down,
            "drained" => NodeState::Drained,
            "draining" => NodeState::Draining,
            "completing" => NodeState::Completing,
            "reserved" => NodeState::Reserved,
            _ => NodeState::Other(raw),
        }
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        match state {
            NodeState::Idle => "IDLE".to_string(),
            NodeState::Allocated => "ALLOCATED".to_string(),
            NodeState::Mixed => "MIXED".to_string(),
            NodeState::Down => "DOWN".to_string(),
            NodeState::Drained => "DRAINED".to_string(),
            NodeState::Draining => "DRAINING".to_string(),
            NodeState::Completing => "COMPLETING".to_string(),
            NodeState::Reserved => "RESERVED".to_string(),
            NodeState::Other(raw) => raw,
        }
    }
}

/// One line of a node listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub hostname: String,
    pub node: String,
    pub partition: String,
    pub state: NodeState,
    pub cpus: u32,
    pub sockets: u32,
    pub cores: u32,
    pub threads: u32,
    pub memory: u64,
}

/// One line of a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResourceInfo {
    pub scheduler_id: String,
    pub cpus: u32,
    pub nodes: u32,
    pub end_time: String,
    pub sockets_per_node: String,
    pub cores_per_socket: String,
    pub threads_per_core: String,
    pub time_left: String,
    pub min_memory: String,
    pub nodelist: String,
    pub partition: String,
    /// Normalized state; `None` when the scheduler reported a state the
    /// status map does not cover.
    pub state: Option<JobStatusCode>,
    /// State exactly as the scheduler printed it.
    pub raw_state: String,
    pub schednodes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_kind_parse() {
        assert_eq!("PBS".parse::<SchedulerKind>().unwrap(), SchedulerKind::Pbs);
        assert_eq!(
            "slurm".parse::<SchedulerKind>().unwrap(),
            SchedulerKind::Slurm
        );
        assert!(matches!(
            "LSF".parse::<SchedulerKind>(),
            Err(SchedulerError::UnsupportedScheduler(name)) if name == "LSF"
        ));
    }

    #[test]
    fn test_scheduler_kind_serde() {
        let json = serde_json::to_string(&SchedulerKind::Slurm).unwrap();
        assert_eq!(json, "\"SLURM\"");
        let parsed: SchedulerKind = serde_json::from_str("\"PBS\"").unwrap();
        assert_eq!(parsed, SchedulerKind::Pbs);

        let err = serde_json::from_str::<SchedulerKind>("\"LSF\"").unwrap_err();
        assert!(err.to_string().contains("Unsupported scheduler"));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatusCode::Queued.is_terminal());
        assert!(!JobStatusCode::Running.is_terminal());
        assert!(JobStatusCode::Completed.is_terminal());
        assert!(JobStatusCode::Failed.is_terminal());
        assert_eq!(
            serde_json::to_string(&JobStatusCode::Queued).unwrap(),
            "\"QUEUED\""
        );
    }

    #[test]
    fn test_status_only_advances() {
        assert!(JobStatusCode::Queued.advances_to(JobStatusCode::Running));
        assert!(JobStatusCode::Queued.advances_to(JobStatusCode::Completed));
        assert!(JobStatusCode::Running.advances_to(JobStatusCode::Failed));
        assert!(!JobStatusCode::Running.advances_to(JobStatusCode::Queued));
        assert!(!JobStatusCode::Running.advances_to(JobStatusCode::Running));
        assert!(!JobStatusCode::Completed.advances_to(JobStatusCode::Failed));
    }

    #[test]
    fn test_node_state_from_raw() {
        assert_eq!(NodeState::from("idle".to_string()), NodeState::Idle);
        assert_eq!(NodeState::from("ALLOCATED".to_string()), NodeState::Allocated);
        assert_eq!(
            NodeState::from("idle*".to_string()),
            NodeState::Other("idle*".to_string())
        );
        assert_eq!(String::from(NodeState::Mixed), "MIXED");
    }
}
