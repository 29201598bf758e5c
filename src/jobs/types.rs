use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::JobStatusCode;

/// Request to submit the canned job to an infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Name of a registered infrastructure.
    pub infrastructure: String,
    /// Poll period for the watch chain; the configured default when unset.
    #[serde(default)]
    pub watch_period_secs: Option<u64>,
}

impl JobRequest {
    pub fn new(infrastructure: impl Into<String>) -> Self {
        Self {
            infrastructure: infrastructure.into(),
            watch_period_secs: None,
        }
    }

    pub fn with_watch_period_secs(mut self, secs: u64) -> Self {
        self.watch_period_secs = Some(secs);
        self
    }
}

/// A submitted job as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Gateway-assigned id.
    pub id: String,
    /// Id assigned by the batch scheduler.
    pub scheduler_id: String,
    pub infrastructure: String,
    pub status: JobStatusCode,
    pub watch_period_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a QUEUED record with a fresh id.
    pub fn queued(
        scheduler_id: impl Into<String>,
        infrastructure: impl Into<String>,
        watch_period_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            scheduler_id: scheduler_id.into(),
            infrastructure: infrastructure.into(),
            status: JobStatusCode::Queued,
            watch_period_secs,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy of this record carrying `status`.
    pub fn with_status(&self, status: JobStatusCode) -> Self {
        Self {
            status,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
