//! Registration and lookup of HPC infrastructures.
//!
//! An infrastructure is a cluster login host plus the credential and
//! scheduler kind used to drive it. Jobs, transfers and telemetry requests
//! all refer to an infrastructure by name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GatewayError;
use crate::remote::{RemoteTarget, SshKey};
use crate::scheduler::{SchedulerAdapter, SchedulerKind};
use crate::storage::{RecordKind, RecordStore};

/// A registered cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureRecord {
    /// Unique name used by every other request.
    pub name: String,
    /// Address the gateway connects to.
    pub host: String,
    /// Hostname reported back to callers.
    pub hostname: String,
    pub username: String,
    pub scheduler: SchedulerKind,
    pub ssh_key: SshKey,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

impl InfrastructureRecord {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
        scheduler: SchedulerKind,
        ssh_key: SshKey,
    ) -> Self {
        let host = host.into();
        Self {
            name: name.into(),
            hostname: host.clone(),
            host,
            username: username.into(),
            scheduler,
            ssh_key,
            registered_at: Utc::now(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Returns where remote commands and copies for this infrastructure go.
    pub fn remote_target(&self) -> RemoteTarget {
        RemoteTarget::new(&self.host, &self.username, self.ssh_key.clone())
    }

    pub fn adapter(&self) -> SchedulerAdapter {
        SchedulerAdapter::new(self.scheduler)
    }

    pub fn summary(&self) -> InfrastructureSummary {
        InfrastructureSummary {
            name: self.name.clone(),
            host: self.host.clone(),
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            scheduler: self.scheduler,
        }
    }

    fn validate(&self) -> Result<(), GatewayError> {
        for (field, value) in [
            ("name", &self.name),
            ("host", &self.host),
            ("username", &self.username),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::InvalidRequest(format!(
                    "infrastructure {} cannot be empty",
                    field
                )));
            }
        }
        if self.name.contains('/') {
            return Err(GatewayError::InvalidRequest(
                "infrastructure name cannot contain '/'".to_string(),
            ));
        }
        // Both end up in the `user@host` argument of ssh and scp.
        for (field, value) in [("host", &self.host), ("username", &self.username)] {
            if value.starts_with('-')
                || value
                    .chars()
                    .any(|c| c.is_whitespace() || c.is_control() || c == '@' || c == ':')
            {
                return Err(GatewayError::InvalidRequest(format!(
                    "infrastructure {} '{}' is not a valid ssh {}",
                    field, value, field
                )));
            }
        }
        Ok(())
    }
}

/// An infrastructure as shown to callers; the credential is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureSummary {
    pub name: String,
    pub host: String,
    pub hostname: String,
    pub username: String,
    pub scheduler: SchedulerKind,
}

/// Infrastructure records in the record store.
#[derive(Debug, Clone)]
pub struct InfrastructureRegistry {
    store: RecordStore,
}

impl InfrastructureRegistry {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Saves `record`, replacing any infrastructure with the same name.
    pub async fn register(
        &self,
        record: InfrastructureRecord,
    ) -> Result<InfrastructureSummary, GatewayError> {
        record.validate()?;
        self.store
            .save_record(RecordKind::Cluster, &record.name, &record)
            .await?;

        info!(
            infrastructure = %record.name,
            host = %record.host,
            scheduler = %record.scheduler,
            "Registered infrastructure"
        );
        Ok(record.summary())
    }

    /// Loads the full record, credential included.
    pub async fn resolve(&self, name: &str) -> Result<InfrastructureRecord, GatewayError> {
        self.store
            .get_record(RecordKind::Cluster, name)
            .await
            .map_err(|e| GatewayError::from_store("infrastructure", name, e))
    }

    pub async fn get(&self, name: &str) -> Result<InfrastructureSummary, GatewayError> {
        Ok(self.resolve(name).await?.summary())
    }
}
