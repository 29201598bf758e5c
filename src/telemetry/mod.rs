//! Partition-level utilization telemetry.
//!
//! Every request runs the scheduler's node and job listings on the cluster
//! and folds them into per-partition counters. Nothing here is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::infrastructure::InfrastructureRegistry;
use crate::metrics::MetricsCollector;
use crate::remote::RemoteExecutor;
use crate::scheduler::{JobResourceInfo, JobStatusCode, NodeInfo, NodeState, SchedulerKind};

/// Utilization of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTelemetry {
    pub name: String,
    pub total_nodes: u32,
    pub avail_nodes: u32,
    pub total_cpus: u64,
    pub avail_cpus: u64,
    pub running_jobs: u32,
    pub queued_jobs: u32,
}

impl PartitionTelemetry {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            total_nodes: 0,
            avail_nodes: 0,
            total_cpus: 0,
            avail_cpus: 0,
            running_jobs: 0,
            queued_jobs: 0,
        }
    }
}

/// Telemetry of one infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureTelemetry {
    pub name: String,
    pub host: String,
    pub hostname: String,
    pub scheduler: SchedulerKind,
    pub partitions: Vec<PartitionTelemetry>,
}

/// Folds node and job listings into per-partition counters.
///
/// Partitions come out in the order they first appear in `nodes`. Jobs
/// are counted against their own partition; jobs in a partition with no
/// listed nodes are skipped.
pub fn derive_partitions(nodes: &[NodeInfo], jobs: &[JobResourceInfo]) -> Vec<PartitionTelemetry> {
    let mut partitions: Vec<PartitionTelemetry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        let slot = *index.entry(node.partition.as_str()).or_insert_with(|| {
            partitions.push(PartitionTelemetry::empty(&node.partition));
            partitions.len() - 1
        });
        let partition = &mut partitions[slot];

        partition.total_nodes += 1;
        if node.state == NodeState::Idle {
            partition.avail_nodes += 1;
        }
        partition.total_cpus += u64::from(node.cpus);
    }

    for partition in &mut partitions {
        partition.avail_cpus = partition.total_cpus;
    }

    for job in jobs {
        let Some(&slot) = index.get(job.partition.as_str()) else {
            warn!(
                scheduler_id = %job.scheduler_id,
                partition = %job.partition,
                "Job partition has no listed nodes, skipping"
            );
            continue;
        };
        let partition = &mut partitions[slot];

        match job.state {
            Some(JobStatusCode::Running) => {
                partition.avail_cpus = partition.avail_cpus.saturating_sub(u64::from(job.cpus));
                partition.running_jobs += 1;
            }
            Some(JobStatusCode::Queued) => partition.queued_jobs += 1,
            _ => {}
        }
    }

    partitions
}

/// Collects telemetry from registered infrastructures.
#[derive(Clone)]
pub struct TelemetryAggregator {
    registry: InfrastructureRegistry,
    executor: Arc<dyn RemoteExecutor>,
    metrics: MetricsCollector,
}

impl TelemetryAggregator {
    pub fn new(registry: InfrastructureRegistry, executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            registry,
            executor,
            metrics: MetricsCollector::new(),
        }
    }

    /// Returns the current partition telemetry of infrastructure `name`.
    ///
    /// Schedulers without listing support yield zero partitions.
    pub async fn get(&self, name: &str) -> Result<InfrastructureTelemetry, GatewayError> {
        let result = self.collect(name).await;
        self.metrics.record_telemetry_request(result.is_ok());
        result
    }

    async fn collect(&self, name: &str) -> Result<InfrastructureTelemetry, GatewayError> {
        let infrastructure = self.registry.resolve(name).await?;
        let adapter = infrastructure.adapter();
        let target = infrastructure.remote_target();

        let node_output = self
            .executor
            .exec(&target, adapter.node_listing_command())
            .await?;
        let job_output = self
            .executor
            .exec(&target, adapter.job_listing_command())
            .await?;

        let nodes = adapter.parse_node_listing(&node_output.stdout)?;
        let jobs = adapter.parse_job_listing(&job_output.stdout)?;
        debug!(
            infrastructure = %name,
            nodes = nodes.len(),
            jobs = jobs.len(),
            "Collected resource listings"
        );

        Ok(InfrastructureTelemetry {
            name: infrastructure.name,
            host: infrastructure.host,
            hostname: infrastructure.hostname,
            scheduler: infrastructure.scheduler,
            partitions: derive_partitions(&nodes, &jobs),
        })
    }
}

impl std::fmt::Debug for TelemetryAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryAggregator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::listing::{parse_jobs, parse_nodes};
    use crate::storage::RecordStore;
    use crate::test_support::{infrastructure, ScriptedExecutor};

    const NODES: &str = "\
node01,node01,p,idle,128,1,64,2,128
node02,node02,p,allocated,32,2,8,2,64";

    const JOBS: &str = "\
1775,128,1,2022-06-13T14:15:46,*,*,*,59:51,0,node01,p,RUNNING,(null)
1776,32,1,N/A,*,*,*,1:00:00,0,,p,PENDING,(null)
1777,32,1,N/A,*,*,*,1:00:00,0,,p,PENDING,(null)";

    #[test]
    fn test_derive_single_partition() {
        let partitions = derive_partitions(&parse_nodes(NODES).unwrap(), &parse_jobs(JOBS).unwrap());

        assert_eq!(
            partitions,
            vec![PartitionTelemetry {
                name: "p".to_string(),
                total_nodes: 2,
                avail_nodes: 1,
                total_cpus: 160,
                avail_cpus: 32,
                running_jobs: 1,
                queued_jobs: 2,
            }]
        );
    }

    #[test]
    fn test_jobs_count_against_their_own_partition() {
        let nodes = parse_nodes(
            "a1,a1,alpha,idle,16,1,8,2,32\nb1,b1,beta,idle,8,1,4,2,16",
        )
        .unwrap();
        let jobs = parse_jobs(
            "1,4,1,N/A,*,*,*,1:00,0,a1,alpha,RUNNING,(null)\n\
             2,2,1,N/A,*,*,*,1:00,0,,beta,PENDING,(null)\n\
             3,2,1,N/A,*,*,*,1:00,0,,gamma,RUNNING,(null)",
        )
        .unwrap();

        let partitions = derive_partitions(&nodes, &jobs);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].name, "alpha");
        assert_eq!(partitions[0].avail_cpus, 12);
        assert_eq!(partitions[0].running_jobs, 1);
        assert_eq!(partitions[0].queued_jobs, 0);
        assert_eq!(partitions[1].name, "beta");
        assert_eq!(partitions[1].avail_cpus, 8);
        assert_eq!(partitions[1].queued_jobs, 1);
    }

    #[test]
    fn test_avail_cpus_saturates() {
        let nodes = parse_nodes("n1,n1,p,mixed,4,1,2,2,8").unwrap();
        let jobs = parse_jobs("1,16,1,N/A,*,*,*,1:00,0,n1,p,RUNNING,(null)").unwrap();
        assert_eq!(derive_partitions(&nodes, &jobs)[0].avail_cpus, 0);
    }

    #[test]
    fn test_empty_listings_yield_no_partitions() {
        assert!(derive_partitions(&[], &[]).is_empty());
    }

    #[tokio::test]
    async fn test_get_telemetry() {
        let store = RecordStore::in_memory("test");
        let registry = InfrastructureRegistry::new(store);
        registry
            .register(infrastructure("hpc1", SchedulerKind::Slurm).with_hostname("hpc1.local"))
            .await
            .unwrap();

        let executor = Arc::new(ScriptedExecutor::new().on("sinfo", &[NODES]).on("squeue", &[JOBS]));
        let aggregator = TelemetryAggregator::new(registry, executor);

        let telemetry = aggregator.get("hpc1").await.unwrap();
        assert_eq!(telemetry.name, "hpc1");
        assert_eq!(telemetry.hostname, "hpc1.local");
        assert_eq!(telemetry.scheduler, SchedulerKind::Slurm);
        assert_eq!(telemetry.partitions.len(), 1);
        assert_eq!(telemetry.partitions[0].total_cpus, 160);
    }

    #[tokio::test]
    async fn test_pbs_telemetry_is_empty() {
        let registry = InfrastructureRegistry::new(RecordStore::in_memory("test"));
        registry
            .register(infrastructure("pbs1", SchedulerKind::Pbs))
            .await
            .unwrap();
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("pbsnodes", &["node01\n     state = free"])
                .on("qstat", &["Job id  Name"]),
        );

        let telemetry = TelemetryAggregator::new(registry, executor).get("pbs1").await.unwrap();
        assert!(telemetry.partitions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_infrastructure() {
        let aggregator = TelemetryAggregator::new(
            InfrastructureRegistry::new(RecordStore::in_memory("test")),
            Arc::new(ScriptedExecutor::new()),
        );
        assert!(aggregator.get("missing").await.unwrap_err().is_not_found());
    }
}
