//! hpc-gateway: job submission, data staging and telemetry for HPC clusters.
//!
//! The gateway hides the differences between batch schedulers (PBS, Slurm)
//! and between data sources (HTTP, S3-compatible storage) behind one set of
//! operations on plain records. See [`Gateway`] for the entry point.

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod infrastructure;
pub mod jobs;
pub mod metrics;
pub mod remote;
pub mod scheduler;
pub mod storage;
pub mod supervisor;
pub mod telemetry;
pub mod transfer;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, GatewayConfig};
pub use error::{FetchError, GatewayError, RemoteError, SchedulerError, StoreError};
pub use gateway::Gateway;
