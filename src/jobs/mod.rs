//! Job lifecycle management.
//!
//! A job is submitted with one remote round trip, persisted as QUEUED, and
//! then tracked by a background watch chain that polls the scheduler until
//! the job reaches a terminal status.
//!
//! # Example
//!
//! ```rust,ignore
//! use hpc_gateway::jobs::JobRequest;
//!
//! let job = gateway.submit_job(JobRequest::new("hpc1").with_watch_period_secs(30)).await?;
//! // Poll for progress
//! let job = gateway.get_job(&job.id).await?;
//! ```

pub mod manager;
pub mod types;

pub use manager::JobManager;
pub use types::{JobRecord, JobRequest};
