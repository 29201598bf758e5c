//! Command-line interface for hpc-gateway.
//!
//! Operator commands for registering infrastructures, submitting jobs and
//! transfers, and reading back records and telemetry.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
