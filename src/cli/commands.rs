//! CLI command definitions for hpc-gateway.
//!
//! Every command builds a [`Gateway`] from the environment, runs one
//! operation and prints the resulting record as pretty JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::infrastructure::InfrastructureRecord;
use crate::jobs::JobRequest;
use crate::metrics::{export_metrics, init_metrics};
use crate::transfer::{FileTransferRequest, S3FileTransferRequest, TransferKind};

/// Gateway to PBS and Slurm clusters: jobs, file transfers and telemetry.
#[derive(Parser, Debug)]
#[command(name = "hpc-gateway")]
#[command(about = "Submit jobs and move data to HPC clusters over SSH")]
#[command(version)]
#[command(
    long_about = "hpc-gateway submits jobs to PBS and Slurm clusters, stages files from HTTP or S3-compatible storage onto them, and reports partition utilization.\n\nRecords are kept in Redis when HPC_GATEWAY_REDIS_URL is set, in memory otherwise.\n\nExample usage:\n  hpc-gateway --registry clusters.yaml submit --infrastructure hpc1 --follow"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML or JSON file of infrastructures registered before the command runs.
    #[arg(long, env = "HPC_GATEWAY_REGISTRY", global = true)]
    pub registry: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Register (or re-register) infrastructures from a YAML or JSON file.
    Register(RegisterArgs),

    /// Show a registered infrastructure.
    Infrastructure(NameArgs),

    /// Submit the job script to an infrastructure.
    Submit(SubmitArgs),

    /// Show a job record.
    Job(IdArgs),

    /// Transfer a file from an HTTP(S) URI to an infrastructure.
    Transfer(TransferArgs),

    /// Transfer an object from S3-compatible storage to an infrastructure.
    #[command(name = "s3-transfer")]
    S3Transfer(S3TransferArgs),

    /// Show a transfer record.
    #[command(name = "transfer-status")]
    TransferStatus(TransferStatusArgs),

    /// Show partition utilization of an infrastructure.
    Telemetry(NameArgs),

    /// Print Prometheus metrics.
    Metrics,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// File holding one infrastructure or a list of them.
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct NameArgs {
    /// Infrastructure name.
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct IdArgs {
    /// Record id.
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Infrastructure to submit to.
    #[arg(short, long)]
    pub infrastructure: String,

    /// Seconds between status polls.
    #[arg(short, long)]
    pub watch_period: Option<u64>,

    /// Watch the job until it finishes before exiting.
    #[arg(long)]
    pub follow: bool,
}

#[derive(Parser, Debug)]
pub struct TransferArgs {
    /// Infrastructure to copy to.
    #[arg(short, long)]
    pub infrastructure: String,

    /// Source URI.
    #[arg(long)]
    pub src: String,

    /// Destination path on the infrastructure.
    #[arg(long)]
    pub dst: String,
}

#[derive(Parser, Debug)]
pub struct S3TransferArgs {
    /// Infrastructure to copy to.
    #[arg(short, long)]
    pub infrastructure: String,

    /// S3 endpoint URL.
    #[arg(long)]
    pub endpoint: String,

    #[arg(long)]
    pub bucket: String,

    /// Object key.
    #[arg(long)]
    pub object: String,

    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key: String,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Destination path on the infrastructure.
    #[arg(long)]
    pub dst: String,
}

#[derive(Parser, Debug)]
pub struct TransferStatusArgs {
    /// Transfer id.
    pub id: String,

    /// Look up an object storage transfer.
    #[arg(long)]
    pub s3: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_metrics().context("Failed to initialize metrics")?;

    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    let gateway = Gateway::from_config(config).await?;

    if let Some(path) = &cli.registry {
        for record in load_infrastructures(path)? {
            gateway.register_infrastructure(record).await?;
        }
    }

    let result = run_command(&gateway, cli.command).await;

    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "Background work did not stop cleanly");
    }
    result
}

async fn run_command(gateway: &Gateway, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Register(args) => {
            let mut summaries = Vec::new();
            for record in load_infrastructures(&args.file)? {
                summaries.push(gateway.register_infrastructure(record).await?);
            }
            print_json(&summaries)
        }
        Commands::Infrastructure(args) => {
            print_json(&gateway.get_infrastructure(&args.name).await?)
        }
        Commands::Submit(args) => {
            let mut request = JobRequest::new(args.infrastructure);
            request.watch_period_secs = args.watch_period;

            let job = gateway.submit_job(request).await?;
            if args.follow {
                info!(job_id = %job.id, "Following job until it finishes");
                gateway.drain().await;
                print_json(&gateway.get_job(&job.id).await?)
            } else {
                print_json(&job)
            }
        }
        Commands::Job(args) => print_json(&gateway.get_job(&args.id).await?),
        Commands::Transfer(args) => {
            let request = FileTransferRequest::new(args.infrastructure, args.src, args.dst);
            let record = gateway.submit_transfer(request).await?;
            gateway.drain().await;
            print_json(&gateway.get_transfer(record.kind, &record.id).await?)
        }
        Commands::S3Transfer(args) => {
            let request = S3FileTransferRequest {
                infrastructure: args.infrastructure,
                endpoint: args.endpoint,
                bucket: args.bucket,
                object: args.object,
                region: args.region,
                access_key: args.access_key,
                secret_key: args.secret_key,
                dst: args.dst,
            };
            let record = gateway.submit_transfer(request).await?;
            gateway.drain().await;
            print_json(&gateway.get_transfer(record.kind, &record.id).await?)
        }
        Commands::TransferStatus(args) => {
            let kind = if args.s3 {
                TransferKind::ObjectStorage
            } else {
                TransferKind::Http
            };
            print_json(&gateway.get_transfer(kind, &args.id).await?)
        }
        Commands::Telemetry(args) => print_json(&gateway.get_telemetry(&args.name).await?),
        Commands::Metrics => {
            print!("{}", export_metrics());
            Ok(())
        }
    }
}

/// Loads one infrastructure or a list of them from a YAML or JSON file.
fn load_infrastructures(path: &Path) -> anyhow::Result<Vec<InfrastructureRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_infrastructures(&content)
        .with_context(|| format!("Failed to parse infrastructures in {}", path.display()))
}

fn parse_infrastructures(content: &str) -> anyhow::Result<Vec<InfrastructureRecord>> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    let records = if value.is_sequence() {
        serde_yaml::from_value(value)?
    } else {
        vec![serde_yaml::from_value(value)?]
    };
    Ok(records)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
