//! Gateway configuration.
//!
//! Covers record storage, the canned job submission, staging of transfers,
//! the OpenSSH binaries used for remote access, and shutdown behavior.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the gateway and its managers.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    // Storage settings
    /// First segment of every record key.
    pub namespace: String,
    /// Redis URL; records are kept in memory when unset.
    pub redis_url: Option<String>,

    // Job settings
    /// Poll period used when a job request does not set one.
    pub default_watch_period: Duration,
    /// Remote directory the canned job is submitted from.
    pub job_workdir: String,
    /// Job script handed to the scheduler's submit command.
    pub job_script: String,

    // Transfer settings
    /// Parent directory for staging directories (system temp dir when unset).
    pub staging_dir: Option<PathBuf>,
    /// Buffer size used when streaming HTTP bodies to disk.
    pub chunk_size: usize,

    // Remote access settings
    /// OpenSSH client binary.
    pub ssh_binary: String,
    /// OpenSSH copy binary.
    pub scp_binary: String,
    /// Connection timeout passed to the SSH client.
    pub ssh_connect_timeout: Duration,

    /// How long shutdown waits for background work before giving up.
    pub shutdown_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: "hpc-gateway".to_string(),
            redis_url: None,

            default_watch_period: Duration::from_secs(10),
            job_workdir: "test/".to_string(),
            job_script: "test-job-openmpi-example.sh".to_string(),

            staging_dir: None,
            chunk_size: 8192,

            ssh_binary: "ssh".to_string(),
            scp_binary: "scp".to_string(),
            ssh_connect_timeout: Duration::from_secs(30),

            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HPC_GATEWAY_NAMESPACE`: Record key namespace (default: hpc-gateway)
    /// - `HPC_GATEWAY_REDIS_URL`: Redis URL for durable records (default: in-memory)
    /// - `HPC_GATEWAY_WATCH_PERIOD_SECS`: Default job poll period (default: 10)
    /// - `HPC_GATEWAY_JOB_WORKDIR`: Remote submission directory (default: test/)
    /// - `HPC_GATEWAY_JOB_SCRIPT`: Job script to submit (default: test-job-openmpi-example.sh)
    /// - `HPC_GATEWAY_STAGING_DIR`: Parent of staging directories (default: system temp)
    /// - `HPC_GATEWAY_CHUNK_SIZE`: HTTP streaming buffer in bytes (default: 8192)
    /// - `HPC_GATEWAY_SSH_BINARY`: SSH client binary (default: ssh)
    /// - `HPC_GATEWAY_SCP_BINARY`: SCP binary (default: scp)
    /// - `HPC_GATEWAY_SSH_CONNECT_TIMEOUT_SECS`: SSH connect timeout (default: 30)
    /// - `HPC_GATEWAY_SHUTDOWN_TIMEOUT_SECS`: Shutdown timeout (default: 60)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Storage settings
        if let Ok(val) = std::env::var("HPC_GATEWAY_NAMESPACE") {
            config.namespace = val;
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_REDIS_URL") {
            if !val.trim().is_empty() {
                config.redis_url = Some(val);
            }
        }

        // Job settings
        if let Ok(val) = std::env::var("HPC_GATEWAY_WATCH_PERIOD_SECS") {
            let secs: u64 = parse_env_value(&val, "HPC_GATEWAY_WATCH_PERIOD_SECS")?;
            config.default_watch_period = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_JOB_WORKDIR") {
            config.job_workdir = val;
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_JOB_SCRIPT") {
            config.job_script = val;
        }

        // Transfer settings
        if let Ok(val) = std::env::var("HPC_GATEWAY_STAGING_DIR") {
            config.staging_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_CHUNK_SIZE") {
            config.chunk_size = parse_env_value(&val, "HPC_GATEWAY_CHUNK_SIZE")?;
        }

        // Remote access settings
        if let Ok(val) = std::env::var("HPC_GATEWAY_SSH_BINARY") {
            config.ssh_binary = val;
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_SCP_BINARY") {
            config.scp_binary = val;
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_SSH_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "HPC_GATEWAY_SSH_CONNECT_TIMEOUT_SECS")?;
            config.ssh_connect_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("HPC_GATEWAY_SHUTDOWN_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "HPC_GATEWAY_SHUTDOWN_TIMEOUT_SECS")?;
            config.shutdown_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "namespace cannot be empty".to_string(),
            ));
        }

        if self.default_watch_period.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "default_watch_period must be greater than 0".to_string(),
            ));
        }

        if self.job_script.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "job_script cannot be empty".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.ssh_binary.is_empty() || self.scp_binary.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "ssh_binary and scp_binary cannot be empty".to_string(),
            ));
        }

        if self.ssh_connect_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "ssh_connect_timeout must be greater than 0".to_string(),
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "shutdown_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the record namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Builder method to set the Redis URL.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Builder method to set the default watch period.
    pub fn with_default_watch_period(mut self, period: Duration) -> Self {
        self.default_watch_period = period;
        self
    }

    /// Builder method to set the remote submission directory.
    pub fn with_job_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.job_workdir = workdir.into();
        self
    }

    /// Builder method to set the job script.
    pub fn with_job_script(mut self, script: impl Into<String>) -> Self {
        self.job_script = script.into();
        self
    }

    /// Builder method to set the staging directory parent.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Builder method to set the HTTP chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Builder method to set the SSH binary.
    pub fn with_ssh_binary(mut self, binary: impl Into<String>) -> Self {
        self.ssh_binary = binary.into();
        self
    }

    /// Builder method to set the SCP binary.
    pub fn with_scp_binary(mut self, binary: impl Into<String>) -> Self {
        self.scp_binary = binary.into();
        self
    }

    /// Builder method to set the SSH connect timeout.
    pub fn with_ssh_connect_timeout(mut self, timeout: Duration) -> Self {
        self.ssh_connect_timeout = timeout;
        self
    }

    /// Builder method to set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
