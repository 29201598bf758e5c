//! OpenSSH-binary implementation of the remote capabilities.
//!
//! Keys with a passphrase must already be loaded into `ssh-agent`: the
//! binaries run with `BatchMode=yes` and never prompt.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandOutput, RemoteCopier, RemoteExecutor, RemoteTarget};
use crate::config::GatewayConfig;
use crate::error::RemoteError;

/// Exit status `ssh` uses for its own failures.
const SSH_FAILURE_EXIT_CODE: i32 = 255;

/// Remote executor and copier backed by the `ssh` and `scp` binaries.
#[derive(Debug, Clone)]
pub struct OpenSshClient {
    ssh_binary: String,
    scp_binary: String,
    connect_timeout: Duration,
}

impl OpenSshClient {
    pub fn new(
        ssh_binary: impl Into<String>,
        scp_binary: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            ssh_binary: ssh_binary.into(),
            scp_binary: scp_binary.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            &config.ssh_binary,
            &config.scp_binary,
            config.ssh_connect_timeout,
        )
    }

    /// Options shared by `ssh` and `scp`.
    fn common_args(&self, target: &RemoteTarget) -> Vec<String> {
        if target.key.password.is_some() {
            debug!(
                key = %target.key.path.display(),
                "Key passphrase is not passed to OpenSSH; relying on ssh-agent"
            );
        }
        vec![
            "-i".to_string(),
            target.key.path.to_string_lossy().to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ]
    }

    /// Builds the `ssh` argument list for running `command` on `target`.
    pub fn ssh_args(&self, target: &RemoteTarget, command: &str) -> Vec<String> {
        let mut args = self.common_args(target);
        args.push("--".to_string());
        args.push(target.destination());
        args.push(command.to_string());
        args
    }

    /// Builds the `scp` argument list for copying `local_path` to `target`.
    pub fn scp_args(&self, target: &RemoteTarget, local_path: &Path, remote_path: &str) -> Vec<String> {
        let mut args = self.common_args(target);
        args.push("-q".to_string());
        args.push("--".to_string());
        args.push(local_path.to_string_lossy().to_string());
        args.push(format!("{}:{}", target.destination(), remote_path));
        args
    }
}

#[async_trait]
impl RemoteExecutor for OpenSshClient {
    async fn exec(
        &self,
        target: &RemoteTarget,
        command: &str,
    ) -> Result<CommandOutput, RemoteError> {
        debug!(host = %target.host, command = %command, "Executing remote command");

        let output = Command::new(&self.ssh_binary)
            .args(self.ssh_args(target, command))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RemoteError::ExecutionFailed {
                host: target.host.clone(),
                reason: format!("failed to spawn {}: {}", self.ssh_binary, e),
            })?;

        let exit_code = output.status.code();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if exit_code == Some(SSH_FAILURE_EXIT_CODE) || exit_code.is_none() {
            return Err(RemoteError::ExecutionFailed {
                host: target.host.clone(),
                reason: stderr.trim().to_string(),
            });
        }

        if exit_code != Some(0) {
            warn!(
                host = %target.host,
                exit_code = ?exit_code,
                "Remote command exited with non-zero status"
            );
        }

        Ok(CommandOutput::new(stdout, stderr, exit_code))
    }
}

#[async_trait]
impl RemoteCopier for OpenSshClient {
    async fn put(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError> {
        debug!(
            host = %target.host,
            local = %local_path.display(),
            remote = %remote_path,
            "Copying file to remote host"
        );

        let copy_failed = |reason: String| RemoteError::CopyFailed {
            host: target.host.clone(),
            local: local_path.display().to_string(),
            remote: remote_path.to_string(),
            reason,
        };

        let output = Command::new(&self.scp_binary)
            .args(self.scp_args(target, local_path, remote_path))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| copy_failed(format!("failed to spawn {}: {}", self.scp_binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(copy_failed(stderr.trim().to_string()));
        }

        Ok(())
    }
}
