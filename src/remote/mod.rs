//! Remote execution and remote copy capabilities.
//!
//! The managers only see the [`RemoteExecutor`] and [`RemoteCopier`] traits;
//! [`OpenSshClient`] implements both on top of the system `ssh` and `scp`
//! binaries. Tests substitute their own implementations.

pub mod openssh;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

pub use openssh::OpenSshClient;

/// Reference to the private key used to reach an infrastructure.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    /// Path of the private key file on the gateway host.
    pub path: PathBuf,
    /// Key passphrase, if the key is encrypted.
    #[serde(default)]
    pub password: Option<String>,
}

impl SshKey {
    /// Creates a reference to an unencrypted key.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            password: None,
        }
    }

    /// Sets the key passphrase.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for SshKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshKey")
            .field("path", &self.path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where and as whom a remote operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub username: String,
    pub key: SshKey,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, username: impl Into<String>, key: SshKey) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            key,
        }
    }

    /// Returns `username@host`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

/// Output of a remote command, right-trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status of the remote command, when one was reported.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stdout: stdout.into().trim_end().to_string(),
            stderr: stderr.into().trim_end().to_string(),
            exit_code,
        }
    }

    /// Output of a command that exited 0 with no stderr.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "", Some(0))
    }
}

/// Runs shell commands on a remote host.
///
/// A non-zero remote exit status is not an error: the command's output is
/// returned and the caller's parser decides. Failing to reach the host is.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn exec(&self, target: &RemoteTarget, command: &str)
        -> Result<CommandOutput, RemoteError>;
}

/// Copies local files to a remote host.
#[async_trait]
pub trait RemoteCopier: Send + Sync {
    async fn put(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_is_right_trimmed() {
        let output = CommandOutput::new("  1763\n\n", "warn\n", Some(0));
        assert_eq!(output.stdout, "  1763");
        assert_eq!(output.stderr, "warn");
    }

    #[test]
    fn test_ssh_key_debug_redacts_password() {
        let key = SshKey::new("/keys/id_rsa").with_password("hunter2");
        let debug = format!("{:?}", key);
        assert!(debug.contains("/keys/id_rsa"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_destination() {
        let target = RemoteTarget::new("hpc.example.org", "alice", SshKey::new("/k"));
        assert_eq!(target.destination(), "alice@hpc.example.org");
    }
}
