//! Scripted capabilities shared by the unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{FetchError, RemoteError};
use crate::fetch::{FetchSource, SourceFetcher};
use crate::infrastructure::InfrastructureRecord;
use crate::remote::{CommandOutput, RemoteCopier, RemoteExecutor, RemoteTarget, SshKey};
use crate::scheduler::SchedulerKind;

pub fn infrastructure(name: &str, scheduler: SchedulerKind) -> InfrastructureRecord {
    InfrastructureRecord::new(
        name,
        "login.hpc.test",
        "alice",
        scheduler,
        SshKey::new("/keys/id_rsa"),
    )
}

/// Answers commands containing a pattern with queued outputs.
///
/// The last queued output of a pattern is repeated once the queue drains.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<Vec<(String, VecDeque<Result<String, String>>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, outputs: &[&str]) -> Self {
        let queue = outputs.iter().map(|o| Ok(o.to_string())).collect();
        self.scripts.lock().unwrap().push((pattern.to_string(), queue));
        self
    }

    pub fn fail_on(self, pattern: &str, reason: &str) -> Self {
        let queue = VecDeque::from([Err(reason.to_string())]);
        self.scripts.lock().unwrap().push((pattern.to_string(), queue));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn exec(
        &self,
        target: &RemoteTarget,
        command: &str,
    ) -> Result<CommandOutput, RemoteError> {
        self.calls.lock().unwrap().push(command.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .iter_mut()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, queue)| queue);

        let next = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match next {
            Some(Ok(stdout)) => Ok(CommandOutput::success(stdout)),
            Some(Err(reason)) => Err(RemoteError::ExecutionFailed {
                host: target.host.clone(),
                reason,
            }),
            None => Ok(CommandOutput::new("", "command not found", Some(127))),
        }
    }
}

/// Records copies; fails every copy when built with `failing`.
#[derive(Default)]
pub struct RecordingCopier {
    fail_with: Option<String>,
    copies: Mutex<Vec<(String, String)>>,
}

impl RecordingCopier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            copies: Mutex::new(Vec::new()),
        }
    }

    /// Returns `(staged file contents, remote path)` per copy.
    pub fn copies(&self) -> Vec<(String, String)> {
        self.copies.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteCopier for RecordingCopier {
    async fn put(
        &self,
        target: &RemoteTarget,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError> {
        if let Some(reason) = &self.fail_with {
            return Err(RemoteError::CopyFailed {
                host: target.host.clone(),
                local: local_path.display().to_string(),
                remote: remote_path.to_string(),
                reason: reason.clone(),
            });
        }
        let contents = std::fs::read_to_string(local_path).unwrap_or_default();
        self.copies
            .lock()
            .unwrap()
            .push((contents, remote_path.to_string()));
        Ok(())
    }
}

/// Writes fixed contents, or fails, for every source.
pub struct StaticFetcher {
    result: Result<String, String>,
}

impl StaticFetcher {
    pub fn serving(contents: &str) -> Self {
        Self {
            result: Ok(contents.to_string()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, source: &FetchSource, destination: &Path) -> Result<u64, FetchError> {
        match &self.result {
            Ok(contents) => {
                tokio::fs::write(destination, contents).await?;
                Ok(contents.len() as u64)
            }
            Err(reason) => Err(FetchError::Http {
                uri: format!("{:?}", source),
                reason: reason.clone(),
            }),
        }
    }
}
