//! Page automation through user-supplied shell commands.
//!
//! Both commands run under `sh -c` in the project directory with:
//! - `REMARKER_URL`: the target URL
//! - `REMARKER_COMMENT`: the comment text (also written to stdin for `submit`)
//! - `REMARKER_DELAY_MS`: the pacing hint
//!
//! Detect command: exit 0 = already commented, exit 1 = not yet, anything else is an error.
//!
//! Submit command: a JSON [`WorkerReply`] on stdout wins; otherwise exit 0 = posted,
//! exit 2 = skipped (stdout/stderr as the message), anything else = failed.

use async_trait::async_trait;
use remarker_common::WorkerReply;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::automation::ALREADY_DONE_MESSAGE;
use super::{TargetAutomation, TargetHandle};
use crate::errors::AutomationError;

pub struct CommandAutomation {
    submit_command: String,
    detect_command: Option<String>,
    timeout_secs: u64,
    working_dir: PathBuf,
}

impl CommandAutomation {
    pub fn new(submit_command: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            submit_command: submit_command.into(),
            detect_command: None,
            timeout_secs: 25,
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    pub fn with_detect_command(mut self, command: Option<String>) -> Self {
        self.detect_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Run `command`; `Ok(None)` means it was killed after the timeout.
    async fn run(
        &self,
        command: &str,
        handle: &TargetHandle,
        text: &str,
        delay_hint_ms: u64,
    ) -> Result<Option<Output>, AutomationError> {
        debug!(command, url = %handle.url, "Running automation command");
        let spawn_error = |source| AutomationError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("REMARKER_URL", &handle.url)
            .env("REMARKER_COMMENT", text)
            .env("REMARKER_DELAY_MS", delay_hint_ms.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that never reads stdin closes the pipe early; that is fine.
            let _ = stdin.write_all(text.as_bytes()).await;
        }

        match timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output()).await {
            Ok(output) => output.map(Some).map_err(spawn_error),
            Err(_) => {
                warn!(
                    command,
                    url = %handle.url,
                    secs = self.timeout_secs,
                    "Automation command timed out"
                );
                Ok(None)
            }
        }
    }

    fn failure(&self, command: &str, output: &Output) -> AutomationError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else {
            stdout.trim().to_string()
        };
        AutomationError::CommandFailed {
            command: command.to_string(),
            code: output.status.code().unwrap_or(-1),
            message,
        }
    }
}

fn parse_submit_output(output: &Output) -> Option<WorkerReply> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return None;
    }
    serde_json::from_str(stdout).ok()
}

#[async_trait]
impl TargetAutomation for CommandAutomation {
    async fn detect_already_done(&self, handle: &TargetHandle) -> Result<bool, AutomationError> {
        let Some(command) = self.detect_command.as_deref() else {
            return Ok(false);
        };
        let output = self
            .run(command, handle, "", 0)
            .await?
            .ok_or_else(|| AutomationError::TimedOut {
                command: command.to_string(),
                secs: self.timeout_secs,
            })?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(self.failure(command, &output)),
        }
    }

    async fn submit(
        &self,
        handle: &TargetHandle,
        text: &str,
        delay_hint_ms: u64,
    ) -> Result<WorkerReply, AutomationError> {
        let command = self.submit_command.as_str();
        let Some(output) = self.run(command, handle, text, delay_hint_ms).await? else {
            // Submission already started; the comment most likely went through.
            return Ok(WorkerReply::timed_out());
        };

        if let Some(reply) = parse_submit_output(&output) {
            return Ok(reply);
        }

        match output.status.code() {
            Some(0) => Ok(WorkerReply::done()),
            Some(2) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = [stdout.trim(), stderr.trim()]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or(ALREADY_DONE_MESSAGE);
                Ok(WorkerReply::skipped(message))
            }
            _ => Err(self.failure(command, &output)),
        }
    }
}
