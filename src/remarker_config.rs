//! Project configuration read from `.remarker/remarker.toml`.
//!
//! Settings are layered file → environment → CLI. Every field has a default, so a
//! missing file or a partial file is valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [run]
//! delay_seconds = 5
//! randomize = false
//!
//! [pacing]
//! settle_ms = 8000
//! dispatch_timeout_ms = 30000
//! jitter_seconds = 0
//!
//! [history]
//! limit = 500
//!
//! [worker]
//! submit_command = "./scripts/post-comment.sh"
//! detect_command = "./scripts/already-commented.sh"
//! command_timeout_secs = 25
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::orchestrator::Timing;
use crate::orchestrator::runner::{MAX_DELAY_SECONDS, MIN_DELAY_SECONDS};

pub const CONFIG_FILE_NAME: &str = "remarker.toml";

/// Defaults applied to runs that do not specify their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default)]
    pub randomize: bool,
}

fn default_delay_seconds() -> u64 {
    remarker_common::DEFAULT_DELAY_SECONDS
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            randomize: false,
        }
    }
}

/// Waits around each target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingSection {
    /// Time given to a freshly opened page before the worker is contacted
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// How long to wait for a worker reply before assuming the comment went out
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Random extra delay between targets, 0..=jitter_seconds
    #[serde(default)]
    pub jitter_seconds: u64,
}

fn default_settle_ms() -> u64 {
    8000
}

fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            jitter_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySection {
    /// Entries kept per outcome list; 0 keeps everything
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    500
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
        }
    }
}

/// Commands that perform the page automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    #[serde(default)]
    pub submit_command: Option<String>,
    #[serde(default)]
    pub detect_command: Option<String>,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_command_timeout_secs() -> u64 {
    25
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            submit_command: None,
            detect_command: None,
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

/// Root configuration structure for remarker.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemarkerToml {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub worker: WorkerSection,
}

impl RemarkerToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse remarker.toml")
    }

    /// Load `<state_dir>/remarker.toml`, or defaults if it does not exist.
    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize remarker.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Submit command, with fallback to `REMARKER_SUBMIT_CMD`.
    pub fn submit_command(&self) -> Option<String> {
        self.worker
            .submit_command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| std::env::var("REMARKER_SUBMIT_CMD").ok())
            .filter(|c| !c.trim().is_empty())
    }

    /// Detect command, with fallback to `REMARKER_DETECT_CMD`.
    pub fn detect_command(&self) -> Option<String> {
        self.worker
            .detect_command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| std::env::var("REMARKER_DETECT_CMD").ok())
            .filter(|c| !c.trim().is_empty())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            settle: Duration::from_millis(self.pacing.settle_ms),
            dispatch_timeout: Duration::from_millis(self.pacing.dispatch_timeout_ms),
            jitter: Duration::from_secs(self.pacing.jitter_seconds),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&self.run.delay_seconds) {
            warnings.push(format!(
                "run.delay_seconds = {} is outside {}..={}; runs without an explicit delay will be rejected",
                self.run.delay_seconds, MIN_DELAY_SECONDS, MAX_DELAY_SECONDS
            ));
        }
        if self.pacing.dispatch_timeout_ms == 0 {
            warnings.push(
                "pacing.dispatch_timeout_ms = 0 treats every target as timed out".to_string(),
            );
        }
        if self.worker.command_timeout_secs == 0 {
            warnings.push("worker.command_timeout_secs = 0 kills every command immediately".to_string());
        }
        if self.submit_command().is_none() {
            warnings.push(
                "No worker.submit_command configured (or REMARKER_SUBMIT_CMD); runs cannot post"
                    .to_string(),
            );
        }

        warnings
    }
}
