use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::orchestrator::{Orchestrator, OutcomeRecorder, StateManager};
use crate::remarker_config::{CONFIG_FILE_NAME, RemarkerToml};
use crate::store::JsonFileStore;
use crate::worker::{AutomationWorker, CommandAutomation, DirectSurface};

pub const STATE_DIR_NAME: &str = ".remarker";

/// Runtime configuration for remarker.
///
/// Bridges `remarker.toml` with the paths the runner needs and knows how to wire a
/// file-backed [`Orchestrator`] for the project.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub state_dir: PathBuf,
    pub config_file: PathBuf,
    pub store_file: PathBuf,
    pub log_dir: PathBuf,
    pub verbose: bool,
    pub toml: RemarkerToml,
}

impl Config {
    pub fn new(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let state_dir = project_dir.join(STATE_DIR_NAME);
        let toml = RemarkerToml::load_or_default(&state_dir)?;

        Ok(Self {
            config_file: state_dir.join(CONFIG_FILE_NAME),
            store_file: state_dir.join("store.json"),
            log_dir: state_dir.join("logs"),
            project_dir,
            state_dir,
            verbose,
            toml,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).context("Failed to create .remarker directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir()
    }

    pub fn store(&self) -> Arc<JsonFileStore> {
        Arc::new(JsonFileStore::new(self.store_file.clone()))
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(self.store())
    }

    pub fn recorder(&self) -> OutcomeRecorder {
        OutcomeRecorder::new(self.store()).with_limit(self.toml.history.limit)
    }

    /// An orchestrator backed by the project's store and command automation.
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let submit = self.toml.submit_command().ok_or_else(|| {
            anyhow!(
                "No submit command configured. Set worker.submit_command in {} or REMARKER_SUBMIT_CMD",
                self.relative(&self.config_file).display()
            )
        })?;
        let automation = CommandAutomation::new(submit, &self.project_dir)
            .with_detect_command(self.toml.detect_command())
            .with_timeout_secs(self.toml.worker.command_timeout_secs);

        Ok(Orchestrator::new(
            self.store(),
            Arc::new(DirectSurface::new()),
            Arc::new(AutomationWorker::new(automation)),
        )
        .with_timing(self.toml.timing())
        .with_history_limit(self.toml.history.limit)
        .with_default_delay(self.toml.run.delay_seconds))
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.project_dir).unwrap_or(path)
    }
}
