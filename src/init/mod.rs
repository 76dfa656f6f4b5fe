//! Initialization module for remarker projects.
//!
//! `remarker init` creates the `.remarker/` directory in a project:
//!
//! ```text
//! .remarker/
//! ├── remarker.toml    # Project configuration (written with defaults)
//! ├── store.json       # Run state and outcome history (created on first write)
//! └── logs/            # Daily rolling log files
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::STATE_DIR_NAME;
use crate::remarker_config::{CONFIG_FILE_NAME, RemarkerToml};

/// Result of initializing a remarker project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .remarker directory
    pub state_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Whether a default remarker.toml was written
    pub wrote_config: bool,
}

/// Initialize a remarker project in the given directory.
///
/// Existing configuration is never overwritten; a partially created directory is
/// completed.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let state_dir = project_dir.join(STATE_DIR_NAME);
    let created = !state_dir.exists();

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create directory: {}", state_dir.display()))?;

    let logs_dir = state_dir.join("logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create logs directory: {}", logs_dir.display()))?;

    let config_file = state_dir.join(CONFIG_FILE_NAME);
    let wrote_config = if config_file.exists() {
        false
    } else {
        RemarkerToml::default().save(&config_file)?;
        true
    };

    Ok(InitResult {
        state_dir,
        created,
        wrote_config,
    })
}

/// Check if a project has been initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(STATE_DIR_NAME).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_directory_and_config() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();

        assert!(result.created);
        assert!(result.wrote_config);
        assert!(result.state_dir.is_dir());
        assert!(result.state_dir.join("logs").is_dir());

        let config = RemarkerToml::load(&result.state_dir.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.run.delay_seconds, 5);
        assert_eq!(config.history.limit, 500);
    }

    #[test]
    fn init_twice_keeps_existing_config() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let config_file = dir.path().join(STATE_DIR_NAME).join(CONFIG_FILE_NAME);
        std::fs::write(&config_file, "[run]\ndelay_seconds = 42\n").unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(!result.wrote_config);
        let config = RemarkerToml::load(&config_file).unwrap();
        assert_eq!(config.run.delay_seconds, 42);
    }

    #[test]
    fn init_completes_partial_directory() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR_NAME)).unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(result.wrote_config);
        assert!(result.state_dir.join("logs").is_dir());
    }

    #[test]
    fn is_initialized_follows_init() {
        let dir = tempdir().unwrap();
        assert!(!is_initialized(dir.path()));
        init_project(dir.path()).unwrap();
        assert!(is_initialized(dir.path()));
    }
}
