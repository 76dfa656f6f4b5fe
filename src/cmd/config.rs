//! Configuration view and validation: `remarker config`.

use anyhow::Result;
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: ConfigCommands) -> Result<()> {
    use remarker::config::Config;

    let config = Config::new(project_dir.to_path_buf(), false)?;
    let toml = &config.toml;

    match command {
        ConfigCommands::Show => {
            println!();
            println!("Remarker Configuration");
            println!("======================");
            println!();

            if config.config_file.exists() {
                println!("Config file: {}", config.config_file.display());
            } else {
                println!(
                    "No remarker.toml found at {}, using defaults",
                    config.config_file.display()
                );
            }
            println!();

            println!("[run]");
            println!("  delay_seconds = {}", toml.run.delay_seconds);
            println!("  randomize = {}", toml.run.randomize);
            println!();
            println!("[pacing]");
            println!("  settle_ms = {}", toml.pacing.settle_ms);
            println!("  dispatch_timeout_ms = {}", toml.pacing.dispatch_timeout_ms);
            println!("  jitter_seconds = {}", toml.pacing.jitter_seconds);
            println!();
            println!("[history]");
            println!("  limit = {}", toml.history.limit);
            println!();

            // Effective values include the env fallbacks
            println!("[worker]");
            match toml.submit_command() {
                Some(cmd) => println!("  submit_command = \"{}\"", cmd),
                None => println!("  submit_command = (not set)"),
            }
            match toml.detect_command() {
                Some(cmd) => println!("  detect_command = \"{}\"", cmd),
                None => println!("  detect_command = (not set)"),
            }
            println!(
                "  command_timeout_secs = {}",
                toml.worker.command_timeout_secs
            );
            println!();
        }
        ConfigCommands::Validate => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = toml.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
