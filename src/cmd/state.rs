//! Run inspection and control: `status`, `stop`, `history`, `reset`.
//!
//! These only touch the store, so they work while a run is being driven by another
//! process.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn cmd_status(project_dir: &Path, json: bool) -> Result<()> {
    use remarker::config::Config;
    use remarker_common::RunState;

    let config = Config::new(project_dir.to_path_buf(), false)?;
    // Reading takes the store lock, which would create .remarker/ as a side effect
    let state = if config.is_initialized() {
        config.state_manager().load()?
    } else {
        RunState::default()
    };

    if json {
        let out = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
        println!("{out}");
        return Ok(());
    }

    println!();
    println!("Remarker Run Status");
    println!("===================");
    println!();

    if !config.is_initialized() {
        println!("Project: Not initialized");
        println!();
        println!("Run 'remarker init' to initialize the project.");
        println!();
        return Ok(());
    }

    if state.run_id.is_none() {
        println!("Run:     Idle");
        println!();
        return Ok(());
    }

    let run_status = if state.active {
        style("Active").green().to_string()
    } else {
        style("Stopping").yellow().to_string()
    };
    println!("Run:     {}", run_status);
    if let Some(id) = state.run_id {
        println!("Run ID:  {}", id);
    }
    if let Some(started) = state.started_at {
        println!("Started: {}", started.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Posts:   {}/{} processed", state.cursor, state.total());
    println!(
        "Results: {} commented, {} skipped, {} failed",
        state.success_count, state.skipped_count, state.failed_count
    );
    let mode = if state.multi_comment_mode {
        format!("{} comments", state.comment_pool.len())
    } else {
        "single comment".to_string()
    };
    println!(
        "Mode:    {}{}, {}s delay",
        mode,
        if state.randomize { ", randomized" } else { "" },
        state.delay_seconds
    );
    if let Some(next) = state.current_target() {
        println!("Next:    {}", next);
    }
    println!();

    Ok(())
}

pub fn cmd_stop(project_dir: &Path) -> Result<()> {
    use remarker::config::Config;

    let config = Config::new(project_dir.to_path_buf(), false)?;
    if config.is_initialized() && config.state_manager().stop()? {
        println!("Stop requested. The run ends after the current post.");
    } else {
        println!("No run in progress");
    }
    Ok(())
}

pub fn cmd_history(project_dir: &Path, json: bool, clear: bool) -> Result<()> {
    use remarker::config::Config;
    use remarker_common::OutcomeKind;

    let config = Config::new(project_dir.to_path_buf(), false)?;
    if !config.is_initialized() {
        println!("Project not initialized. Run 'remarker init' first.");
        return Ok(());
    }
    let recorder = config.recorder();

    if clear {
        recorder.clear()?;
        println!("History cleared");
        return Ok(());
    }

    let history = recorder.history()?;
    if json {
        let out =
            serde_json::to_string_pretty(&history).context("Failed to serialize history")?;
        println!("{out}");
        return Ok(());
    }

    if history.is_empty() {
        println!("No history recorded");
        return Ok(());
    }

    for kind in OutcomeKind::ALL {
        let entries = history.entries(kind);
        if entries.is_empty() {
            continue;
        }
        let heading = match kind {
            OutcomeKind::Success => style("Commented").green().bold(),
            OutcomeKind::Skipped => style("Skipped").yellow().bold(),
            OutcomeKind::Failed => style("Failed").red().bold(),
        };
        println!();
        println!("{} ({})", heading, entries.len());
        for record in entries {
            println!(
                "  {}  {}  {}",
                style(record.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
                record.url,
                style(first_line(&record.detail)).dim()
            );
        }
    }

    let summary = history.summary();
    println!();
    println!(
        "Total: {} ({} commented, {} skipped, {} failed)",
        summary.total(),
        summary.successful,
        summary.skipped,
        summary.failed
    );
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

pub fn cmd_reset(project_dir: &Path, force: bool) -> Result<()> {
    use dialoguer::Confirm;
    use remarker::config::Config;

    let config = Config::new(project_dir.to_path_buf(), false)?;

    if !force {
        let confirm = Confirm::new()
            .with_prompt("This will discard the current run. Are you sure?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    config.state_manager().reset()?;
    println!("Reset complete");
    Ok(())
}
