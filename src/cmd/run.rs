//! Foreground runs: `remarker run` and `remarker resume`.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use super::super::Cli;
use remarker::config::Config;
use remarker::orchestrator::{Orchestrator, RunEnd};
use remarker_common::{Notification, RunState, StartRequest};

/// Buffered notifications between the loop and the renderer.
const EVENT_BUFFER: usize = 64;

pub struct RunArgs {
    pub targets: PathBuf,
    pub comments: PathBuf,
    pub multi: bool,
    pub randomize: bool,
    pub delay: Option<u64>,
}

fn check_run_prerequisites(config: &Config) -> Result<()> {
    if !config.is_initialized() {
        bail!("Project not initialized. Run 'remarker init' first.");
    }
    Ok(())
}

pub async fn cmd_run(cli: &Cli, project_dir: &Path, args: RunArgs) -> Result<()> {
    use remarker::input::{parse_comments, parse_targets};

    let config = Config::new(project_dir.to_path_buf(), cli.verbose)?;
    check_run_prerequisites(&config)?;
    config.ensure_directories()?;
    let _log_guard = remarker::logging::init_logging(&config.log_dir, cli.verbose)?;

    let targets_text = std::fs::read_to_string(&args.targets)
        .with_context(|| format!("Failed to read targets file: {}", args.targets.display()))?;
    let comments_text = std::fs::read_to_string(&args.comments).with_context(|| {
        format!("Failed to read comments file: {}", args.comments.display())
    })?;

    let request = StartRequest {
        targets: parse_targets(&targets_text),
        comment: (!args.multi).then(|| comments_text.trim().to_string()),
        comments: if args.multi {
            parse_comments(&comments_text)
        } else {
            Vec::new()
        },
        multi_comment_mode: args.multi,
        delay_seconds: args.delay,
        randomize: args.randomize || config.toml.run.randomize,
    };

    let (tx, rx) = tokio::sync::mpsc::channel(EVENT_BUFFER);
    let orchestrator = config.orchestrator()?.with_event_channel(tx);
    let state = orchestrator.start(request)?;

    drive(&config, orchestrator, state, rx).await
}

pub async fn cmd_resume(cli: &Cli, project_dir: &Path) -> Result<()> {
    let config = Config::new(project_dir.to_path_buf(), cli.verbose)?;
    check_run_prerequisites(&config)?;
    let _log_guard = remarker::logging::init_logging(&config.log_dir, cli.verbose)?;

    let (tx, rx) = tokio::sync::mpsc::channel(EVENT_BUFFER);
    let orchestrator = config.orchestrator()?.with_event_channel(tx);
    if !orchestrator.is_resumable()? {
        println!("No run to resume");
        return Ok(());
    }
    let state = orchestrator.snapshot()?;
    println!(
        "Resuming at post {}/{}",
        (state.cursor + 1).min(state.total()),
        state.total()
    );

    drive(&config, orchestrator, state, rx).await
}

/// Run the loop in the foreground, rendering notifications until it ends.
///
/// Ctrl-C requests a cooperative stop instead of killing the process, so the
/// current post finishes and the summary is still printed.
async fn drive(
    config: &Config,
    orchestrator: Orchestrator,
    state: RunState,
    mut rx: tokio::sync::mpsc::Receiver<Notification>,
) -> Result<()> {
    use remarker::ui::RunUI;

    let ui = RunUI::new(state.total() as u64, config.verbose);
    ui.print_header(&state);
    let renderer = tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            ui.handle(&notification);
        }
    });

    let state_manager = orchestrator.state().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, requesting stop");
            state_manager.stop().ok();
        }
    });

    let end = orchestrator.run().await;
    interrupt.abort();
    // Dropping the orchestrator closes the event channel and ends the renderer.
    drop(orchestrator);
    renderer.await.ok();

    match end {
        RunEnd::Completed | RunEnd::Stopped | RunEnd::Idle => Ok(()),
        RunEnd::Superseded => {
            println!("Another run replaced this one; it continues in its own process.");
            Ok(())
        }
        RunEnd::Aborted => bail!("Run aborted; see {}", config.relative(&config.log_dir).display()),
    }
}
