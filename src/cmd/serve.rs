//! JSON-lines control host: `remarker serve`.
//!
//! Each stdin line is one [`Request`]; each reply and every notification is written
//! to stdout as one JSON line. A run left active by an earlier process is resumed on
//! startup. After stdin closes, notifications keep flowing until the current loop
//! ends.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;

use super::super::Cli;
use remarker::config::Config;
use remarker::orchestrator::CommentService;
use remarker_common::{Notification, Request, Response};

const EVENT_BUFFER: usize = 64;

pub async fn cmd_serve(cli: &Cli, project_dir: &Path) -> Result<()> {
    let config = Config::new(project_dir.to_path_buf(), cli.verbose)?;
    config.ensure_directories()?;
    let _log_guard = remarker::logging::init_logging(&config.log_dir, cli.verbose)?;

    let (tx, mut rx) = mpsc::channel::<Notification>(EVENT_BUFFER);
    let orchestrator = config.orchestrator()?.with_event_channel(tx);
    let service = CommentService::new(Arc::new(orchestrator));

    if service.resume()? {
        tracing::info!("Resumed stored run on startup");
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read request")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => service.handle(request),
                    Err(e) => {
                        tracing::warn!(error = %e, "Unparseable request");
                        Response::error(format!("Invalid request: {e}"))
                    }
                };
                write_line(&mut stdout, &response).await?;
            }
            Some(notification) = rx.recv() => {
                write_line(&mut stdout, &notification).await?;
            }
        }
    }

    let wait = service.wait();
    tokio::pin!(wait);
    loop {
        tokio::select! {
            _ = &mut wait => break,
            Some(notification) = rx.recv() => {
                write_line(&mut stdout, &notification).await?;
            }
        }
    }
    while let Ok(notification) = rx.try_recv() {
        write_line(&mut stdout, &notification).await?;
    }

    Ok(())
}

async fn write_line<T: Serialize>(stdout: &mut Stdout, message: &T) -> Result<()> {
    let mut json = serde_json::to_string(message).context("Failed to serialize message")?;
    json.push('\n');
    stdout
        .write_all(json.as_bytes())
        .await
        .context("Failed to write to stdout")?;
    stdout.flush().await.context("Failed to flush stdout")?;
    Ok(())
}
