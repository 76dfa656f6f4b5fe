use rand::RngExt;
use remarker_common::{
    History, Notification, OutcomeKind, RunState, StartRequest, WorkerReply,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatcher::TaskDispatcher;
use super::recorder::{Classification, OutcomeRecorder};
use super::selector::select_next;
use super::state::{Commit, StateManager};
use crate::errors::{RunError, TargetFailure, ValidationError};
use crate::store::KeyValueStore;
use crate::worker::{TargetSurface, WorkerChannel};

pub const MIN_DELAY_SECONDS: u64 = 1;
pub const MAX_DELAY_SECONDS: u64 = 3600;

/// Fixed waits around each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after opening a target before talking to its worker.
    pub settle: Duration,
    /// Upper bound on the wait for a worker reply.
    pub dispatch_timeout: Duration,
    /// Extra random pacing on top of the run's delay, drawn from `0..=jitter`.
    pub jitter: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(8000),
            dispatch_timeout: Duration::from_millis(30_000),
            jitter: Duration::ZERO,
        }
    }
}

/// How a call to [`Orchestrator::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Every target was processed.
    Completed,
    /// A stop was requested before the last target.
    Stopped,
    /// Another run took over the stored record; this loop wrote nothing more.
    Superseded,
    /// There was no run to drive.
    Idle,
    /// The loop hit a fatal error and reset the stored record.
    Aborted,
}

enum Step {
    Continue(Duration),
    Finished(RunEnd),
}

/// Drives a run from the stored [`RunState`], one target at a time.
pub struct Orchestrator {
    state: StateManager,
    recorder: OutcomeRecorder,
    dispatcher: TaskDispatcher,
    surface: Arc<dyn TargetSurface>,
    timing: Timing,
    default_delay: u64,
    event_tx: Option<mpsc::Sender<Notification>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        surface: Arc<dyn TargetSurface>,
        channel: Arc<dyn WorkerChannel>,
    ) -> Self {
        Self {
            state: StateManager::new(store.clone()),
            recorder: OutcomeRecorder::new(store),
            dispatcher: TaskDispatcher::new(channel),
            surface,
            timing: Timing::default(),
            default_delay: remarker_common::DEFAULT_DELAY_SECONDS,
            event_tx: None,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.recorder = self.recorder.with_limit(limit);
        self
    }

    /// Delay used when a start request does not carry one.
    pub fn with_default_delay(mut self, seconds: u64) -> Self {
        self.default_delay = seconds;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::Sender<Notification>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn recorder(&self) -> &OutcomeRecorder {
        &self.recorder
    }

    pub fn snapshot(&self) -> Result<RunState, RunError> {
        Ok(self.state.load()?)
    }

    pub fn history(&self) -> Result<History, RunError> {
        Ok(self.recorder.history()?)
    }

    pub fn clear_history(&self) -> Result<(), RunError> {
        Ok(self.recorder.clear()?)
    }

    /// Validate `request` and persist a fresh active run.
    ///
    /// Any run already in progress is replaced; its loop retires at its next commit.
    /// The caller is responsible for driving the new run with [`Orchestrator::run`].
    pub fn start(&self, request: StartRequest) -> Result<RunState, RunError> {
        let state = self.build_run(request)?;
        self.state.save(&state)?;
        info!(
            run_id = ?state.run_id,
            targets = state.total(),
            multi = state.multi_comment_mode,
            randomize = state.randomize,
            delay = state.delay_seconds,
            "Run started"
        );
        Ok(state)
    }

    fn build_run(&self, request: StartRequest) -> Result<RunState, ValidationError> {
        let targets: Vec<String> = request
            .targets
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        if targets.is_empty() {
            return Err(ValidationError::NoTargets);
        }

        let single_comment = request
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let comment_pool: Vec<String> = request
            .comments
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        let has_text = if request.multi_comment_mode {
            !comment_pool.is_empty()
        } else {
            single_comment.is_some()
        };
        if !has_text {
            return Err(ValidationError::NoComments);
        }

        let delay = request.delay_seconds.unwrap_or(self.default_delay);
        if !(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&delay) {
            return Err(ValidationError::DelayOutOfRange {
                delay,
                min: MIN_DELAY_SECONDS,
                max: MAX_DELAY_SECONDS,
            });
        }

        Ok(RunState {
            active: true,
            targets,
            single_comment,
            comment_pool,
            multi_comment_mode: request.multi_comment_mode,
            randomize: request.randomize,
            delay_seconds: delay,
            run_id: Some(Uuid::new_v4()),
            started_at: Some(chrono::Utc::now()),
            ..Default::default()
        })
    }

    /// Request a cooperative stop. Returns `false` when nothing was running.
    pub fn stop(&self) -> Result<bool, RunError> {
        let stopped = self.state.stop()?;
        if stopped {
            info!("Stop requested");
        } else {
            debug!("Stop requested while idle");
        }
        Ok(stopped)
    }

    /// Whether the stored record holds a run a loop should pick up.
    pub fn is_resumable(&self) -> Result<bool, RunError> {
        let state = self.state.load()?;
        Ok(state.run_id.is_some())
    }

    /// Drive the stored run until it completes, is stopped, superseded, or fails.
    pub async fn run(&self) -> RunEnd {
        let mut owner: Option<Uuid> = None;
        loop {
            match self.step(&mut owner).await {
                Ok(Step::Continue(pause)) => {
                    if !pause.is_zero() {
                        debug!(secs = pause.as_secs_f64(), "Pacing");
                        sleep(pause).await;
                    }
                }
                Ok(Step::Finished(end)) => return end,
                Err(e) => {
                    self.abort(e).await;
                    return RunEnd::Aborted;
                }
            }
        }
    }

    async fn step(&self, owner: &mut Option<Uuid>) -> Result<Step, RunError> {
        let mut state = self.state.load()?;
        check_state(&state)?;

        match *owner {
            None if state.run_id.is_none() => return Ok(Step::Finished(RunEnd::Idle)),
            None => *owner = state.run_id,
            Some(id) if state.run_id != Some(id) => {
                info!(run_id = %id, "Run superseded, retiring loop");
                return Ok(Step::Finished(RunEnd::Superseded));
            }
            Some(_) => {}
        }

        if state.should_finalize() {
            return self.finalize(&state).await.map(Step::Finished);
        }

        let index = state.cursor + 1;
        let total = state.total();
        let url = state.current_target().unwrap_or_default().to_string();
        info!(index, total, url = %url, "Processing target");

        let (result, comment) = self.process_target(&mut state, &url).await;
        let comment = comment.unwrap_or_default();
        let outcome = Classification::from_result(&result, &comment);

        let pending = self.recorder.prepare(outcome.kind, &url, &outcome.detail);
        state.count(outcome.kind);
        state.cursor += 1;

        let state = match self.state.commit(&state, Some(&pending))? {
            Commit::Written(stored) => stored,
            Commit::Superseded => {
                info!(url = %url, "Run superseded, retiring loop");
                return Ok(Step::Finished(RunEnd::Superseded));
            }
        };

        match outcome.kind {
            OutcomeKind::Success => info!(index, url = %url, "Comment posted"),
            OutcomeKind::Skipped => info!(index, url = %url, reason = %outcome.detail, "Target skipped"),
            OutcomeKind::Failed => warn!(index, url = %url, error = %outcome.detail, "Target failed"),
        }
        self.notify(progress_notification(&state, index, &url, &comment, outcome))
            .await;

        if !state.active {
            return Ok(Step::Continue(Duration::ZERO));
        }
        Ok(Step::Continue(self.pacing(state.delay_seconds)))
    }

    /// Open the target, hand it to the worker, and return the reply together with
    /// the comment that was sent (if it got that far).
    async fn process_target(
        &self,
        state: &mut RunState,
        url: &str,
    ) -> (Result<WorkerReply, TargetFailure>, Option<String>) {
        let handle = match self.surface.acquire(url).await {
            Ok(handle) => handle,
            Err(e) => return (Err(e.into()), None),
        };

        sleep(self.timing.settle).await;
        if let Err(e) = self.surface.ensure_alive(&handle).await {
            return (Err(e.into()), None);
        }

        let comment = pick_comment(state);
        let result = self
            .dispatcher
            .dispatch(
                &handle,
                &comment,
                Duration::from_secs(state.delay_seconds),
                self.timing.dispatch_timeout,
            )
            .await
            .map_err(TargetFailure::from);
        (result, Some(comment))
    }

    async fn finalize(&self, state: &RunState) -> Result<RunEnd, RunError> {
        if !self.state.finish(state)? {
            return Ok(RunEnd::Superseded);
        }

        // A stop that lands while the last target is processed changes nothing.
        let stopped = !state.active && !state.is_exhausted();
        let message = completion_message(state, stopped);
        info!(
            run_id = ?state.run_id,
            successful = state.success_count,
            skipped = state.skipped_count,
            failed = state.failed_count,
            stopped,
            "Run finished"
        );
        self.notify(Notification::CommentingComplete {
            message,
            success_count: state.success_count,
            skipped_count: state.skipped_count,
            failed_count: state.failed_count,
            stopped,
        })
        .await;

        Ok(if stopped {
            RunEnd::Stopped
        } else {
            RunEnd::Completed
        })
    }

    async fn abort(&self, err: RunError) {
        error!(error = %err, "Run aborted");
        if let Err(e) = self.state.reset() {
            error!(error = %e, "Failed to reset run state after fatal error");
        }
        self.notify(Notification::CommentError {
            current_index: None,
            url: None,
            error: format!("Fatal error: {err}"),
            fatal: true,
        })
        .await;
    }

    fn pacing(&self, delay_seconds: u64) -> Duration {
        let base = Duration::from_secs(delay_seconds);
        let jitter_ms = self.timing.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    async fn notify(&self, notification: Notification) {
        if let Some(ref tx) = self.event_tx {
            tx.send(notification).await.ok();
        }
    }
}

fn pick_comment(state: &mut RunState) -> String {
    select_next(state, &mut rand::rng())
}

fn check_state(state: &RunState) -> Result<(), RunError> {
    if state.cursor > state.targets.len() {
        return Err(RunError::MalformedState(format!(
            "cursor {} is past the {} stored targets",
            state.cursor,
            state.targets.len()
        )));
    }
    if state.active && state.run_id.is_none() {
        return Err(RunError::MalformedState(
            "active run has no run id".to_string(),
        ));
    }
    Ok(())
}

fn completion_message(state: &RunState, stopped: bool) -> String {
    if stopped {
        "Commenting process was stopped.".to_string()
    } else if state.skipped_count > 0 {
        format!(
            "Commenting completed. {} posts were commented on successfully, {} posts were skipped (already commented on).",
            state.success_count, state.skipped_count
        )
    } else {
        "Commenting process finished successfully.".to_string()
    }
}

fn progress_notification(
    state: &RunState,
    index: usize,
    url: &str,
    comment: &str,
    outcome: Classification,
) -> Notification {
    match outcome.kind {
        OutcomeKind::Success => Notification::CommentProgress {
            current_index: index,
            total_posts: state.total(),
            url: url.to_string(),
            success: true,
            warning: outcome.warning,
            used_comment: comment.to_string(),
            success_count: state.success_count,
            skipped_count: state.skipped_count,
            failed_count: state.failed_count,
        },
        OutcomeKind::Skipped => Notification::CommentSkipped {
            current_index: index,
            total_posts: state.total(),
            url: url.to_string(),
            message: outcome.detail,
            skipped_count: state.skipped_count,
        },
        OutcomeKind::Failed => Notification::CommentError {
            current_index: Some(index),
            url: Some(url.to_string()),
            error: format!("Error on post {index}: {}", outcome.detail),
            fatal: false,
        },
    }
}
