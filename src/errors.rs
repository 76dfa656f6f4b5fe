//! Typed error hierarchy for the runner.
//!
//! The split mirrors how failures are handled:
//! - `ValidationError`: a start request rejected before any state is written
//! - `SurfaceError` / `ChannelError`: one target failed; recorded, run continues
//! - `AutomationError`: raised inside a worker, turned into a failed reply
//! - `StoreError` / `RunError`: the loop itself broke; the run aborts

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the durable key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store document at {path} is malformed: {source}")]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored value under '{key}' is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Update returned {got} values for {expected} keys")]
    UpdateShape { expected: usize, got: usize },
}

/// A start request that cannot become a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter at least one post URL")]
    NoTargets,

    #[error("Please enter comment text")]
    NoComments,

    #[error("Delay must be between {min} and {max} seconds, got {delay}")]
    DelayOutOfRange { delay: u64, min: u64, max: u64 },
}

/// Failure to obtain or keep a page to work on.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Could not open {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Tab no longer exists")]
    Closed,
}

/// Delivery failure on the worker channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    Disconnected,
}

/// Failure inside a page automation step.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}: {message}")]
    CommandFailed {
        command: String,
        code: i32,
        message: String,
    },

    #[error("'{command}' timed out after {secs} seconds")]
    TimedOut { command: String, secs: u64 },
}

/// Anything that ends a single target as failed.
#[derive(Debug, Error)]
pub enum TargetFailure {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed run state: {0}")]
    MalformedState(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
