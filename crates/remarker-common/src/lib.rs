//! Shared types for the remarker runner.
//!
//! Everything in this crate is plain serde data: the persisted run record, the
//! outcome history, and the messages exchanged with front ends and workers. Field
//! names serialize in camelCase so the JSON matches what a browser-side front end
//! sends and expects.

pub mod history;
pub mod protocol;
pub mod state;

pub use history::{History, OutcomeKind, OutcomeRecord, OutcomeSummary};
pub use protocol::{Notification, Request, Response, StartRequest, WorkerReply, WorkerRequest};
pub use state::{DEFAULT_DELAY_SECONDS, RunState};
