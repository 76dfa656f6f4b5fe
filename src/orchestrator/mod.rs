//! The run orchestrator and the pieces it is built from.

pub mod dispatcher;
pub mod recorder;
pub mod runner;
pub mod selector;
pub mod service;
pub mod state;

pub use dispatcher::TaskDispatcher;
pub use recorder::{Classification, OutcomeRecorder};
pub use runner::{Orchestrator, RunEnd, Timing};
pub use selector::{SelectionStrategy, select_next};
pub use service::CommentService;
pub use state::{Commit, StateManager};
