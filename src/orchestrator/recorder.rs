use remarker_common::{History, OutcomeKind, OutcomeRecord, OutcomeSummary, WorkerReply};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{StoreError, TargetFailure};
use crate::store::{self, FAILED_KEY, KeyValueStore, SKIPPED_KEY, SUCCESSFUL_KEY};

/// Detail recorded for a skip reply that carries no message.
pub const DEFAULT_SKIP_DETAIL: &str = "Already commented on";
/// Detail recorded for a failed reply that carries no error.
pub const DEFAULT_FAILURE_DETAIL: &str = "Worker reported failure";

/// How one processed target is recorded and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: OutcomeKind,
    /// Stored in the outcome record: comment text, skip reason, or error.
    pub detail: String,
    /// Surfaced in the progress notification only.
    pub warning: Option<String>,
}

impl Classification {
    /// Classify the result of dispatching `comment` to one target.
    pub fn from_result(result: &Result<WorkerReply, TargetFailure>, comment: &str) -> Self {
        match result {
            Ok(reply) if reply.skipped => Self {
                kind: OutcomeKind::Skipped,
                detail: reply
                    .message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SKIP_DETAIL.to_string()),
                warning: None,
            },
            Ok(reply) if reply.success => Self {
                kind: OutcomeKind::Success,
                detail: comment.to_string(),
                warning: reply.warning.clone(),
            },
            Ok(reply) => Self {
                kind: OutcomeKind::Failed,
                detail: reply
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_DETAIL.to_string()),
                warning: None,
            },
            Err(failure) => Self {
                kind: OutcomeKind::Failed,
                detail: failure.to_string(),
                warning: None,
            },
        }
    }
}

fn key_for(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Success => SUCCESSFUL_KEY,
        OutcomeKind::Skipped => SKIPPED_KEY,
        OutcomeKind::Failed => FAILED_KEY,
    }
}

/// An outcome record not yet written, together with where it goes.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    key: &'static str,
    record: OutcomeRecord,
    limit: usize,
}

impl PendingRecord {
    pub(crate) fn key(&self) -> &'static str {
        self.key
    }

    /// The stored sequence with this record appended and the oldest entries past
    /// the limit dropped.
    pub(crate) fn append_to(&self, current: Option<Value>) -> Result<Value, StoreError> {
        let mut entries: Vec<OutcomeRecord> = match current {
            Some(value) => store::decode(self.key, value)?,
            None => Vec::new(),
        };
        entries.push(self.record.clone());
        if self.limit > 0 && entries.len() > self.limit {
            let excess = entries.len() - self.limit;
            entries.drain(..excess);
        }
        store::encode(self.key, &entries)
    }
}

/// Append-only log of classified outcomes, one sequence per [`OutcomeKind`].
#[derive(Clone)]
pub struct OutcomeRecorder {
    store: Arc<dyn KeyValueStore>,
    /// Maximum entries kept per sequence; `0` keeps everything.
    limit: usize,
}

impl OutcomeRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, limit: 0 }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Build the record for one outcome without writing it.
    ///
    /// The run loop hands it to [`StateManager::commit`](super::StateManager::commit)
    /// so the history line and the advanced cursor land in one store transaction.
    pub fn prepare(&self, kind: OutcomeKind, url: &str, detail: &str) -> PendingRecord {
        PendingRecord {
            key: key_for(kind),
            record: OutcomeRecord::new(kind, url, detail),
            limit: self.limit,
        }
    }

    /// Append one record to the sequence for `kind`.
    pub fn record(
        &self,
        kind: OutcomeKind,
        url: &str,
        detail: &str,
    ) -> Result<OutcomeRecord, StoreError> {
        let pending = self.prepare(kind, url, detail);
        self.store
            .update(pending.key, &mut |current| pending.append_to(current).map(Some))?;
        debug!(%kind, url, "Recorded outcome");
        Ok(pending.record)
    }

    pub fn entries(&self, kind: OutcomeKind) -> Result<Vec<OutcomeRecord>, StoreError> {
        Ok(store::read(self.store.as_ref(), key_for(kind))?.unwrap_or_default())
    }

    pub fn history(&self) -> Result<History, StoreError> {
        Ok(History {
            successful_urls: self.entries(OutcomeKind::Success)?,
            skipped_urls: self.entries(OutcomeKind::Skipped)?,
            failed_urls: self.entries(OutcomeKind::Failed)?,
        })
    }

    pub fn summarize(&self) -> Result<OutcomeSummary, StoreError> {
        Ok(self.history()?.summary())
    }

    /// Empty all three sequences.
    pub fn clear(&self) -> Result<(), StoreError> {
        let empty: Vec<OutcomeRecord> = Vec::new();
        for kind in OutcomeKind::ALL {
            store::write(self.store.as_ref(), key_for(kind), &empty)?;
        }
        debug!("Cleared outcome history");
        Ok(())
    }
}
