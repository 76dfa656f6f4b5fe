//! The persisted run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::history::OutcomeKind;

/// Pacing delay of an idle record, in seconds.
pub const DEFAULT_DELAY_SECONDS: u64 = 5;

/// State of an in-progress or idle run.
///
/// There is exactly one of these per store. It is replaced wholesale when a run
/// starts, advanced after every target, and reset to [`RunState::default`] when the
/// run completes, is stopped, or aborts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub active: bool,
    #[serde(default)]
    pub targets: Vec<String>,
    /// Index of the next target to process.
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub comment_pool: Vec<String>,
    #[serde(default)]
    pub single_comment: Option<String>,
    #[serde(default)]
    pub multi_comment_mode: bool,
    /// Round-robin pointer into `comment_pool`.
    #[serde(default)]
    pub comment_cursor: usize,
    /// Pool indices already drawn in the current shuffled-bag cycle.
    #[serde(default)]
    pub used_indices: BTreeSet<usize>,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default)]
    pub skipped_count: u32,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    /// Identity of the run owning this record; `None` while idle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

fn default_delay_seconds() -> u64 {
    DEFAULT_DELAY_SECONDS
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            active: false,
            targets: Vec::new(),
            cursor: 0,
            comment_pool: Vec::new(),
            single_comment: None,
            multi_comment_mode: false,
            comment_cursor: 0,
            used_indices: BTreeSet::new(),
            randomize: false,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            skipped_count: 0,
            success_count: 0,
            failed_count: 0,
            run_id: None,
            started_at: None,
        }
    }
}

impl RunState {
    /// True once every target has been visited.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.targets.len()
    }

    /// True when the loop should finalize instead of processing another target.
    pub fn should_finalize(&self) -> bool {
        !self.active || self.is_exhausted()
    }

    /// URL at the cursor, if any remain.
    pub fn current_target(&self) -> Option<&str> {
        self.targets.get(self.cursor).map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.targets.len()
    }

    /// Bump the counter matching `kind`.
    pub fn count(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Success => self.success_count += 1,
            OutcomeKind::Skipped => self.skipped_count += 1,
            OutcomeKind::Failed => self.failed_count += 1,
        }
    }

    /// Whether `other` belongs to the same run as `self`.
    pub fn same_run(&self, other: &RunState) -> bool {
        self.run_id.is_some() && self.run_id == other.run_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle_with_five_second_delay() {
        let state = RunState::default();
        assert!(!state.active);
        assert!(state.targets.is_empty());
        assert_eq!(state.delay_seconds, 5);
        assert!(state.should_finalize());
        assert!(state.current_target().is_none());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let state = RunState {
            active: true,
            targets: vec!["https://example.com/p/1".into()],
            multi_comment_mode: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["multiCommentMode"], true);
        assert_eq!(json["delaySeconds"], 5);
        assert!(json.get("runId").is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let state: RunState = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert_eq!(state, RunState::default());
    }

    #[test]
    fn count_bumps_only_matching_counter() {
        let mut state = RunState::default();
        state.count(OutcomeKind::Skipped);
        state.count(OutcomeKind::Failed);
        state.count(OutcomeKind::Failed);
        assert_eq!(state.success_count, 0);
        assert_eq!(state.skipped_count, 1);
        assert_eq!(state.failed_count, 2);
    }

    #[test]
    fn same_run_requires_matching_ids() {
        let a = RunState {
            run_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let b = RunState {
            run_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(a.same_run(&a.clone()));
        assert!(!a.same_run(&b));
        assert!(!RunState::default().same_run(&RunState::default()));
    }
}
