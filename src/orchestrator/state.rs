use remarker_common::RunState;
use std::sync::Arc;
use tracing::debug;

use super::recorder::PendingRecord;
use crate::errors::StoreError;
use crate::store::{self, KeyValueStore, STATE_KEY};

/// Result of writing a loop step's changes back to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Changes were written; holds the record as stored.
    Written(RunState),
    /// The stored record belongs to another run (or was reset); nothing was written.
    Superseded,
}

/// Durable access to the single [`RunState`] record.
///
/// The loop never trusts an in-memory copy across suspension points: it calls
/// [`StateManager::load`] at the top of every step and [`StateManager::commit`] at
/// the end, so a stop written in between is preserved.
#[derive(Clone)]
pub struct StateManager {
    store: Arc<dyn KeyValueStore>,
}

impl StateManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the stored record, or the idle default if none was ever written.
    pub fn load(&self) -> Result<RunState, StoreError> {
        Ok(store::read(self.store.as_ref(), STATE_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, state: &RunState) -> Result<(), StoreError> {
        debug!(
            active = state.active,
            cursor = state.cursor,
            total = state.total(),
            "Saving run state"
        );
        store::write(self.store.as_ref(), STATE_KEY, state)
    }

    /// Replace the record with idle defaults.
    pub fn reset(&self) -> Result<(), StoreError> {
        debug!("Resetting run state");
        self.save(&RunState::default())
    }

    /// Clear the `active` flag of a running record.
    ///
    /// Returns `false` without writing anything when no run is active.
    pub fn stop(&self) -> Result<bool, StoreError> {
        let mut stopped = false;
        self.store.update(STATE_KEY, &mut |current| {
            let Some(value) = current else {
                return Ok(None);
            };
            let mut state: RunState = store::decode(STATE_KEY, value)?;
            if !state.active {
                return Ok(None);
            }
            state.active = false;
            stopped = true;
            store::encode(STATE_KEY, &state).map(Some)
        })?;
        Ok(stopped)
    }

    /// Write `local` back, keeping a stop that landed since it was loaded.
    ///
    /// The stored `active` flag wins over the local one. If the stored record is no
    /// longer the same run, the state is left alone. `outcome`, when given, is
    /// appended to the history in the same store transaction, so the cursor never
    /// advances without its history line or the other way round.
    pub fn commit(
        &self,
        local: &RunState,
        outcome: Option<&PendingRecord>,
    ) -> Result<Commit, StoreError> {
        let mut result = Commit::Superseded;
        let mut keys = vec![STATE_KEY];
        if let Some(pending) = outcome {
            keys.push(pending.key());
        }
        self.store.update_many(&keys, &mut |mut values| {
            let history = match outcome {
                Some(pending) => Some(pending.append_to(values.pop().flatten())?),
                None => None,
            };
            let stored: RunState = match values.pop().flatten() {
                Some(value) => store::decode(STATE_KEY, value)?,
                None => RunState::default(),
            };

            let state = if stored.same_run(local) {
                let mut merged = local.clone();
                merged.active = stored.active && local.active;
                let encoded = store::encode(STATE_KEY, &merged)?;
                result = Commit::Written(merged);
                Some(encoded)
            } else {
                None
            };

            let mut updates = vec![state];
            if outcome.is_some() {
                updates.push(history);
            }
            Ok(updates)
        })?;
        Ok(result)
    }

    /// Reset to idle defaults if the stored record still belongs to `local`'s run.
    ///
    /// Returns `false` without writing when another run owns the record.
    pub fn finish(&self, local: &RunState) -> Result<bool, StoreError> {
        let mut finished = false;
        self.store.update(STATE_KEY, &mut |current| {
            let Some(value) = current else {
                return Ok(None);
            };
            let stored: RunState = store::decode(STATE_KEY, value)?;
            if !stored.same_run(local) {
                return Ok(None);
            }
            finished = true;
            store::encode(STATE_KEY, &RunState::default()).map(Some)
        })?;
        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OutcomeRecorder;
    use crate::store::{JsonFileStore, MemoryStore};
    use remarker_common::OutcomeKind;
    use std::collections::BTreeSet;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn running_state() -> RunState {
        RunState {
            active: true,
            targets: vec!["u1".into(), "u2".into(), "u3".into()],
            cursor: 1,
            comment_pool: vec!["a".into(), "b".into(), "c".into()],
            multi_comment_mode: true,
            comment_cursor: 2,
            used_indices: BTreeSet::from([0, 2]),
            randomize: true,
            delay_seconds: 9,
            skipped_count: 1,
            success_count: 0,
            failed_count: 0,
            run_id: Some(Uuid::new_v4()),
            started_at: Some(chrono::Utc::now()),
            ..Default::default()
        }
    }

    fn make_manager() -> (StateManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (StateManager::new(store.clone()), store)
    }

    #[test]
    fn load_without_record_is_idle_default() {
        let (mgr, _store) = make_manager();
        assert_eq!(mgr.load().unwrap(), RunState::default());
    }

    #[test]
    fn save_then_load_is_deep_equal() {
        let (mgr, _store) = make_manager();
        let state = running_state();
        mgr.save(&state).unwrap();
        assert_eq!(mgr.load().unwrap(), state);
    }

    #[test]
    fn round_trip_survives_restart_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let state = running_state();
        {
            let mgr = StateManager::new(Arc::new(JsonFileStore::new(path.clone())));
            mgr.save(&state).unwrap();
        }
        {
            let mgr = StateManager::new(Arc::new(JsonFileStore::new(path)));
            assert_eq!(mgr.load().unwrap(), state);
        }
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let (mgr, store) = make_manager();
        assert!(!mgr.stop().unwrap());
        assert!(store.get(STATE_KEY).unwrap().is_none());

        mgr.reset().unwrap();
        let before = store.get(STATE_KEY).unwrap();
        assert!(!mgr.stop().unwrap());
        assert_eq!(store.get(STATE_KEY).unwrap(), before);
    }

    #[test]
    fn stop_clears_active_and_keeps_progress() {
        let (mgr, _store) = make_manager();
        let state = running_state();
        mgr.save(&state).unwrap();
        assert!(mgr.stop().unwrap());
        let stored = mgr.load().unwrap();
        assert!(!stored.active);
        assert_eq!(stored.cursor, state.cursor);
        assert_eq!(stored.targets, state.targets);
    }

    #[test]
    fn commit_keeps_concurrent_stop() {
        let (mgr, _store) = make_manager();
        let mut local = running_state();
        mgr.save(&local).unwrap();
        mgr.stop().unwrap();

        local.cursor = 2;
        local.success_count = 1;
        let Commit::Written(stored) = mgr.commit(&local, None).unwrap() else {
            panic!("Expected Written");
        };
        assert!(!stored.active);
        assert_eq!(stored.cursor, 2);
        assert_eq!(mgr.load().unwrap(), stored);
    }

    #[test]
    fn commit_against_other_run_writes_nothing() {
        let (mgr, _store) = make_manager();
        let local = running_state();
        let replacement = running_state();
        mgr.save(&replacement).unwrap();

        assert_eq!(mgr.commit(&local, None).unwrap(), Commit::Superseded);
        assert_eq!(mgr.load().unwrap(), replacement);
    }

    #[test]
    fn finish_resets_only_own_run() {
        let (mgr, _store) = make_manager();
        let mine = running_state();
        let theirs = running_state();

        mgr.save(&theirs).unwrap();
        assert!(!mgr.finish(&mine).unwrap());
        assert_eq!(mgr.load().unwrap(), theirs);

        mgr.save(&mine).unwrap();
        assert!(mgr.finish(&mine).unwrap());
        assert_eq!(mgr.load().unwrap(), RunState::default());
    }

    #[test]
    fn commit_writes_outcome_with_state() {
        let (mgr, store) = make_manager();
        let recorder = OutcomeRecorder::new(store);
        let mut local = running_state();
        mgr.save(&local).unwrap();

        local.cursor = 2;
        local.success_count = 1;
        let pending = recorder.prepare(OutcomeKind::Success, "u2", "b");
        assert!(matches!(
            mgr.commit(&local, Some(&pending)).unwrap(),
            Commit::Written(_)
        ));

        assert_eq!(mgr.load().unwrap().cursor, 2);
        let entries = recorder.entries(OutcomeKind::Success).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "u2");
    }

    #[test]
    fn superseded_commit_still_records_outcome() {
        let (mgr, store) = make_manager();
        let recorder = OutcomeRecorder::new(store);
        let replacement = running_state();
        mgr.save(&replacement).unwrap();

        let pending = recorder.prepare(OutcomeKind::Failed, "u1", "boom");
        assert_eq!(
            mgr.commit(&running_state(), Some(&pending)).unwrap(),
            Commit::Superseded
        );
        assert_eq!(mgr.load().unwrap(), replacement);
        assert_eq!(recorder.entries(OutcomeKind::Failed).unwrap().len(), 1);
    }

    #[test]
    fn commit_after_reset_writes_nothing() {
        let (mgr, _store) = make_manager();
        let local = running_state();
        mgr.save(&local).unwrap();
        mgr.reset().unwrap();
        assert_eq!(mgr.commit(&local, None).unwrap(), Commit::Superseded);
        assert_eq!(mgr.load().unwrap(), RunState::default());
    }
}
