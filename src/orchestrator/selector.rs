//! Comment selection.
//!
//! Four strategies sit behind [`select_next`]:
//!
//! | Mode                      | `randomize = false` | `randomize = true` |
//! |---------------------------|---------------------|--------------------|
//! | single comment            | `Single`            | `Decorated`        |
//! | comment pool (non-empty)  | `RoundRobin`        | `ShuffledBag`      |
//!
//! A pool-mode run with an empty pool degrades to `Single`. Selection only touches
//! the bookkeeping fields of [`RunState`] (`comment_cursor`, `used_indices`).

use rand::RngExt;
use remarker_common::RunState;

/// Cosmetic (prefix, suffix) pairs applied by the `Decorated` strategy.
pub const DECORATIONS: [(&str, &str); 7] = [
    ("", " 👍"),
    ("✨ ", ""),
    ("", " 🔥"),
    ("Interesting: ", ""),
    ("", " 😊"),
    ("Great! ", ""),
    ("", " ⭐️"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// The single comment, untouched.
    Single,
    /// The single comment wrapped in one random decoration.
    Decorated,
    /// Pool entries in order, wrapping around.
    RoundRobin,
    /// Random pool entries without repeats until the pool is used up.
    ShuffledBag,
}

impl SelectionStrategy {
    pub fn for_state(state: &RunState) -> Self {
        if state.multi_comment_mode {
            if state.comment_pool.is_empty() {
                Self::Single
            } else if state.randomize {
                Self::ShuffledBag
            } else {
                Self::RoundRobin
            }
        } else if state.randomize {
            Self::Decorated
        } else {
            Self::Single
        }
    }

    pub fn select<R: RngExt>(self, state: &mut RunState, rng: &mut R) -> String {
        match self {
            Self::Single => single(state),
            Self::Decorated => decorate(&single(state), rng),
            Self::RoundRobin => round_robin(state),
            Self::ShuffledBag => shuffled_bag(state, rng),
        }
    }
}

/// Pick the comment for the next target and advance the selection bookkeeping.
pub fn select_next<R: RngExt>(state: &mut RunState, rng: &mut R) -> String {
    SelectionStrategy::for_state(state).select(state, rng)
}

fn single(state: &RunState) -> String {
    state.single_comment.clone().unwrap_or_default()
}

fn decorate<R: RngExt>(comment: &str, rng: &mut R) -> String {
    let (prefix, suffix) = DECORATIONS[rng.random_range(0..DECORATIONS.len())];
    format!("{prefix}{comment}{suffix}")
}

fn round_robin(state: &mut RunState) -> String {
    let len = state.comment_pool.len();
    let index = state.comment_cursor % len;
    state.comment_cursor = (state.comment_cursor + 1) % len;
    state.comment_pool[index].clone()
}

fn shuffled_bag<R: RngExt>(state: &mut RunState, rng: &mut R) -> String {
    let len = state.comment_pool.len();
    state.used_indices.retain(|&i| i < len);
    if state.used_indices.len() >= len {
        state.used_indices.clear();
    }

    let unused: Vec<usize> = (0..len)
        .filter(|i| !state.used_indices.contains(i))
        .collect();
    let index = unused[rng.random_range(0..unused.len())];
    state.used_indices.insert(index);
    state.comment_pool[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn single_state(comment: &str, randomize: bool) -> RunState {
        RunState {
            single_comment: Some(comment.to_string()),
            randomize,
            ..Default::default()
        }
    }

    fn pool_state(size: usize, randomize: bool) -> RunState {
        RunState {
            multi_comment_mode: true,
            comment_pool: (0..size).map(|i| format!("comment {i}")).collect(),
            randomize,
            ..Default::default()
        }
    }

    fn pool_index(state: &RunState, text: &str) -> usize {
        state
            .comment_pool
            .iter()
            .position(|c| c == text)
            .expect("selected text comes from the pool")
    }

    #[test]
    fn strategy_follows_mode_and_randomize() {
        assert_eq!(
            SelectionStrategy::for_state(&single_state("hi", false)),
            SelectionStrategy::Single
        );
        assert_eq!(
            SelectionStrategy::for_state(&single_state("hi", true)),
            SelectionStrategy::Decorated
        );
        assert_eq!(
            SelectionStrategy::for_state(&pool_state(3, false)),
            SelectionStrategy::RoundRobin
        );
        assert_eq!(
            SelectionStrategy::for_state(&pool_state(3, true)),
            SelectionStrategy::ShuffledBag
        );
        assert_eq!(
            SelectionStrategy::for_state(&pool_state(0, true)),
            SelectionStrategy::Single
        );
    }

    #[test]
    fn single_comment_unchanged_without_randomize() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = single_state("Nice!", false);
        for _ in 0..10 {
            assert_eq!(select_next(&mut state, &mut rng), "Nice!");
        }
    }

    #[test]
    fn decorated_comment_always_contains_original() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = single_state("Nice!", true);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let text = select_next(&mut state, &mut rng);
            assert!(text.contains("Nice!"), "{text} lost the original comment");
            assert_ne!(text, "Nice!");
            seen.insert(text);
        }
        assert!(seen.len() > 1, "decorations should vary");
    }

    #[test]
    fn single_mode_ignores_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = single_state("Nice!", false);
        state.comment_pool = vec!["from pool".to_string()];
        assert_eq!(select_next(&mut state, &mut rng), "Nice!");
        assert_eq!(state.comment_cursor, 0);
    }

    #[test]
    fn empty_pool_falls_back_to_single_or_empty() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = pool_state(0, true);
        assert_eq!(select_next(&mut state, &mut rng), "");
        state.single_comment = Some("fallback".to_string());
        assert_eq!(select_next(&mut state, &mut rng), "fallback");
    }

    #[test]
    fn round_robin_visits_each_index_once_then_restarts() {
        let mut rng = StdRng::seed_from_u64(5);
        for size in 1..=8 {
            let mut state = pool_state(size, false);
            let visited: Vec<usize> = (0..size)
                .map(|_| {
                    let text = select_next(&mut state, &mut rng);
                    pool_index(&state, &text)
                })
                .collect();
            assert_eq!(visited, (0..size).collect::<Vec<_>>());
            let next = select_next(&mut state, &mut rng);
            assert_eq!(pool_index(&state, &next), 0, "pool of {size} should wrap");
        }
    }

    #[test]
    fn round_robin_cursor_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut state = pool_state(3, false);
        state.comment_cursor = 7;
        assert_eq!(select_next(&mut state, &mut rng), "comment 1");
        assert_eq!(state.comment_cursor, 2);
    }

    #[test]
    fn shuffled_bag_never_repeats_within_a_cycle() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for size in 2..=8 {
                let mut state = pool_state(size, true);
                for _cycle in 0..3 {
                    let mut drawn = HashSet::new();
                    for _ in 0..size {
                        let text = select_next(&mut state, &mut rng);
                        assert!(
                            drawn.insert(pool_index(&state, &text)),
                            "seed {seed}, pool {size}: repeated {text} inside one cycle"
                        );
                    }
                    assert_eq!(drawn.len(), size);
                }
            }
        }
    }

    #[test]
    fn shuffled_bag_tracks_used_indices() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = pool_state(3, true);
        select_next(&mut state, &mut rng);
        assert_eq!(state.used_indices.len(), 1);
        select_next(&mut state, &mut rng);
        select_next(&mut state, &mut rng);
        assert_eq!(state.used_indices.len(), 3);
        // The bag refills on the next draw.
        select_next(&mut state, &mut rng);
        assert_eq!(state.used_indices.len(), 1);
    }

    #[test]
    fn shuffled_bag_drops_out_of_range_indices() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = pool_state(2, true);
        state.used_indices.extend([0, 5, 9]);
        assert_eq!(select_next(&mut state, &mut rng), "comment 1");
        assert!(state.used_indices.iter().all(|&i| i < 2));
    }
}
