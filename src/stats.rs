use serde::Serialize;

use crate::store::AppState;

/// Task counters shown under the list. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

impl Stats {
    pub fn of(state: &AppState) -> Self {
        let total = state.tasks.len();
        let completed = state.tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            remaining: total - completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use chrono::Utc;

    #[test]
    fn counts_completed_and_remaining() {
        let now = Utc::now();
        let mut tasks: Vec<Task> = (0..4)
            .map(|i| Task::new(i.to_string().as_str().into(), "x", now).unwrap())
            .collect();
        tasks[1].toggle(now);
        tasks[3].toggle(now);
        let state = AppState {
            tasks,
            ..Default::default()
        };
        assert_eq!(
            Stats::of(&state),
            Stats {
                total: 4,
                completed: 2,
                remaining: 2
            }
        );
    }

    #[test]
    fn empty_state_is_all_zero() {
        assert_eq!(Stats::of(&AppState::default()), Stats::default());
    }
}
