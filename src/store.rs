use chrono::Utc;

use crate::storage::{Persistence, StorageError};
use crate::task::{IdGenerator, Task, TaskId};
use crate::theme::Theme;

/// Everything the application persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Most recent first.
    pub tasks: Vec<Task>,
    pub theme: Theme,
}

/// What a mutation did, as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    TaskAdded(TaskId),
    TaskToggled(TaskId),
    TaskDeleted(TaskId),
    CompletedCleared(usize),
    ThemeChanged(Theme),
    Reset,
}

/// Result of a store mutation.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing matched; state untouched, nothing written.
    Unchanged,
    Saved,
    /// State changed and observers ran, but the write failed.
    Unsaved(StorageError),
}

impl Outcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Outcome::Saved)
    }

    pub fn into_warning(self) -> Option<StorageError> {
        match self {
            Outcome::Unsaved(e) => Some(e),
            _ => None,
        }
    }
}

pub type Observer = Box<dyn FnMut(&Change, &AppState)>;

/// Ordered task collection with persist-then-notify mutations.
pub struct Store {
    state: AppState,
    persistence: Persistence,
    ids: IdGenerator,
    observers: Vec<Observer>,
}

impl Store {
    /// Hydrate from `persistence`. The second value is set when saved data
    /// existed but could not be used.
    pub fn open(persistence: Persistence) -> (Self, Option<StorageError>) {
        let (state, warning) = persistence.load();
        let store = Self {
            state,
            persistence,
            ids: IdGenerator::new(),
            observers: Vec::new(),
        };
        (store, warning)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == *id)
    }

    pub fn completed_count(&self) -> usize {
        self.state.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&Change, &AppState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Prepend a task. Blank text is ignored.
    pub fn add(&mut self, text: &str) -> Outcome {
        let now = Utc::now();
        let tasks = &self.state.tasks;
        let id = self.ids.next(now, |id| tasks.iter().any(|t| t.id == *id));
        let Some(task) = Task::new(id.clone(), text, now) else {
            return Outcome::Unchanged;
        };
        log::info!("Task added: {id} {:?}", task.text);
        self.state.tasks.insert(0, task);
        self.commit(Change::TaskAdded(id))
    }

    pub fn toggle(&mut self, id: &TaskId) -> Outcome {
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == *id) else {
            log::debug!("Toggle for unknown task {id}");
            return Outcome::Unchanged;
        };
        task.toggle(Utc::now());
        log::info!("Task toggled: {id} completed={}", task.completed);
        self.commit(Change::TaskToggled(id.clone()))
    }

    /// Remove a task. Deleting an id that is already gone is a no-op.
    pub fn delete(&mut self, id: &TaskId) -> Outcome {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| t.id != *id);
        if self.state.tasks.len() == before {
            log::debug!("Delete for unknown task {id}");
            return Outcome::Unchanged;
        }
        log::info!("Task deleted: {id}");
        self.commit(Change::TaskDeleted(id.clone()))
    }

    /// Drop every completed task, keeping the others in order.
    pub fn clear_completed(&mut self) -> Outcome {
        let cleared = self.completed_count();
        if cleared == 0 {
            return Outcome::Unchanged;
        }
        self.state.tasks.retain(|t| !t.completed);
        log::info!("Cleared {cleared} completed tasks");
        self.commit(Change::CompletedCleared(cleared))
    }

    /// Forget everything: saved blob and in-memory state.
    pub fn reset(&mut self) -> Outcome {
        self.state = AppState::default();
        let result = self.persistence.clear();
        log::info!("All data cleared");
        self.notify(&Change::Reset);
        match result {
            Ok(()) => Outcome::Saved,
            Err(e) => {
                log::warn!("Failed to clear saved data: {e}");
                Outcome::Unsaved(e)
            }
        }
    }

    /// Best-effort write for shutdown; never fails.
    pub fn flush(&mut self) {
        if let Err(e) = self.persistence.save(&self.state) {
            log::warn!("Final save failed: {e}");
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Persist, then notify. Observers run even when the write fails so the
    /// surface never shows stale state.
    pub(crate) fn commit(&mut self, change: Change) -> Outcome {
        let result = self.persistence.save(&self.state);
        self.notify(&change);
        match result {
            Ok(()) => Outcome::Saved,
            Err(e) => {
                log::warn!("Failed to save data: {e}");
                Outcome::Unsaved(e)
            }
        }
    }

    fn notify(&mut self, change: &Change) {
        for observer in &mut self.observers {
            observer(change, &self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use crate::storage::{KvStore, MemoryStore};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> Store {
        Store::open(Persistence::new(Box::new(MemoryStore::new()))).0
    }

    fn first_id(store: &Store) -> TaskId {
        store.tasks()[0].id.clone()
    }

    struct ReadOnly;

    impl KvStore for ReadOnly {
        fn get(&self, _: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&mut self, _: &str, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Malformed("quota exceeded".into()))
        }
        fn remove(&mut self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Malformed("quota exceeded".into()))
        }
    }

    #[test]
    fn shopping_scenario() {
        let mut store = store();

        assert!(store.add("Buy milk").is_saved());
        assert_eq!(store.tasks().len(), 1);
        let milk = first_id(&store);
        assert_eq!(store.tasks()[0].text, "Buy milk");
        assert!(!store.tasks()[0].completed);

        assert!(store.toggle(&milk).is_saved());
        let task = store.get(&milk).unwrap();
        assert!(task.completed);
        assert!(task.completed_at.is_some());

        assert!(store.add("Walk dog").is_saved());
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[0].text, "Walk dog");

        assert!(store.clear_completed().is_saved());
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].text, "Walk dog");
        assert_eq!(
            Stats::of(store.state()),
            Stats {
                total: 1,
                completed: 0,
                remaining: 1
            }
        );
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut store = store();
        store.add("one");
        let before = store.state().clone();
        let ghost = TaskId::from("ghost");
        assert!(!store.toggle(&ghost).changed());
        assert!(!store.delete(&ghost).changed());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn delete_twice_is_idempotent() {
        let mut store = store();
        store.add("one");
        let id = first_id(&store);
        assert!(store.delete(&id).changed());
        assert!(!store.delete(&id).changed());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn clear_completed_without_completed_tasks_does_nothing() {
        let mut store = store();
        store.add("one");
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);
        assert!(!store.clear_completed().changed());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn observers_see_state_after_mutation() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        store.subscribe(move |change, state| {
            log.borrow_mut().push((change.clone(), state.tasks.len()));
        });

        store.add("a");
        let id = first_id(&store);
        store.toggle(&id);
        store.clear_completed();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (Change::TaskAdded(id.clone()), 1));
        assert_eq!(seen[1], (Change::TaskToggled(id), 1));
        assert_eq!(seen[2], (Change::CompletedCleared(1), 0));
    }

    #[test]
    fn mutations_are_persisted() {
        let mut store = store();
        store.add("a");
        store.add("b");
        let (saved, _) = store.persistence().load();
        assert_eq!(&saved, store.state());
    }

    #[test]
    fn save_failure_still_mutates_and_notifies() {
        let (mut store, warning) = Store::open(Persistence::new(Box::new(ReadOnly)));
        assert!(warning.is_none());
        let notified = Rc::new(RefCell::new(false));
        let flag = notified.clone();
        store.subscribe(move |_, _| *flag.borrow_mut() = true);

        let outcome = store.add("a");
        assert!(outcome.changed());
        assert!(outcome.into_warning().is_some());
        assert_eq!(store.tasks().len(), 1);
        assert!(*notified.borrow());

        store.flush();
    }

    #[test]
    fn reset_clears_memory_and_blob() {
        let mut store = store();
        store.add("a");
        store.toggle_theme();
        assert!(store.reset().is_saved());
        assert_eq!(store.state(), &AppState::default());
        let (saved, warning) = store.persistence().load();
        assert!(warning.is_none());
        assert_eq!(saved, AppState::default());
    }

    proptest! {
        #[test]
        fn add_prepends_non_blank_text(text in "[ \t]*[a-zA-Z0-9<>&][ a-zA-Z0-9<>&]*", existing in 0usize..5) {
            let mut store = store();
            for i in 0..existing {
                store.add(&format!("task {i}"));
            }
            let before = store.tasks().len();
            prop_assert!(store.add(&text).changed());
            prop_assert_eq!(store.tasks().len(), before + 1);
            prop_assert_eq!(&store.tasks()[0].text, text.trim());
        }

        #[test]
        fn blank_text_is_ignored(text in "[ \t\n]*") {
            let mut store = store();
            store.add("keep");
            let before = store.state().clone();
            prop_assert!(!store.add(&text).changed());
            prop_assert_eq!(store.state(), &before);
        }

        #[test]
        fn toggle_twice_restores(n in 1usize..6, pick in 0usize..6) {
            let mut store = store();
            for i in 0..n {
                store.add(&format!("task {i}"));
            }
            let id = store.tasks()[pick % n].id.clone();
            let before = store.get(&id).unwrap().clone();
            store.toggle(&id);
            store.toggle(&id);
            let after = store.get(&id).unwrap();
            prop_assert_eq!(after.completed, before.completed);
            prop_assert_eq!(after.completed_at, None);
        }

        #[test]
        fn clear_completed_keeps_pending_in_order(flags in proptest::collection::vec(any::<bool>(), 0..12)) {
            let mut store = store();
            for i in 0..flags.len() {
                store.add(&format!("task {i}"));
            }
            let ids: Vec<TaskId> = store.tasks().iter().map(|t| t.id.clone()).collect();
            for (id, done) in ids.iter().zip(&flags) {
                if *done {
                    store.toggle(id);
                }
            }
            let expected: Vec<TaskId> = ids
                .iter()
                .zip(&flags)
                .filter(|(_, done)| !**done)
                .map(|(id, _)| id.clone())
                .collect();

            store.clear_completed();
            let remaining: Vec<TaskId> = store.tasks().iter().map(|t| t.id.clone()).collect();
            prop_assert_eq!(remaining, expected);
            prop_assert!(store.tasks().iter().all(|t| !t.completed));
        }
    }
}
