use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, immutable task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do item.
///
/// `completed_at` is `Some` exactly when `completed` is true; only
/// [`Task::toggle`] flips the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh task. Returns `None` when `text` is blank.
    pub fn new(id: TaskId, text: &str, now: DateTime<Utc>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id,
            text: text.to_string(),
            completed: false,
            created_at: now,
            completed_at: None,
        })
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = self.completed.then_some(now);
    }

    /// Checks the invariants a hydrated task must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().is_empty() {
            return Err("task with empty id".into());
        }
        if self.text.is_empty() || self.text.trim() != self.text {
            return Err(format!("task {} has blank or untrimmed text", self.id));
        }
        if self.completed != self.completed_at.is_some() {
            return Err(format!(
                "task {} has completed={} but completedAt={:?}",
                self.id, self.completed, self.completed_at
            ));
        }
        Ok(())
    }
}

/// Session-unique id source: `<millis base36>-<sequence base36>`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    seq: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce an id not accepted by `taken`.
    pub fn next(&mut self, now: DateTime<Utc>, taken: impl Fn(&TaskId) -> bool) -> TaskId {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        loop {
            self.seq += 1;
            let id = TaskId(format!("{}-{}", base36(millis), base36(self.seq)));
            if !taken(&id) {
                return id;
            }
        }
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_trims_and_rejects_blank() {
        let now = Utc::now();
        let task = Task::new("a".into(), "  Buy milk \n", now).unwrap();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);

        assert!(Task::new("b".into(), "", now).is_none());
        assert!(Task::new("c".into(), " \t ", now).is_none());
    }

    #[test]
    fn toggle_keeps_completed_at_in_step() {
        let now = Utc::now();
        let mut task = Task::new("a".into(), "x", now).unwrap();
        task.toggle(now);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));
        assert!(task.validate().is_ok());
        task.toggle(now);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn validate_rejects_broken_invariant() {
        let now = Utc::now();
        let mut task = Task::new("a".into(), "x", now).unwrap();
        task.completed = true;
        assert!(task.validate().is_err());
    }

    #[test]
    fn ids_are_unique_within_a_session() {
        let now = Utc::now();
        let mut ids = IdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(ids.next(now, |_| false)));
        }
    }

    #[test]
    fn ids_skip_taken_values() {
        let now = Utc::now();
        let mut probe = IdGenerator::new();
        let first = probe.next(now, |_| false);

        let mut ids = IdGenerator::new();
        let next = ids.next(now, |id| *id == first);
        assert_ne!(next, first);
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }
}
