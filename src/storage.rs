use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::AppState;
use crate::task::Task;
use crate::theme::Theme;

/// The single key the application state lives under.
pub const STORAGE_KEY: &str = "voiceTodoApp";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("saved data is malformed: {0}")]
    Malformed(String),
}

/// Minimal string-keyed blob store.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Directory: ~/.local/share/voice-todo/
    pub fn default_dir() -> PathBuf {
        let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("voice-todo");
        p
    }

    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// In-process store; also the fallback when the data directory is unusable.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    tasks: &'a [Task],
    theme: Theme,
    last_saved: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    tasks: Vec<Task>,
    #[serde(default)]
    theme: Theme,
}

/// Reads and writes the application state blob under [`STORAGE_KEY`].
pub struct Persistence {
    kv: Box<dyn KvStore>,
}

impl Persistence {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Serialize `state` stamped with the current time and write it.
    pub fn save(&mut self, state: &AppState) -> Result<(), StorageError> {
        let snapshot = SnapshotRef {
            tasks: &state.tasks,
            theme: state.theme,
            last_saved: Utc::now(),
        };
        let data = serde_json::to_string(&snapshot)?;
        self.kv.set(STORAGE_KEY, &data)?;
        log::debug!("Saved {} tasks", state.tasks.len());
        Ok(())
    }

    /// Load the saved state. Absent data yields the defaults silently;
    /// unreadable or malformed data yields the defaults plus the reason.
    pub fn load(&self) -> (AppState, Option<StorageError>) {
        let data = match self.kv.get(STORAGE_KEY) {
            Ok(Some(data)) => data,
            Ok(None) => return (AppState::default(), None),
            Err(e) => {
                log::warn!("Failed to read saved data: {e}");
                return (AppState::default(), Some(e));
            }
        };
        match decode(&data) {
            Ok(state) => {
                log::info!("Loaded {} tasks", state.tasks.len());
                (state, None)
            }
            Err(e) => {
                log::warn!("Resetting to defaults: {e}");
                (AppState::default(), Some(e))
            }
        }
    }

    /// Remove the saved blob entirely.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.kv.remove(STORAGE_KEY)
    }
}

fn decode(data: &str) -> Result<AppState, StorageError> {
    let snapshot: Snapshot =
        serde_json::from_str(data).map_err(|e| StorageError::Malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    for task in &snapshot.tasks {
        task.validate().map_err(StorageError::Malformed)?;
        if !seen.insert(task.id.clone()) {
            return Err(StorageError::Malformed(format!("duplicate task id {}", task.id)));
        }
    }

    Ok(AppState {
        tasks: snapshot.tasks,
        theme: snapshot.theme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;

    fn sample_state() -> AppState {
        let now = Utc::now();
        let mut done = Task::new(TaskId::from("b"), "Walk dog", now).unwrap();
        done.toggle(now);
        AppState {
            tasks: vec![done, Task::new(TaskId::from("a"), "Buy milk", now).unwrap()],
            theme: Theme::Dark,
        }
    }

    #[test]
    fn absent_key_loads_defaults_without_warning() {
        let persistence = Persistence::new(Box::new(MemoryStore::new()));
        let (state, warning) = persistence.load();
        assert_eq!(state, AppState::default());
        assert!(warning.is_none());
    }

    #[test]
    fn round_trips_through_a_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state();

        let mut persistence = Persistence::new(Box::new(FileStore::open(dir.path()).unwrap()));
        persistence.save(&state).unwrap();
        assert!(dir.path().join("voiceTodoApp.json").exists());

        let reopened = Persistence::new(Box::new(FileStore::open(dir.path()).unwrap()));
        let (loaded, warning) = reopened.load();
        assert!(warning.is_none());
        assert_eq!(loaded, state);
    }

    #[test]
    fn blob_has_expected_shape() {
        let mut kv = MemoryStore::new();
        kv.set("unrelated", "1").unwrap();
        let mut persistence = Persistence::new(Box::new(kv));
        persistence.save(&sample_state()).unwrap();

        let data = persistence.kv.get(STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value["theme"], "dark");
        assert!(value["lastSaved"].is_string());
        assert_eq!(value["tasks"][0]["text"], "Walk dog");
        assert!(value["tasks"][0]["completedAt"].is_string());
        assert!(value["tasks"][1].get("completedAt").is_none());
        assert!(value["tasks"][1]["createdAt"].is_string());
    }

    #[test]
    fn reads_blobs_written_by_the_web_page() {
        let mut kv = MemoryStore::new();
        kv.set(
            STORAGE_KEY,
            r#"{"tasks":[{"id":"lx2k9abc123","text":"Read 30 minutes","completed":false,
                "createdAt":"2024-05-01T10:00:00.000Z","completedAt":null}],
                "theme":"dark","lastSaved":"2024-05-01T10:00:01.000Z"}"#,
        )
        .unwrap();
        let (state, warning) = Persistence::new(Box::new(kv)).load();
        assert!(warning.is_none());
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].id.as_str(), "lx2k9abc123");
        assert_eq!(state.tasks[0].completed_at, None);
        assert_eq!(state.theme, Theme::Dark);
    }

    #[test]
    fn missing_theme_defaults_to_light() {
        let mut kv = MemoryStore::new();
        kv.set(STORAGE_KEY, r#"{"tasks":[]}"#).unwrap();
        let (state, warning) = Persistence::new(Box::new(kv)).load();
        assert!(warning.is_none());
        assert_eq!(state.theme, Theme::Light);
    }

    #[test]
    fn malformed_blobs_reset_to_defaults() {
        let blobs = [
            "not json",
            r#"{"tasks":"nope","theme":"dark"}"#,
            r#"{"theme":"dark"}"#,
            r#"{"tasks":[],"theme":"sepia"}"#,
            r#"{"tasks":[{"id":"a","text":"  ","completed":false,"createdAt":"2024-05-01T10:00:00Z"}]}"#,
            r#"{"tasks":[{"id":"a","text":"x","completed":true,"createdAt":"2024-05-01T10:00:00Z"}]}"#,
            r#"{"tasks":[
                {"id":"a","text":"x","completed":false,"createdAt":"2024-05-01T10:00:00Z"},
                {"id":"a","text":"y","completed":false,"createdAt":"2024-05-01T10:00:00Z"}]}"#,
        ];
        for blob in blobs {
            let mut kv = MemoryStore::new();
            kv.set(STORAGE_KEY, blob).unwrap();
            let (state, warning) = Persistence::new(Box::new(kv)).load();
            assert_eq!(state, AppState::default(), "blob: {blob}");
            assert!(
                matches!(warning, Some(StorageError::Malformed(_))),
                "blob: {blob}"
            );
        }
    }

    #[test]
    fn clear_removes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let mut persistence = Persistence::new(Box::new(FileStore::open(dir.path()).unwrap()));
        persistence.save(&sample_state()).unwrap();
        persistence.clear().unwrap();
        persistence.clear().unwrap();
        assert!(!dir.path().join("voiceTodoApp.json").exists());
        assert_eq!(persistence.load().0, AppState::default());
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("gone")).unwrap();
        fs::remove_dir(store.dir()).unwrap();
        let err = store.set(STORAGE_KEY, "{}").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
