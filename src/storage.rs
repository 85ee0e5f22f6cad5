//! Storage layer for studytrack
//!
//! State lives in a flat key-value store. Each key holds one serialized
//! blob; the task list is always written as a full JSON snapshot.
//!
//! # On-disk layout ([`FileBackend`])
//!
//! ```text
//! <data dir>/
//!   tasks.json              # full task list (JSON array)
//!   tasks.json.lock         # writer lock
//!   preferred-theme.json    # dark | light
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::Task;

/// Default key for the task list blob
pub const TASKS_KEY: &str = "tasks";

/// Default key for the theme preference
pub const THEME_KEY: &str = "preferred-theme";

/// A durable string key-value store.
pub trait Backend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Keys become file names, so only a conservative character set is allowed.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid storage key '{key}'")))
    }
}

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Backend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        lock::write_atomic_locked(&path, value.as_bytes(), self.lock_timeout_ms)
    }
}

/// In-process backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, as a full quota would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::OperationFailed(format!(
                "storage quota exceeded writing '{key}'"
            )));
        }
        self.insert(key, value);
        Ok(())
    }
}

/// Best-effort task list persistence under a single key.
///
/// Failures are logged and swallowed: a failed load yields an empty list
/// and a failed save leaves the previously persisted blob in place.
#[derive(Clone)]
pub struct StorageAdapter {
    backend: Arc<dyn Backend>,
    key: String,
}

impl fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl StorageAdapter {
    pub fn new(backend: Arc<dyn Backend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn load(&self) -> Vec<Task> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "failed to read tasks");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "persisted tasks are malformed; starting empty");
                return Vec::new();
            }
        };

        // One unreadable record must not take its siblings down with it.
        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Task>(record) {
                Ok(task) => Some(task),
                Err(err) => {
                    tracing::warn!(key = %self.key, index, error = %err, "skipping unreadable task record");
                    None
                }
            })
            .collect()
    }

    pub fn save(&self, tasks: &[Task]) {
        let json = match serde_json::to_string(tasks) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "failed to serialize tasks");
                return;
            }
        };
        if let Err(err) = self.backend.set(&self.key, &json) {
            tracing::error!(key = %self.key, error = %err, "failed to save tasks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Category, Priority};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_tasks() -> Vec<Task> {
        let created = Utc.with_ymd_and_hms(2025, 1, 5, 9, 30, 0).unwrap();
        let completed = Utc.with_ymd_and_hms(2025, 1, 6, 18, 0, 0).unwrap();
        vec![
            Task {
                id: "01jabc".to_string(),
                title: "Anki review".to_string(),
                description: "deck 3".to_string(),
                category: Category::Vocabulary,
                priority: Priority::High,
                due_date: NaiveDate::from_ymd_opt(2025, 1, 20),
                estimated_time: 30,
                completed: true,
                created_at: created,
                completed_at: Some(completed),
                study_time: 45,
                review_dates: Some(crate::task::review_schedule(completed)),
            },
            Task {
                id: "01jabd".to_string(),
                title: "Listen to podcast".to_string(),
                description: String::new(),
                category: Category::Listening,
                priority: Priority::Low,
                due_date: None,
                estimated_time: 0,
                completed: false,
                created_at: created,
                completed_at: None,
                study_time: 0,
                review_dates: None,
            },
        ]
    }

    #[test]
    fn save_then_load_round_trips() {
        let backend = MemoryBackend::new();
        let adapter = StorageAdapter::new(Arc::new(backend), TASKS_KEY);
        let tasks = sample_tasks();

        adapter.save(&tasks);
        assert_eq!(adapter.load(), tasks);
    }

    #[test]
    fn persisted_blob_uses_camel_case_fields() {
        let backend = MemoryBackend::new();
        let adapter = StorageAdapter::new(Arc::new(backend.clone()), TASKS_KEY);
        adapter.save(&sample_tasks());

        let raw = backend.raw(TASKS_KEY).expect("blob");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let first = &value[0];
        assert_eq!(first["dueDate"], "2025-01-20");
        assert_eq!(first["studyTime"], 45);
        assert_eq!(first["estimatedTime"], 30);
        assert_eq!(first["reviewDates"].as_array().map(Vec::len), Some(4));
        assert!(value[1].get("completedAt").is_none());
    }

    #[test]
    fn missing_or_corrupt_blob_loads_empty() {
        let backend = MemoryBackend::new();
        let adapter = StorageAdapter::new(Arc::new(backend.clone()), TASKS_KEY);
        assert!(adapter.load().is_empty());

        backend.insert(TASKS_KEY, "{not json");
        assert!(adapter.load().is_empty());
    }

    #[test]
    fn one_bad_record_does_not_erase_the_rest() {
        let backend = MemoryBackend::new();
        backend.insert(
            TASKS_KEY,
            r#"[
                {"id":"good1","title":"Keep me","category":"grammar","priority":"high",
                 "createdAt":"2025-01-01T00:00:00Z","studyTime":120},
                {"id":"neg1","title":"Negative estimate","category":"reading","priority":"low",
                 "createdAt":"2025-01-01T00:00:00Z","estimatedTime":-5,"studyTime":null},
                {"id":"bad1","title":"Unknown category","category":"cooking","priority":"low",
                 "createdAt":"2025-01-01T00:00:00Z"}
            ]"#,
        );
        let adapter = StorageAdapter::new(Arc::new(backend.clone()), TASKS_KEY);
        let mut store = crate::task::TaskStore::open(adapter.clone());

        let ids: Vec<&str> = store.get_all().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["good1", "neg1"]);
        let negative = store.get("neg1").expect("clamped record");
        assert_eq!(negative.estimated_time, 0);
        assert_eq!(negative.study_time, 0);

        store.create(crate::task::NewTask::new("New", Category::Speaking, Priority::Medium));

        let reloaded = adapter.load();
        assert_eq!(reloaded.len(), 3);
        let kept = reloaded.iter().find(|task| task.id == "good1").expect("good1 kept");
        assert_eq!(kept.study_time, 120);
    }

    #[test]
    fn lenient_minutes_accept_strings_and_fractions() {
        let task: Task = serde_json::from_str(
            r#"{"id":"x","title":"t","category":"writing","priority":"low",
                "createdAt":"2025-01-01T00:00:00Z","estimatedTime":"25","studyTime":12.9}"#,
        )
        .expect("lenient task");
        assert_eq!(task.estimated_time, 25);
        assert_eq!(task.study_time, 12);
    }

    #[test]
    fn failed_save_keeps_previous_blob() {
        let backend = MemoryBackend::new();
        let adapter = StorageAdapter::new(Arc::new(backend.clone()), TASKS_KEY);
        let tasks = sample_tasks();
        adapter.save(&tasks[..1]);
        let before = backend.raw(TASKS_KEY);

        backend.set_fail_writes(true);
        adapter.save(&tasks);
        assert_eq!(backend.raw(TASKS_KEY), before);
    }

    #[test]
    fn file_backend_round_trips_and_reports_missing() {
        let dir = TempDir::new().expect("tempdir");
        let backend = FileBackend::new(dir.path());

        assert_eq!(backend.get(TASKS_KEY).expect("get"), None);
        backend.set(TASKS_KEY, "[]").expect("set");
        assert_eq!(backend.get(TASKS_KEY).expect("get").as_deref(), Some("[]"));
        assert!(dir.path().join("tasks.json").exists());
    }

    #[test]
    fn file_backend_rejects_path_like_keys() {
        let dir = TempDir::new().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        assert!(matches!(
            backend.set("../escape", "x"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(validate_key("preferred-theme").is_ok());
        assert!(validate_key("").is_err());
    }
}
