//! History of previously accepted candidate names.
//!
//! The history is an insertion-ordered, duplicate-free, capped list of
//! normalized names. Storage is injectable through [`HistoryStore`]: the
//! file-backed store is what the CLI uses, the in-memory store is for tests
//! and embedding.

use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::similarity::normalize;

pub const DEFAULT_HISTORY_CAP: usize = 300;

/// Ordered set of normalized names, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: VecDeque<String>,
    index: HashSet<String>,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }
}

impl History {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: HashSet::new(),
            cap,
        }
    }

    /// Build a history from names in insertion order (oldest first)
    pub fn from_names<I, S>(names: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_cap(cap).merge(names)
    }

    /// Normalized union of `self` and `names`, evicting the oldest entries
    /// beyond the cap. Names already present keep their original position.
    pub fn merge<I, S>(&self, names: I) -> History
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut merged = self.clone();
        for name in names {
            merged.insert(normalize(name.as_ref()));
        }
        merged.evict_overflow();
        merged
    }

    fn insert(&mut self, name: String) {
        if name.is_empty() || self.index.contains(&name) {
            return;
        }
        self.index.insert(name.clone());
        self.entries.push_back(name);
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.cap {
            if let Some(oldest) = self.entries.pop_front() {
                debug!("History cap reached, evicting '{}'", oldest);
                self.index.remove(&oldest);
            }
        }
    }

    /// Exact lookup of an already-normalized name
    pub fn contains(&self, normalized: &str) -> bool {
        self.index.contains(normalized)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<&str> {
        let skip = self.entries.len().saturating_sub(limit);
        self.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// Format recent history as an exclusion hint for the generator prompt.
///
/// Only the newest `limit` entries are included; the hard filter always
/// runs against the full history.
pub fn format_history_for_prompt(history: &History, limit: usize) -> String {
    if history.is_empty() || limit == 0 {
        return String::new();
    }

    format!(
        "CRITICAL EXCLUSION LIST (DO NOT SUGGEST THESE):\n[ {} ]",
        history.recent(limit).join(", ")
    )
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to create history directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write history to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to replace history file {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where the history lives between runs
pub trait HistoryStore {
    /// Load prior state. Never fails: a missing or unreadable record is
    /// logged and treated as empty history.
    fn load(&self) -> History;

    /// Persist `history`, replacing the previous record
    fn save(&self, history: &History) -> Result<(), HistoryError>;
}

/// On-disk record. Older files hold a bare array of names.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Record {
        names: Vec<String>,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        updated_at: Option<DateTime<Utc>>,
    },
    Legacy(Vec<String>),
}

/// A damaged timestamp must not cost us the names next to it
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl HistoryFile {
    fn into_names(self) -> Vec<String> {
        match self {
            HistoryFile::Record { names, .. } => names,
            HistoryFile::Legacy(names) => names,
        }
    }
}

/// JSON file store with temp-then-rename writes
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
    cap: usize,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_names(&self) -> Result<Vec<String>, String> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read history: {}", e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<HistoryFile>(&content)
            .map(HistoryFile::into_names)
            .map_err(|e| format!("Failed to parse history: {}", e))
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> History {
        if !self.path.exists() {
            warn!("No history at {}, starting with empty history", self.path.display());
            return History::with_cap(self.cap);
        }

        match self.read_names() {
            Ok(names) => {
                let history = History::from_names(names, self.cap);
                info!(
                    "Loaded {} history entries from {}",
                    history.len(),
                    self.path.display()
                );
                history
            }
            Err(e) => {
                warn!("{} ({}), continuing with empty history", e, self.path.display());
                History::with_cap(self.cap)
            }
        }
    }

    fn save(&self, history: &History) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| HistoryError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let record = HistoryFile::Record {
            names: history.names(),
            updated_at: Some(Utc::now()),
        };
        let content = serde_json::to_string_pretty(&record)?;

        let write_err = |source: std::io::Error| HistoryError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path)
            .map_err(|e| HistoryError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;

        info!(
            "Saved history: {} entries at {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store, for tests and for callers that own persistence
#[derive(Debug)]
pub struct MemoryHistoryStore {
    names: Mutex<Vec<String>>,
    cap: usize,
}

impl MemoryHistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            names: Mutex::new(Vec::new()),
            cap,
        }
    }

    pub fn seeded<I, S>(names: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Mutex::new(names.into_iter().map(Into::into).collect()),
            cap,
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> History {
        History::from_names(self.snapshot(), self.cap)
    }

    fn save(&self, history: &History) -> Result<(), HistoryError> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        *names = history.names();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_merge_normalizes_and_dedupes() {
        let history = History::with_cap(10).merge(["Smart Clock", "  smart clock ", "Neck Fan", ""]);
        assert_eq!(history.names(), vec!["smart clock", "neck fan"]);
        assert!(history.contains("smart clock"));
    }

    #[test]
    fn test_merge_keeps_original_position() {
        let history = History::from_names(["a", "b", "c"], 10).merge(["A", "d"]);
        assert_eq!(history.names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_does_not_mutate_input() {
        let original = History::from_names(["a"], 10);
        let merged = original.merge(["b"]);
        assert_eq!(original.len(), 1);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut history = History::with_cap(3);
        for batch in [vec!["a", "b"], vec!["c", "d"], vec!["e"]] {
            history = history.merge(batch);
            assert!(history.len() <= 3);
        }
        assert_eq!(history.names(), vec!["c", "d", "e"]);
        assert!(!history.contains("a"));
        assert!(!history.contains("b"));
    }

    #[test]
    fn test_cap_over_many_merges() {
        let mut history = History::with_cap(300);
        for i in 0..1000 {
            history = history.merge([format!("product {}", i)]);
        }
        assert_eq!(history.len(), 300);
        assert_eq!(history.iter().next(), Some("product 700"));
        assert_eq!(history.iter().last(), Some("product 999"));
    }

    #[test]
    fn test_recent() {
        let history = History::from_names(["a", "b", "c", "d"], 10);
        assert_eq!(history.recent(2), vec!["c", "d"]);
        assert_eq!(history.recent(10), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_format_history_for_prompt() {
        assert_eq!(format_history_for_prompt(&History::default(), 50), "");

        let history = History::from_names(["a", "b", "c"], 10);
        let hint = format_history_for_prompt(&history, 2);
        assert!(hint.contains("[ b, c ]"));
        assert!(!hint.contains("a,"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json"), 300);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_empty_content_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "").unwrap();
        assert!(FileHistoryStore::new(&path, 300).load().is_empty());
    }

    #[test]
    fn test_load_corrupt_content_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(FileHistoryStore::new(&path, 300).load().is_empty());

        std::fs::write(&path, r#"{"names": 12}"#).unwrap();
        assert!(FileHistoryStore::new(&path, 300).load().is_empty());
    }

    #[test]
    fn test_load_tolerates_bad_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        for updated_at in [r#""2024-01-01""#, "42", "null", r#"{"at": 1}"#] {
            let content = format!(r#"{{"names": ["Smart Clock"], "updated_at": {}}}"#, updated_at);
            std::fs::write(&path, content).unwrap();

            let history = FileHistoryStore::new(&path, 300).load();
            assert_eq!(history.names(), vec!["smart clock"], "updated_at {}", updated_at);
        }
    }

    #[test]
    fn test_load_legacy_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"["Smart Clock", "Neck Fan"]"#).unwrap();

        let history = FileHistoryStore::new(&path, 300).load();
        assert_eq!(history.names(), vec!["smart clock", "neck fan"]);
    }

    #[test]
    fn test_load_applies_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"["a", "b", "c", "d"]"#).unwrap();

        let history = FileHistoryStore::new(&path, 2).load();
        assert_eq!(history.names(), vec!["c", "d"]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("history.json");
        let store = FileHistoryStore::new(&path, 300);

        let history = History::from_names(["Smart Clock", "Neck Fan"], 300);
        store.save(&history).unwrap();

        assert!(path.exists());
        assert_eq!(store.load(), history);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["names"][0], "smart clock");
        assert!(raw["updated_at"].is_string());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = FileHistoryStore::new(&path, 300);

        store.save(&History::from_names(["a"], 300)).unwrap();
        store.save(&History::from_names(["a", "b"], 300)).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let store = FileHistoryStore::new(blocker.join("history.json"), 300);
        let result = store.save(&History::from_names(["a"], 300));
        assert!(matches!(result, Err(HistoryError::CreateDir { .. })));
    }

    #[test]
    fn test_memory_store_survives_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryHistoryStore::seeded(["Smart Clock"], 300));

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.names.lock().unwrap();
            panic!("poison the history lock");
        })
        .join();
        assert!(store.names.is_poisoned());

        assert_eq!(store.snapshot(), vec!["smart clock"]);
        let history = store.load().merge(["Neck Fan"]);
        store.save(&history).unwrap();
        assert_eq!(store.snapshot(), vec!["smart clock", "neck fan"]);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryHistoryStore::seeded(["Smart Clock"], 300);
        let history = store.load().merge(["Neck Fan"]);
        store.save(&history).unwrap();
        assert_eq!(store.snapshot(), vec!["smart clock", "neck fan"]);
    }
}
