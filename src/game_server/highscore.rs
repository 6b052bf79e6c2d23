//! Highscore - Durable best score
//!
//! A single unsigned value under a well-known key in a key-value store.
//! Anything stored there that is not an integer in `0..=u32::MAX` reads as
//! absent, i.e. a highscore of 0.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::game_server::error::StoreError;

/// Key the highscore lives under
pub const HIGHSCORE_KEY: &str = "highscore";

/// Minimal get / set / remove storage contract
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&mut self, key: &str, value: i64);
    fn remove(&mut self, key: &str);
}

/// Volatile store, used in tests and when no data dir is available
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Store backed by a JSON object on disk.
///
/// Read and write failures are logged and otherwise ignored; the in-memory
/// copy stays authoritative for the rest of the process.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Ignoring unreadable store {}: {}", path.display(), e);
                Map::new()
            }
        };
        Self { path, entries }
    }

    fn load(path: &Path) -> Result<Map<String, Value>, StoreError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text)? {
            Value::Object(entries) => Ok(entries),
            _ => Ok(Map::new()),
        }
    }

    /// Write the current entries back to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)?;

        // Write a sibling file, then swap it in
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn flush_or_warn(&self) {
        if let Err(e) = self.flush() {
            log::warn!("Could not write store {}: {}", self.path.display(), e);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    fn set(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), Value::from(value));
        self.flush_or_warn();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush_or_warn();
        }
    }
}

/// Highscore view over a key-value store
pub struct HighscoreStore {
    store: Box<dyn KeyValueStore>,
}

impl HighscoreStore {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Stored highscore, 0 when absent or out of range
    pub fn get(&self) -> u32 {
        self.store
            .get(HIGHSCORE_KEY)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0)
    }

    pub fn set(&mut self, score: u32) {
        self.store.set(HIGHSCORE_KEY, i64::from(score));
    }

    pub fn clear(&mut self) {
        self.store.remove(HIGHSCORE_KEY);
    }

    /// Store `score` if it beats the current highscore. Returns whether it did.
    pub fn record(&mut self, score: u32) -> bool {
        if score > self.get() {
            self.set(score);
            true
        } else {
            false
        }
    }
}

impl Default for HighscoreStore {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_sets_highscore() {
        let mut highscore = HighscoreStore::default();
        assert_eq!(highscore.get(), 0);
        assert!(highscore.record(42));
        assert_eq!(highscore.get(), 42);
    }

    #[test]
    fn test_only_strictly_greater_scores_replace() {
        let mut highscore = HighscoreStore::default();
        highscore.set(30);
        assert!(!highscore.record(30));
        assert!(!highscore.record(12));
        assert_eq!(highscore.get(), 30);
        assert!(highscore.record(31));
        assert_eq!(highscore.get(), 31);
    }

    #[test]
    fn test_zero_never_replaces_absent() {
        let mut highscore = HighscoreStore::default();
        assert!(!highscore.record(0));
    }

    #[test]
    fn test_out_of_range_values_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(HIGHSCORE_KEY, -7);
        assert_eq!(HighscoreStore::new(store.clone()).get(), 0);
        store.set(HIGHSCORE_KEY, i64::from(u32::MAX) + 1);
        assert_eq!(HighscoreStore::new(store).get(), 0);
    }

    #[test]
    fn test_clear() {
        let mut highscore = HighscoreStore::default();
        highscore.set(99);
        highscore.clear();
        assert_eq!(highscore.get(), 0);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut highscore = HighscoreStore::new(JsonFileStore::open(&path));
        highscore.record(65);

        let reopened = HighscoreStore::new(JsonFileStore::open(&path));
        assert_eq!(reopened.get(), 65);
    }

    #[test]
    fn test_file_store_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        fs::write(&path, "not json at all").unwrap();
        assert_eq!(HighscoreStore::new(JsonFileStore::open(&path)).get(), 0);

        fs::write(&path, r#"{"highscore": "ten"}"#).unwrap();
        assert_eq!(HighscoreStore::new(JsonFileStore::open(&path)).get(), 0);

        fs::write(&path, r#"{"highscore": 12.5}"#).unwrap();
        assert_eq!(HighscoreStore::new(JsonFileStore::open(&path)).get(), 0);

        fs::write(&path, r#"[1, 2, 3]"#).unwrap();
        assert_eq!(HighscoreStore::new(JsonFileStore::open(&path)).get(), 0);
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = JsonFileStore::open(&path);
        store.set("other", 3);
        store.set(HIGHSCORE_KEY, 10);
        store.remove(HIGHSCORE_KEY);

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(HIGHSCORE_KEY), None);
        assert_eq!(reopened.get("other"), Some(3));
    }
}
