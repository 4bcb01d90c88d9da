//! The on-disk cache document.
//!
//! All entries live in one JSON file, keyed by cache key. The whole document
//! is read at the start of an operation and written back as a unit; writes go
//! to a sibling temp file that is then renamed over the original, so a crash
//! mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::key::CacheKey;

/// Every cache entry, keyed by rendered cache key.
///
/// Entries are kept as raw JSON and decoded on access, so an entry this
/// build cannot decode is still written back untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheDocument {
    entries: BTreeMap<String, Value>,
}

impl CacheDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode the entry under `key`. Undecodable entries are logged and
    /// reported as absent.
    pub fn get<E: DeserializeOwned>(&self, key: &CacheKey) -> Option<E> {
        let raw = self.entries.get(&key.to_string())?;
        match serde_json::from_value(raw.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %key, error = %e, "Invalid cache entry, treating as missing");
                None
            }
        }
    }

    pub fn insert<E: Serialize>(&mut self, key: &CacheKey, entry: &E) -> serde_json::Result<()> {
        let value = serde_json::to_value(entry)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(&key.to_string()).is_some()
    }

    /// Set `is_dirty` on an existing entry without touching its data.
    /// Returns false when there is no entry to mark.
    pub fn mark_dirty(&mut self, key: &CacheKey) -> bool {
        match self.entries.get_mut(&key.to_string()) {
            Some(Value::Object(entry)) => {
                entry.insert("is_dirty".to_string(), Value::Bool(true));
                true
            }
            _ => false,
        }
    }

    /// Decode every entry whose key is recognised, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (CacheKey, CacheEntry)> + '_ {
        self.entries.iter().filter_map(|(raw_key, value)| {
            let key = CacheKey::parse(raw_key)?;
            match CacheEntry::decode(&key, value.clone()) {
                Ok(entry) => Some((key, entry)),
                Err(e) => {
                    debug!(key = %raw_key, error = %e, "Skipping undecodable cache entry");
                    None
                }
            }
        })
    }
}

/// Handle to the cache file.
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".tmp.{}", std::process::id()));
        self.path.with_file_name(name)
    }

    /// Load the whole document. A missing, unreadable or corrupt file is an
    /// empty document.
    pub fn load(&self) -> CacheDocument {
        if !self.path.exists() {
            return CacheDocument::new();
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read cache file");
                return CacheDocument::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, Value>>(&contents) {
            Ok(entries) => CacheDocument { entries },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse cache file, starting empty");
                CacheDocument::new()
            }
        }
    }

    /// Replace the file with `document`.
    pub fn save(&self, document: &CacheDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
            }
        }

        let contents = serde_json::to_string_pretty(&document.entries)?;
        let temp = self.temp_path();
        std::fs::write(&temp, contents)
            .with_context(|| format!("Failed to write cache file: {}", temp.display()))?;
        if let Err(e) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(e).with_context(|| format!("Failed to replace cache file: {}", self.path.display()));
        }

        debug!(path = %self.path.display(), entries = document.len(), "Saved cache");
        Ok(())
    }

    /// Delete the cache file. Every entity refetches on next access.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove cache file: {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::{DirtyEntry, TimedEntry};
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("nested").join("data.json"))
    }

    #[test]
    fn test_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").expect("write corrupt file");
        assert!(CacheStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_non_object_file_is_empty_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, "[1, 2, 3]").expect("write file");
        assert!(CacheStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let mut doc = CacheDocument::new();
        let entry = TimedEntry { last_updated: None, data: vec![1, 2, 3] };
        doc.insert(&CacheKey::waypoints("X1-ABC"), &entry).expect("insert");
        store.save(&doc).expect("save");

        let loaded = store.load();
        assert_eq!(loaded, doc);
        let back: TimedEntry<Vec<i32>> = loaded.get(&CacheKey::waypoints("X1-ABC")).expect("entry present");
        assert_eq!(back.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().join("data.json"));
        store.save(&CacheDocument::new()).expect("save");
        store.save(&CacheDocument::new()).expect("save again");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("dir entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("data.json")]);
    }

    #[test]
    fn test_undecodable_entry_reads_as_missing_but_survives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"agent_info": {"last_updated": "not a date", "data": 5}}"#).expect("write");
        let store = CacheStore::new(&path);

        let doc = store.load();
        assert!(doc.get::<TimedEntry<i32>>(&CacheKey::Agent).is_none());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.entries().count(), 0);
    }

    #[test]
    fn test_mark_dirty_only_touches_flag() {
        let mut doc = CacheDocument::new();
        assert!(!doc.mark_dirty(&CacheKey::ContractList));

        let entry = DirtyEntry { last_updated: None, is_dirty: false, data: json!([{"id": "c1"}]) };
        doc.insert(&CacheKey::ContractList, &entry).expect("insert");
        assert!(doc.mark_dirty(&CacheKey::ContractList));

        let marked: DirtyEntry<Value> = doc.get(&CacheKey::ContractList).expect("entry present");
        assert!(marked.is_dirty);
        assert_eq!(marked.data, json!([{"id": "c1"}]));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CacheStore::new(dir.path().join("data.json"));
        let mut doc = CacheDocument::new();
        doc.insert(&CacheKey::Agent, &json!({"last_updated": null, "data": {}})).expect("insert");
        assert!(doc.remove(&CacheKey::Agent));
        assert!(!doc.remove(&CacheKey::Agent));

        store.save(&doc).expect("save");
        assert!(store.path().exists());
        store.clear().expect("clear");
        assert!(!store.path().exists());
        store.clear().expect("clearing twice is fine");
    }
}
