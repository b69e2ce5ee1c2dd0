//! Single-document JSON file backend
//!
//! The whole key space is kept in memory and flushed to disk on every
//! mutation. Writes go to a sibling temp file first and are renamed into
//! place so a crash never leaves a half-written document behind.

use crate::{KeyValueStore, StoreResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable key-value store backed by one JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is an empty store. A file that cannot be parsed is
    /// logged and treated as empty; it is overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let data = serde_json::to_string(entries)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());

        // Memory only moves once the document is on disk
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.lock();
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("userPosts_u1", "[]").unwrap();
            store.set("likedPosts_u1", "[\"demo-1\"]").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("likedPosts_u1").unwrap(),
            Some("[\"demo-1\"]".to_string())
        );
        assert_eq!(
            reopened.keys_with_prefix("userPosts_").unwrap(),
            vec!["userPosts_u1"]
        );
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);

        store.set("savedPosts_u1", "[]").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("savedPosts_u1").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("savedPosts_u1", "[]").unwrap();
        store.remove("savedPosts_u1").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("savedPosts_u1").unwrap(), None);
    }

    #[test]
    fn test_failed_flush_leaves_entries_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("likedPosts_u1", "[]").unwrap();

        // A directory squatting on the temp path makes every flush fail
        fs::create_dir(dir.path().join("store.json.tmp")).unwrap();

        assert!(store.set("likedPosts_u1", "[\"demo-1\"]").is_err());
        assert_eq!(store.get("likedPosts_u1").unwrap(), Some("[]".to_string()));

        assert!(store.remove("likedPosts_u1").is_err());
        assert_eq!(store.get("likedPosts_u1").unwrap(), Some("[]".to_string()));
    }
}
