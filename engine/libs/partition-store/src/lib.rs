//! Identity-partitioned persistence for the feed engine
//!
//! Wraps a synchronous key-value store and namespaces every value by the
//! identity that owns it:
//! - Physical key = `{logical}_{identity}` (see [`keys`])
//! - Prefix scans across every identity's partition, independent of who is active
//! - Corrupt values degrade to an empty default, logged and never propagated
//! - Pluggable backends: memory, JSON file, Redis
//!
//! # Example
//!
//! ```
//! use partition_store::{Identity, LogicalKey, MemoryStore, PartitionedStore};
//! use std::sync::Arc;
//!
//! let store = PartitionedStore::new(Arc::new(MemoryStore::new()));
//! let u1 = Identity::new("u1");
//!
//! store.write(LogicalKey::LikedPosts, &u1, &vec!["demo-1".to_string()]).unwrap();
//!
//! let liked: Vec<String> = store.read(LogicalKey::LikedPosts, &u1);
//! assert_eq!(liked, vec!["demo-1"]);
//!
//! let partitions = store.list_partitions::<Vec<String>>(LogicalKey::LikedPosts);
//! assert_eq!(partitions.len(), 1);
//! ```

mod error;
mod file;
mod memory;
mod metrics;
mod redis_store;

pub mod keys;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use keys::{parse_physical_key, physical_key, Identity, LogicalKey};
pub use memory::MemoryStore;
pub use metrics::StoreMetrics;
pub use redis_store::{escape_glob, RedisStore, DEFAULT_NAMESPACE};

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Raw synchronous key-value operations a backend must provide
pub trait KeyValueStore: Send + Sync {
    /// Get the raw value stored under `key`
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete `key` (no-op when absent)
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Every key starting with `prefix`, in ascending order
    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Shared handle to a backend
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Identity-namespaced adapter over a [`KeyValueStore`]
#[derive(Clone)]
pub struct PartitionedStore {
    backend: SharedStore,
    metrics: StoreMetrics,
}

impl PartitionedStore {
    pub fn new(backend: SharedStore) -> Self {
        Self {
            backend,
            metrics: StoreMetrics::new(),
        }
    }

    pub fn with_metrics(backend: SharedStore, metrics: StoreMetrics) -> Self {
        Self { backend, metrics }
    }

    pub fn backend(&self) -> &SharedStore {
        &self.backend
    }

    /// Read an identity's partition, falling back to `T::default()`
    ///
    /// Missing keys, backend failures and unparseable values all yield the
    /// default; failures are logged and counted.
    pub fn read<T>(&self, logical: LogicalKey, identity: &Identity) -> T
    where
        T: DeserializeOwned + Default,
    {
        let key = physical_key(logical, identity);
        self.metrics.record_read(logical);

        match self.backend.get(&key) {
            Ok(Some(raw)) => self.decode(logical, &key, &raw).unwrap_or_default(),
            Ok(None) => {
                debug!(key = %key, "Partition miss");
                self.metrics.record_miss(logical);
                T::default()
            }
            Err(e) => {
                error!(key = %key, error = %e, "Partition read failed");
                self.metrics.record_error(logical, e.kind());
                T::default()
            }
        }
    }

    /// Serialize and write an identity's partition
    pub fn write<T>(&self, logical: LogicalKey, identity: &Identity, value: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let key = physical_key(logical, identity);
        let data = serde_json::to_string(value)?;

        match self.backend.set(&key, &data) {
            Ok(()) => {
                debug!(key = %key, bytes = data.len(), "Partition written");
                self.metrics.record_write(logical);
                Ok(())
            }
            Err(e) => {
                error!(key = %key, error = %e, "Partition write failed");
                self.metrics.record_error(logical, e.kind());
                Err(e)
            }
        }
    }

    /// Remove an identity's partition entirely
    pub fn clear(&self, logical: LogicalKey, identity: &Identity) -> StoreResult<()> {
        let key = physical_key(logical, identity);
        self.backend.remove(&key).map_err(|e| {
            self.metrics.record_error(logical, e.kind());
            e
        })
    }

    /// Every partition of `logical`, whichever identity owns it
    ///
    /// Ordered by identity id. Unparseable partitions are logged and yield
    /// the default value rather than being dropped, so callers still see
    /// which identities exist.
    pub fn list_partitions<T>(&self, logical: LogicalKey) -> Vec<(Identity, T)>
    where
        T: DeserializeOwned + Default,
    {
        self.metrics.record_scan(logical);

        let keys = match self.backend.keys_with_prefix(&logical.partition_prefix()) {
            Ok(keys) => keys,
            Err(e) => {
                error!(logical_key = %logical, error = %e, "Partition scan failed");
                self.metrics.record_error(logical, e.kind());
                return Vec::new();
            }
        };

        let mut partitions: Vec<(Identity, T)> = keys
            .into_iter()
            .filter_map(|key| {
                let identity = parse_physical_key(logical, &key)?;
                let value = match self.backend.get(&key) {
                    Ok(Some(raw)) => self.decode(logical, &key, &raw).unwrap_or_default(),
                    Ok(None) => T::default(),
                    Err(e) => {
                        error!(key = %key, error = %e, "Partition read failed during scan");
                        self.metrics.record_error(logical, e.kind());
                        T::default()
                    }
                };
                Some((identity, value))
            })
            .collect();

        partitions.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(logical_key = %logical, partitions = partitions.len(), "Partition scan");
        partitions
    }

    fn decode<T: DeserializeOwned>(&self, logical: LogicalKey, key: &str, raw: &str) -> Option<T> {
        match serde_json::from_str::<T>(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = StoreError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "Corrupt partition value replaced by default");
                self.metrics.record_corrupt(logical);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn store() -> (Arc<MemoryStore>, PartitionedStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = PartitionedStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn test_read_missing_returns_default() {
        let (_, store) = store();
        let liked: Vec<String> = store.read(LogicalKey::LikedPosts, &Identity::new("u1"));
        assert!(liked.is_empty());
    }

    #[test]
    fn test_write_then_read_is_identity_scoped() {
        let (_, store) = store();
        let u1 = Identity::new("u1");
        let u2 = Identity::new("u2");

        store
            .write(LogicalKey::SavedPosts, &u1, &vec!["p1".to_string()])
            .unwrap();

        let saved_u1: Vec<String> = store.read(LogicalKey::SavedPosts, &u1);
        let saved_u2: Vec<String> = store.read(LogicalKey::SavedPosts, &u2);
        assert_eq!(saved_u1, vec!["p1"]);
        assert!(saved_u2.is_empty());
    }

    #[test]
    fn test_corrupt_value_degrades_to_default() {
        let (backend, store) = store();
        backend.set("likedPosts_u1", "{{{ definitely not json").unwrap();

        let liked: Vec<String> = store.read(LogicalKey::LikedPosts, &Identity::new("u1"));
        assert!(liked.is_empty());
    }

    #[test]
    fn test_list_partitions_scans_every_identity() {
        let (backend, store) = store();
        backend.set("userPosts_zed", "[1]").unwrap();
        backend.set("userPosts_amy", "[2, 3]").unwrap();
        backend.set("userPosts_broken", "nope").unwrap();
        // Legacy and foreign keys are not partitions
        backend.set("userPosts", "[9]").unwrap();
        backend.set("likedPosts_amy", "[\"x\"]").unwrap();

        let partitions: Vec<(Identity, Vec<u32>)> = store.list_partitions(LogicalKey::UserPosts);
        assert_eq!(
            partitions,
            vec![
                (Identity::new("amy"), vec![2, 3]),
                (Identity::new("broken"), vec![]),
                (Identity::new("zed"), vec![1]),
            ]
        );
    }

    #[test]
    fn test_list_partitions_maps() {
        let (_, store) = store();
        let mut counts = HashMap::new();
        counts.insert("demo-1".to_string(), 43u32);
        store
            .write(LogicalKey::DefaultPostCounts, &Identity::new("u1"), &counts)
            .unwrap();

        let partitions: Vec<(Identity, HashMap<String, u32>)> =
            store.list_partitions(LogicalKey::DefaultPostCounts);
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].1.get("demo-1"), Some(&43));
    }

    #[test]
    fn test_clear_removes_partition() {
        let (backend, store) = store();
        let u1 = Identity::new("u1");
        store
            .write(LogicalKey::UserPosts, &u1, &Vec::<u32>::new())
            .unwrap();
        store.clear(LogicalKey::UserPosts, &u1).unwrap();
        assert!(backend.is_empty());
    }
}
