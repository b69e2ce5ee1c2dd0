//! Redis backend
//!
//! Keys are stored as plain strings under a namespace prefix
//! (e.g. `feed:userPosts_u1`). Prefix listing uses cursor-based SCAN, never KEYS.

use crate::{KeyValueStore, StoreResult};
use parking_lot::Mutex;
use redis::{Client, Commands, Connection};
use tracing::debug;

/// Default namespace prepended to every physical key
pub const DEFAULT_NAMESPACE: &str = "feed:";

/// Key-value store backed by a Redis server
pub struct RedisStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `namespace` - Prefix applied to every key (e.g., "feed:")
    pub fn connect(redis_url: &str, namespace: impl Into<String>) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection()?;
        let namespace = namespace.into();

        debug!(namespace = %namespace, "Connected redis store");

        Ok(Self {
            conn: Mutex::new(conn),
            namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

/// Escape glob metacharacters so a literal prefix can be used in SCAN MATCH
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.lock();
        let value: Option<String> = conn.get(self.namespaced(key))?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        conn.set::<_, _, ()>(self.namespaced(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        conn.del::<_, ()>(self.namespaced(key))?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.namespaced(prefix)));

        let mut conn = self.conn.lock();
        let found: Vec<String> = conn.scan_match::<_, String>(&pattern)?.collect();

        let mut keys: Vec<String> = found
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.namespace).map(str::to_string))
            .collect();
        // SCAN may return duplicates and gives no ordering guarantee
        keys.sort();
        keys.dedup();

        debug!(pattern = %pattern, count = keys.len(), "Redis prefix scan");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("feed:userPosts_"), "feed:userPosts_");
        assert_eq!(escape_glob("a*b?c"), "a\\*b\\?c");
        assert_eq!(escape_glob("[x]\\"), "\\[x\\]\\\\");
    }
}
