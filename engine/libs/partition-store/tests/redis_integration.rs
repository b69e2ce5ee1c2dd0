//! Integration tests for the Redis backend
//!
//! These tests require a running Redis instance.
//! Run with: cargo test --test redis_integration -- --ignored

use partition_store::{Identity, KeyValueStore, LogicalKey, PartitionedStore, RedisStore};
use std::sync::Arc;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

fn unique_namespace(test: &str) -> String {
    format!(
        "feed-test:{}:{}:",
        test,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[test]
#[ignore] // Requires Redis server
fn test_read_write_roundtrip() {
    let backend = RedisStore::connect(REDIS_URL, unique_namespace("roundtrip"))
        .expect("Failed to connect to redis");
    let store = PartitionedStore::new(Arc::new(backend));
    let u1 = Identity::new("u1");

    store
        .write(LogicalKey::LikedPosts, &u1, &vec!["demo-1".to_string()])
        .expect("Failed to write");

    let liked: Vec<String> = store.read(LogicalKey::LikedPosts, &u1);
    assert_eq!(liked, vec!["demo-1"]);
}

#[test]
#[ignore] // Requires Redis server
fn test_prefix_scan_is_namespace_scoped() {
    let namespace = unique_namespace("scan");
    let backend = RedisStore::connect(REDIS_URL, namespace.clone())
        .expect("Failed to connect to redis");
    let other = RedisStore::connect(REDIS_URL, unique_namespace("scan-other"))
        .expect("Failed to connect to redis");

    backend.set("userPosts_u1", "[]").unwrap();
    backend.set("userPosts_u2", "[]").unwrap();
    backend.set("userPosts", "[]").unwrap();
    other.set("userPosts_u3", "[]").unwrap();

    let keys = backend.keys_with_prefix("userPosts_").unwrap();
    assert_eq!(keys, vec!["userPosts_u1", "userPosts_u2"]);

    for key in ["userPosts_u1", "userPosts_u2", "userPosts"] {
        backend.remove(key).unwrap();
    }
    other.remove("userPosts_u3").unwrap();
}
