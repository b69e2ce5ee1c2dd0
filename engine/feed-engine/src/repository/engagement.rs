use super::log_absorbed;
use super::posts::{FeedRepository, Persist};
use crate::domain::{Counter, Post};
use crate::error::EngineResult;
use notification_bus::{Notification, NotificationBus, Topic};
use parking_lot::Mutex;
use partition_store::{Identity, LogicalKey, PartitionedStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Which per-identity engagement set a toggle addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    Liked,
    Saved,
}

impl EngagementKind {
    pub fn logical_key(self) -> LogicalKey {
        match self {
            EngagementKind::Liked => LogicalKey::LikedPosts,
            EngagementKind::Saved => LogicalKey::SavedPosts,
        }
    }

    pub fn topic(self) -> Topic {
        match self {
            EngagementKind::Liked => Topic::LikeChanged,
            EngagementKind::Saved => Topic::SaveChanged,
        }
    }

    pub fn counter(self) -> Counter {
        match self {
            EngagementKind::Liked => Counter::Likes,
            EngagementKind::Saved => Counter::Saves,
        }
    }
}

/// Per-identity liked/saved sets plus the shared post counters
///
/// Membership is private to each identity; the counter on the post is
/// shared by everyone.
pub struct EngagementSetManager {
    store: PartitionedStore,
    repository: Arc<FeedRepository>,
    bus: NotificationBus,
    /// Held across each read-flip-write of a set
    toggles: Mutex<()>,
}

impl EngagementSetManager {
    pub fn new(store: PartitionedStore, repository: Arc<FeedRepository>, bus: NotificationBus) -> Self {
        Self {
            store,
            repository,
            bus,
            toggles: Mutex::new(()),
        }
    }

    pub fn toggle_like(&self, active: &Identity, post_id: &str) -> bool {
        self.toggle(EngagementKind::Liked, active, post_id)
    }

    pub fn toggle_save(&self, active: &Identity, post_id: &str) -> bool {
        self.toggle(EngagementKind::Saved, active, post_id)
    }

    /// Flip membership of `post_id`, step the shared counter, then notify
    ///
    /// Returns the new membership state. A post missing from the feed still
    /// flips membership; only the counter step is skipped. When the set
    /// cannot be written nothing changes and the stored state is returned.
    pub fn toggle(&self, kind: EngagementKind, active: &Identity, post_id: &str) -> bool {
        match self.try_toggle(kind, active, post_id) {
            Ok(new_state) => new_state,
            Err(e) => {
                log_absorbed("toggle", &e);
                self.contains(kind, active, post_id)
            }
        }
    }

    pub fn try_toggle(
        &self,
        kind: EngagementKind,
        active: &Identity,
        post_id: &str,
    ) -> EngineResult<bool> {
        let (new_state, count) = {
            let _guard = self.toggles.lock();

            let mut members = self.members(kind, active);
            let new_state = match members.iter().position(|id| id == post_id) {
                Some(index) => {
                    members.remove(index);
                    false
                }
                None => {
                    members.push(post_id.to_string());
                    true
                }
            };

            // The counter only follows a membership change that reached the store
            self.store.write(kind.logical_key(), active, &members)?;

            let count = self
                .repository
                .modify(active, post_id, Persist::Counters, |post| {
                    Ok(kind.counter().step(post, new_state))
                })
                .map_err(|e| debug!(post_id, error = %e, "Counter not stepped"))
                .ok();

            (new_state, count)
        };

        info!(
            post_id,
            identity = %active,
            kind = ?kind,
            new_state,
            count = ?count,
            "Engagement toggled"
        );

        let mut notification = Notification::new(kind.topic(), post_id, new_state);
        if let Some(count) = count {
            notification = notification.with_count(count);
        }
        self.bus.publish(notification);

        Ok(new_state)
    }

    pub fn is_liked(&self, active: &Identity, post_id: &str) -> bool {
        self.contains(EngagementKind::Liked, active, post_id)
    }

    pub fn is_saved(&self, active: &Identity, post_id: &str) -> bool {
        self.contains(EngagementKind::Saved, active, post_id)
    }

    pub fn contains(&self, kind: EngagementKind, identity: &Identity, post_id: &str) -> bool {
        self.members(kind, identity).iter().any(|id| id == post_id)
    }

    /// Post ids in an identity's set, in toggle order, duplicates removed
    pub fn members(&self, kind: EngagementKind, identity: &Identity) -> Vec<String> {
        let raw: Vec<String> = self.store.read(kind.logical_key(), identity);
        let mut seen = HashSet::new();
        raw.into_iter().filter(|id| seen.insert(id.clone())).collect()
    }

    /// Feed posts the identity has liked
    pub fn liked_posts(&self, identity: &Identity) -> Vec<Post> {
        self.repository
            .select(&self.members(EngagementKind::Liked, identity))
    }

    /// Feed posts the identity has saved
    pub fn saved_posts(&self, identity: &Identity) -> Vec<Post> {
        self.repository
            .select(&self.members(EngagementKind::Saved, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Actor, CurrentUser, PostDraft, SeedCatalog};
    use chrono::Utc;
    use partition_store::{KeyValueStore, MemoryStore, StoreError, StoreResult};

    /// Memory backend that refuses writes to liked sets
    struct LikedWritesFail(MemoryStore);

    impl KeyValueStore for LikedWritesFail {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            if key.starts_with("likedPosts_") {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            self.0.remove(key)
        }

        fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
            self.0.keys_with_prefix(prefix)
        }
    }

    fn setup(catalog: SeedCatalog) -> (Arc<MemoryStore>, Arc<FeedRepository>, EngagementSetManager) {
        let backend = Arc::new(MemoryStore::new());
        let store = PartitionedStore::new(backend.clone());
        let repo = Arc::new(FeedRepository::new(store.clone(), catalog));
        let manager = EngagementSetManager::new(store, repo.clone(), NotificationBus::new());
        (backend, repo, manager)
    }

    #[test]
    fn test_toggle_flips_membership_and_counter() {
        let (_, repo, manager) = setup(SeedCatalog::empty());
        let u1 = Actor::from_user(Some(&CurrentUser::new("u1")));
        let post = repo.add_post(&u1, PostDraft::titled("A"));

        assert!(manager.toggle_like(&u1.identity, &post.id));
        assert!(manager.is_liked(&u1.identity, &post.id));
        assert_eq!(repo.get(&post.id).unwrap().likes_count, 1);

        assert!(!manager.toggle_like(&u1.identity, &post.id));
        assert!(!manager.is_liked(&u1.identity, &post.id));
        assert_eq!(repo.get(&post.id).unwrap().likes_count, 0);
    }

    #[test]
    fn test_unknown_post_still_flips_membership() {
        let (_, _, manager) = setup(SeedCatalog::empty());
        let u1 = Identity::new("u1");

        assert!(manager.toggle_save(&u1, "ghost"));
        assert!(manager.is_saved(&u1, "ghost"));
    }

    #[test]
    fn test_legacy_unscoped_set_is_ignored() {
        let (backend, _, manager) = setup(SeedCatalog::empty());
        backend.set("likedPosts", r#"["demo-1"]"#).unwrap();

        assert!(!manager.is_liked(&Identity::anonymous(), "demo-1"));
        manager.toggle_like(&Identity::anonymous(), "demo-1");
        assert_eq!(backend.get("likedPosts").unwrap().as_deref(), Some(r#"["demo-1"]"#));
    }

    #[test]
    fn test_duplicate_members_collapse_on_read() {
        let (backend, _, manager) = setup(SeedCatalog::empty());
        backend.set("savedPosts_u1", r#"["p1","p1","p2"]"#).unwrap();

        assert_eq!(manager.members(EngagementKind::Saved, &Identity::new("u1")), vec!["p1", "p2"]);
        assert!(!manager.toggle_save(&Identity::new("u1"), "p1"));
        assert!(!manager.is_saved(&Identity::new("u1"), "p1"));
    }

    #[test]
    fn test_saved_posts_follow_feed_order() {
        let (_, repo, manager) = setup(SeedCatalog::demo(Utc::now()));
        let u1 = Identity::new("u1");
        repo.load_all(&u1);

        manager.toggle_save(&u1, "demo-3");
        manager.toggle_save(&u1, "demo-1");

        let saved: Vec<String> = manager.saved_posts(&u1).into_iter().map(|p| p.id).collect();
        assert_eq!(saved, vec!["demo-1", "demo-3"]);
        assert!(manager.liked_posts(&u1).is_empty());
    }

    #[test]
    fn test_failed_set_write_leaves_counter_alone() {
        let store = PartitionedStore::new(Arc::new(LikedWritesFail(MemoryStore::new())));
        let repo = Arc::new(FeedRepository::new(store.clone(), SeedCatalog::empty()));
        let bus = NotificationBus::new();
        let manager = EngagementSetManager::new(store, repo.clone(), bus.clone());

        let u1 = Actor::from_user(Some(&CurrentUser::new("u1")));
        let post = repo.add_post(&u1, PostDraft::titled("A"));

        let seen = Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        let _sub = bus
            .subscribe(Topic::LikeChanged, move |_| *counter.lock() += 1)
            .unwrap();

        assert!(manager.try_toggle(EngagementKind::Liked, &u1.identity, &post.id).is_err());
        assert!(!manager.toggle_like(&u1.identity, &post.id));
        assert!(!manager.toggle_like(&u1.identity, &post.id));

        assert!(!manager.is_liked(&u1.identity, &post.id));
        assert_eq!(repo.get(&post.id).unwrap().likes_count, 0);
        assert_eq!(*seen.lock(), 0);

        // Saved sets are unaffected by the failing key
        assert!(manager.toggle_save(&u1.identity, &post.id));
        assert_eq!(repo.get(&post.id).unwrap().saves_count, 1);
    }
}
