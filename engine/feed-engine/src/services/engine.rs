use crate::config::{Config, StoreBackend};
use crate::domain::{Actor, Comment, CurrentUser, Post, PostDraft, PostPatch, ProfileStats, Reply, SeedCatalog};
use crate::error::{EngineError, EngineResult};
use crate::repository::{log_absorbed, CommentTreeManager, EngagementSetManager, FeedRepository, NodeRef};
use anyhow::{Context, Result};
use chrono::Utc;
use notification_bus::NotificationBus;
use parking_lot::RwLock;
use partition_store::{FileStore, Identity, MemoryStore, PartitionedStore, RedisStore, SharedStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Engine-level switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Reject deletes issued by someone other than the author
    pub enforce_authorship: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enforce_authorship: true,
        }
    }
}

/// Facade owning the active identity and every manager
///
/// Architecture:
/// - One [`PartitionedStore`] shared by the repository and engagement sets
/// - One [`NotificationBus`] injected at construction and torn down by [`FeedEngine::shutdown`]
/// - Identity switches reload the merged view for the new identity
pub struct FeedEngine {
    options: EngineOptions,
    store: PartitionedStore,
    bus: NotificationBus,
    repository: Arc<FeedRepository>,
    engagement: EngagementSetManager,
    comments: CommentTreeManager,
    actor: RwLock<Actor>,
}

impl FeedEngine {
    /// Wire the managers and load the feed as the anonymous identity
    pub fn new(
        store: PartitionedStore,
        bus: NotificationBus,
        catalog: SeedCatalog,
        options: EngineOptions,
    ) -> Self {
        let repository = Arc::new(FeedRepository::new(store.clone(), catalog));
        let engagement = EngagementSetManager::new(store.clone(), repository.clone(), bus.clone());
        let comments = CommentTreeManager::new(repository.clone());
        let actor = Actor::anonymous();

        repository.load_all(&actor.identity);

        Self {
            options,
            store,
            bus,
            repository,
            engagement,
            comments,
            actor: RwLock::new(actor),
        }
    }

    /// Ephemeral engine over an in-memory store with the demo catalog
    pub fn in_memory() -> Self {
        Self::new(
            PartitionedStore::new(Arc::new(MemoryStore::new())),
            NotificationBus::new(),
            SeedCatalog::demo(Utc::now()),
            EngineOptions::default(),
        )
    }

    /// Build the configured store backend, a fresh bus and the managers
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: SharedStore = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File => Arc::new(
                FileStore::open(&config.store.path)
                    .with_context(|| format!("Failed to open store file {}", config.store.path))?,
            ),
            StoreBackend::Redis => {
                let url = config
                    .store
                    .redis_url
                    .as_deref()
                    .context("Redis backend selected without a Redis URL")?;
                Arc::new(
                    RedisStore::connect(url, config.store.redis_namespace.clone())
                        .context("Failed to connect to Redis")?,
                )
            }
        };

        let catalog = if config.engine.seed_catalog {
            SeedCatalog::demo(Utc::now())
        } else {
            SeedCatalog::empty()
        };

        info!(
            env = %config.app.env,
            backend = ?config.store.backend,
            seed_posts = catalog.len(),
            enforce_authorship = config.engine.enforce_authorship,
            "Feed engine starting"
        );

        Ok(Self::new(
            PartitionedStore::new(backend),
            NotificationBus::new(),
            catalog,
            EngineOptions {
                enforce_authorship: config.engine.enforce_authorship,
            },
        ))
    }

    // ========== Identity ==========

    /// Switch the active identity and reload every per-identity view
    pub fn set_current_user(&self, user: Option<&CurrentUser>) -> Vec<Post> {
        let actor = Actor::from_user(user);
        let identity = actor.identity.clone();
        *self.actor.write() = actor;

        info!(identity = %identity, "Active identity changed");
        self.repository.load_all(&identity)
    }

    pub fn actor(&self) -> Actor {
        self.actor.read().clone()
    }

    pub fn identity(&self) -> Identity {
        self.actor.read().identity.clone()
    }

    // ========== Feed ==========

    /// Merged feed as last loaded
    pub fn feed(&self) -> Vec<Post> {
        self.repository.posts()
    }

    /// Re-read every partition
    pub fn reload(&self) -> Vec<Post> {
        self.repository.load_all(&self.identity())
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.repository.get(post_id)
    }

    pub fn publish_post(&self, draft: PostDraft) -> Post {
        self.repository.add_post(&self.actor(), draft)
    }

    pub fn update_post(&self, post_id: &str, patch: PostPatch) -> Option<Post> {
        let identity = self.identity();
        if let Err(e) = self.check_post_author(&identity, post_id) {
            log_absorbed("update_post", &e);
            return None;
        }
        self.repository.update_post(&identity, post_id, patch)
    }

    pub fn delete_post(&self, post_id: &str) -> bool {
        let identity = self.identity();
        if let Err(e) = self.check_post_author(&identity, post_id) {
            log_absorbed("delete_post", &e);
            return false;
        }
        self.repository.remove_post(&identity, post_id)
    }

    /// Posts authored by the active identity
    pub fn my_posts(&self) -> Vec<Post> {
        self.repository.get_by_identity(&self.identity())
    }

    // ========== Engagement ==========

    pub fn toggle_like(&self, post_id: &str) -> bool {
        self.engagement.toggle_like(&self.identity(), post_id)
    }

    pub fn toggle_save(&self, post_id: &str) -> bool {
        self.engagement.toggle_save(&self.identity(), post_id)
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        self.engagement.is_liked(&self.identity(), post_id)
    }

    pub fn is_saved(&self, post_id: &str) -> bool {
        self.engagement.is_saved(&self.identity(), post_id)
    }

    pub fn liked_posts(&self) -> Vec<Post> {
        self.engagement.liked_posts(&self.identity())
    }

    pub fn saved_posts(&self) -> Vec<Post> {
        self.engagement.saved_posts(&self.identity())
    }

    /// Authored post count plus likes and saves received on them
    pub fn profile_stats(&self) -> ProfileStats {
        let posts = self.my_posts();
        let likes_and_saves = posts
            .iter()
            .map(|p| u64::from(p.likes_count) + u64::from(p.saves_count))
            .sum();
        ProfileStats {
            posts: posts.len(),
            likes_and_saves,
        }
    }

    // ========== Comments ==========

    pub fn add_comment(&self, post_id: &str, text: &str) -> Option<Comment> {
        self.comments.add_comment(&self.actor(), post_id, text)
    }

    pub fn add_reply(&self, parent_comment_id: &str, text: &str) -> Option<Reply> {
        self.comments.add_reply(&self.actor(), parent_comment_id, text)
    }

    pub fn like_comment(&self, node: &NodeRef, liked: bool) -> Option<u32> {
        self.comments.like_node(&self.identity(), node, liked)
    }

    /// Delete a comment or reply; only its author may when enforcement is on
    pub fn delete_comment(&self, node: &NodeRef) -> bool {
        let identity = self.identity();
        if self.options.enforce_authorship {
            if let Some(author) = self.comments.node_author(node) {
                if !author.is(&identity) {
                    let err = EngineError::AuthorshipViolation {
                        actor: identity.id.clone(),
                        target: node.id().to_string(),
                    };
                    warn!(error = %err, "Comment delete rejected");
                    return false;
                }
            }
        }
        self.comments.delete_node(&identity, node)
    }

    // ========== Components ==========

    pub fn repository(&self) -> &Arc<FeedRepository> {
        &self.repository
    }

    pub fn engagement(&self) -> &EngagementSetManager {
        &self.engagement
    }

    pub fn comments(&self) -> &CommentTreeManager {
        &self.comments
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn store(&self) -> &PartitionedStore {
        &self.store
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Close the bus; every surface subscription is dropped
    pub fn shutdown(&self) {
        self.bus.shutdown();
        info!("Feed engine shut down");
    }

    fn check_post_author(&self, identity: &Identity, post_id: &str) -> EngineResult<()> {
        if !self.options.enforce_authorship {
            return Ok(());
        }
        match self.repository.get(post_id) {
            Some(post) if !post.author.is(identity) => Err(EngineError::AuthorshipViolation {
                actor: identity.id.clone(),
                target: post_id.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(options: EngineOptions) -> FeedEngine {
        FeedEngine::new(
            PartitionedStore::new(Arc::new(MemoryStore::new())),
            NotificationBus::new(),
            SeedCatalog::empty(),
            options,
        )
    }

    #[test]
    fn test_starts_anonymous_with_demo_feed() {
        let engine = FeedEngine::in_memory();
        assert!(engine.identity().is_anonymous());
        assert_eq!(engine.feed().len(), 12);
        assert_eq!(engine.feed()[0].id, "demo-1");
    }

    #[test]
    fn test_from_config_without_catalog() {
        let mut config = Config::default();
        config.engine.seed_catalog = false;

        let engine = FeedEngine::from_config(&config).unwrap();
        assert!(engine.feed().is_empty());
        assert!(engine.options().enforce_authorship);
    }

    #[test]
    fn test_from_config_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.backend = StoreBackend::File;
        config.store.path = dir.path().join("feed.json").display().to_string();

        let engine = FeedEngine::from_config(&config).unwrap();
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        let post = engine.publish_post(PostDraft::titled("persisted"));

        let reopened = FeedEngine::from_config(&config).unwrap();
        assert!(reopened.post(&post.id).is_some());
    }

    #[test]
    fn test_identity_switch_changes_author() {
        let engine = engine(EngineOptions::default());
        engine.set_current_user(Some(&CurrentUser::new("u1").with_name("Mia")));
        let post = engine.publish_post(PostDraft::titled("A"));

        assert_eq!(post.author.name, "Mia");
        assert_eq!(engine.my_posts().len(), 1);

        engine.set_current_user(None);
        assert!(engine.my_posts().is_empty());
        assert_eq!(engine.feed().len(), 1);
    }

    #[test]
    fn test_non_author_cannot_delete_post() {
        let engine = engine(EngineOptions::default());
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        let post = engine.publish_post(PostDraft::titled("A"));

        engine.set_current_user(Some(&CurrentUser::new("u2")));
        assert!(!engine.delete_post(&post.id));
        assert!(engine.update_post(&post.id, PostPatch::default()).is_none());

        engine.set_current_user(Some(&CurrentUser::new("u1")));
        assert!(engine.delete_post(&post.id));
        assert!(engine.post(&post.id).is_none());
    }

    #[test]
    fn test_comment_delete_authorship() {
        let engine = engine(EngineOptions::default());
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        let post = engine.publish_post(PostDraft::titled("A"));
        let comment = engine.add_comment(&post.id, "mine").unwrap();
        let node = NodeRef::comment(&comment.id);

        engine.set_current_user(Some(&CurrentUser::new("u2")));
        assert!(!engine.delete_comment(&node));
        assert_eq!(engine.post(&post.id).unwrap().comments.len(), 1);

        engine.set_current_user(Some(&CurrentUser::new("u1")));
        assert!(engine.delete_comment(&node));
    }

    #[test]
    fn test_comment_delete_unenforced() {
        let engine = engine(EngineOptions {
            enforce_authorship: false,
        });
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        let post = engine.publish_post(PostDraft::titled("A"));
        let comment = engine.add_comment(&post.id, "mine").unwrap();

        engine.set_current_user(Some(&CurrentUser::new("u2")));
        assert!(engine.delete_comment(&NodeRef::comment(&comment.id)));
    }

    #[test]
    fn test_profile_stats() {
        let engine = engine(EngineOptions::default());
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        let a = engine.publish_post(PostDraft::titled("A"));
        engine.publish_post(PostDraft::titled("B"));
        engine.toggle_like(&a.id);
        engine.toggle_save(&a.id);

        engine.set_current_user(Some(&CurrentUser::new("u2")));
        engine.toggle_like(&a.id);

        engine.set_current_user(Some(&CurrentUser::new("u1")));
        assert_eq!(
            engine.profile_stats(),
            ProfileStats {
                posts: 2,
                likes_and_saves: 3
            }
        );
    }
}
