use super::log_absorbed;
use crate::domain::{ids, legacy, Actor, Comment, CounterOverride, Post, PostDraft, PostPatch, SeedCatalog};
use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use partition_store::{Identity, LogicalKey, PartitionedStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, error, info, warn};

type OverrideTable = BTreeMap<String, CounterOverride>;

/// How an in-place change to a merged post is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persist {
    /// Like/save counters; seed posts go to the active identity's override table
    Counters,
    /// Comment tree; written into whichever partition holds the post
    Thread,
}

/// Repository for the merged feed
///
/// Reads every identity's `userPosts` partition plus the seed catalog and
/// keeps the merged, newest-first view in memory. Authored-post CRUD is
/// scoped to the active identity's partition.
pub struct FeedRepository {
    store: PartitionedStore,
    catalog: SeedCatalog,
    merged: RwLock<Vec<Post>>,
    /// Serialises partition read-modify-write cycles
    writes: Mutex<()>,
}

impl FeedRepository {
    pub fn new(store: PartitionedStore, catalog: SeedCatalog) -> Self {
        Self {
            store,
            catalog,
            merged: RwLock::new(Vec::new()),
            writes: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &SeedCatalog {
        &self.catalog
    }

    /// Rebuild the merged feed from every partition plus the catalog
    ///
    /// A partition entry whose id belongs to the catalog is a snapshot; the
    /// first one found contributes its comment tree to the catalog post.
    /// Counters for catalog posts come from the newest override entry.
    pub fn load_all(&self, active: &Identity) -> Vec<Post> {
        let partitions = self.store.list_partitions::<Vec<Value>>(LogicalKey::UserPosts);
        let partition_count = partitions.len();

        let mut seen = HashSet::new();
        let mut threads: HashMap<String, Vec<Comment>> = HashMap::new();
        let mut merged = Vec::new();

        for (identity, raw) in partitions {
            if identity.is_catalog() {
                warn!("Ignoring persisted partition for the catalog identity");
                continue;
            }
            for post in legacy::decode_partition(&identity, raw) {
                if self.catalog.contains(&post.id) {
                    threads.entry(post.id).or_insert(post.comments);
                } else if seen.insert(post.id.clone()) {
                    merged.push(post);
                } else {
                    debug!(post_id = %post.id, identity = %identity, "Duplicate post id ignored");
                }
            }
        }

        let overrides = self.latest_overrides(active);
        for seed in self.catalog.posts() {
            let mut post = seed.clone();
            if let Some(comments) = threads.remove(&post.id) {
                post.comments = comments;
            }
            if let Some(entry) = overrides.get(&post.id) {
                entry.apply(&mut post);
            }
            merged.push(post);
        }

        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(
            identity = %active,
            partitions = partition_count,
            posts = merged.len(),
            "Merged feed loaded"
        );

        *self.merged.write() = merged.clone();
        merged
    }

    /// Current merged feed without reloading
    pub fn posts(&self) -> Vec<Post> {
        self.merged.read().clone()
    }

    pub fn get(&self, post_id: &str) -> Option<Post> {
        self.merged.read().iter().find(|p| p.id == post_id).cloned()
    }

    /// Posts of the merged feed whose ids are in `ids`, feed order
    pub fn select(&self, ids: &[String]) -> Vec<Post> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.merged
            .read()
            .iter()
            .filter(|p| wanted.contains(p.id.as_str()))
            .cloned()
            .collect()
    }

    /// Publish a new post into the active identity's partition
    /// Prepend a post to the actor's partition
    ///
    /// A supplied id that already names a catalog or feed post is replaced
    /// with a fresh one.
    pub fn add_post(&self, actor: &Actor, mut draft: PostDraft) -> Post {
        if let Some(requested) = draft.id.as_deref() {
            if self.catalog.contains(requested) || self.get(requested).is_some() {
                warn!(post_id = requested, "Draft id already taken, assigning a new one");
                draft.id = None;
            }
        }

        let post = draft.into_post(actor, ids::post_id(), Utc::now());
        let identity = &actor.identity;

        let _guard = self.writes.lock();
        let mut posts = self.read_partition(identity);
        posts.insert(0, post.clone());

        match self.write_partition(identity, &posts) {
            Ok(()) => {
                self.load_all(identity);
            }
            Err(e) => {
                error!(post_id = %post.id, error = %e, "Failed to persist new post; kept in memory");
                let mut merged = self.merged.write();
                merged.insert(0, post.clone());
                merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }

        info!(post_id = %post.id, identity = %identity, "Post added");
        post
    }

    pub fn try_remove_post(&self, active: &Identity, post_id: &str) -> EngineResult<()> {
        if self.catalog.contains(post_id) {
            return Err(EngineError::CatalogReadOnly(post_id.to_string()));
        }

        let _guard = self.writes.lock();
        let mut posts = self.read_partition(active);
        let before = posts.len();
        posts.retain(|p| p.id != post_id);
        if posts.len() == before {
            return Err(EngineError::LookupMiss(format!(
                "post {} in partition {}",
                post_id, active
            )));
        }

        self.write_partition(active, &posts)?;
        self.load_all(active);
        Ok(())
    }

    /// Remove a post from the active identity's partition
    ///
    /// Only the active partition is searched, so another identity's post
    /// is never removed. Returns whether anything was removed.
    pub fn remove_post(&self, active: &Identity, post_id: &str) -> bool {
        match self.try_remove_post(active, post_id) {
            Ok(()) => {
                info!(post_id, identity = %active, "Post removed");
                true
            }
            Err(e) => {
                log_absorbed("remove_post", &e);
                false
            }
        }
    }

    pub fn try_update_post(
        &self,
        active: &Identity,
        post_id: &str,
        patch: PostPatch,
    ) -> EngineResult<Post> {
        if self.catalog.contains(post_id) {
            return Err(EngineError::CatalogReadOnly(post_id.to_string()));
        }

        let _guard = self.writes.lock();
        let mut posts = self.read_partition(active);
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| {
                EngineError::LookupMiss(format!("post {} in partition {}", post_id, active))
            })?;
        patch.apply(post);
        let updated = post.clone();

        self.write_partition(active, &posts)?;
        self.load_all(active);
        Ok(updated)
    }

    /// Shallow-merge `patch` into a post of the active identity's partition
    pub fn update_post(&self, active: &Identity, post_id: &str, patch: PostPatch) -> Option<Post> {
        match self.try_update_post(active, post_id, patch) {
            Ok(post) => {
                info!(post_id, identity = %active, "Post updated");
                Some(post)
            }
            Err(e) => {
                log_absorbed("update_post", &e);
                None
            }
        }
    }

    /// Posts authored while `identity` was active, newest first
    ///
    /// Catalog snapshots stored in the partition are not authored posts and
    /// are left out.
    pub fn get_by_identity(&self, identity: &Identity) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .read_partition(identity)
            .into_iter()
            .filter(|p| !self.catalog.contains(&p.id))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    /// Id of the post whose top-level comments include `comment_id`
    pub fn locate_comment(&self, comment_id: &str) -> Option<String> {
        self.merged
            .read()
            .iter()
            .find(|p| p.find_comment(comment_id).is_some())
            .map(|p| p.id.clone())
    }

    /// `(post id, parent comment id)` of the reply `reply_id`
    pub fn locate_reply(&self, reply_id: &str) -> Option<(String, String)> {
        self.merged.read().iter().find_map(|p| {
            p.find_reply_parent(reply_id)
                .map(|parent| (p.id.clone(), parent.to_string()))
        })
    }

    /// Mutate a merged post in place, then write it back
    ///
    /// Fails only when the post is missing or `mutate` fails; a failed write
    /// is logged and the in-memory change is kept.
    pub fn modify<R>(
        &self,
        active: &Identity,
        post_id: &str,
        persist: Persist,
        mutate: impl FnOnce(&mut Post) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let _guard = self.writes.lock();

        let (result, snapshot) = {
            let mut merged = self.merged.write();
            let post = merged
                .iter_mut()
                .find(|p| p.id == post_id)
                .ok_or_else(|| EngineError::lookup_miss("post", post_id))?;
            let result = mutate(post)?;
            (result, post.clone())
        };

        if let Err(e) = self.persist(active, &snapshot, persist) {
            error!(post_id, error = %e, "Failed to persist post change; kept in memory");
        }
        Ok(result)
    }

    fn persist(&self, active: &Identity, post: &Post, persist: Persist) -> EngineResult<()> {
        let is_seed = self.catalog.contains(&post.id);

        if is_seed && persist == Persist::Counters {
            let mut table: OverrideTable = self.store.read(LogicalKey::DefaultPostCounts, active);
            table.insert(post.id.clone(), CounterOverride::capture(post, Utc::now()));
            self.store
                .write(LogicalKey::DefaultPostCounts, active, &table)?;
            debug!(post_id = %post.id, identity = %active, "Seed counters recorded");
            return Ok(());
        }

        match self.holder_of(&post.id) {
            Some((holder, mut posts)) => {
                if let Some(slot) = posts.iter_mut().find(|p| p.id == post.id) {
                    *slot = post.clone();
                }
                self.write_partition(&holder, &posts)?;
                debug!(post_id = %post.id, holder = %holder, "Post written to holder partition");
            }
            None if is_seed => {
                let mut posts = self.read_partition(active);
                posts.insert(0, post.clone());
                self.write_partition(active, &posts)?;
                debug!(post_id = %post.id, identity = %active, "Seed snapshot created");
            }
            None => {
                warn!(post_id = %post.id, "No partition holds post; change kept in memory only");
            }
        }
        Ok(())
    }

    /// First partition, in identity order, containing `post_id`
    fn holder_of(&self, post_id: &str) -> Option<(Identity, Vec<Post>)> {
        self.store
            .list_partitions::<Vec<Value>>(LogicalKey::UserPosts)
            .into_iter()
            .filter(|(identity, _)| !identity.is_catalog())
            .map(|(identity, raw)| {
                let posts = legacy::decode_partition(&identity, raw);
                (identity, posts)
            })
            .find(|(_, posts)| posts.iter().any(|p| p.id == post_id))
    }

    /// Per seed post, the most recently updated override across identities
    fn latest_overrides(&self, active: &Identity) -> HashMap<String, CounterOverride> {
        let mut latest: HashMap<String, (CounterOverride, bool)> = HashMap::new();

        for (identity, table) in self
            .store
            .list_partitions::<OverrideTable>(LogicalKey::DefaultPostCounts)
        {
            let is_active = &identity == active;
            for (post_id, entry) in table {
                if !self.catalog.contains(&post_id) {
                    continue;
                }
                let newer = match latest.get(&post_id) {
                    Some((current, current_active)) => {
                        (entry.updated_at, is_active) > (current.updated_at, *current_active)
                    }
                    None => true,
                };
                if newer {
                    latest.insert(post_id, (entry, is_active));
                }
            }
        }

        latest
            .into_iter()
            .map(|(post_id, (entry, _))| (post_id, entry))
            .collect()
    }

    fn read_partition(&self, identity: &Identity) -> Vec<Post> {
        let raw: Vec<Value> = self.store.read(LogicalKey::UserPosts, identity);
        legacy::decode_partition(identity, raw)
    }

    fn write_partition(&self, identity: &Identity, posts: &[Post]) -> EngineResult<()> {
        self.store.write(LogicalKey::UserPosts, identity, posts)?;
        Ok(())
    }
}
