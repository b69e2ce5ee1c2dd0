use super::log_absorbed;
use super::posts::{FeedRepository, Persist};
use crate::domain::{ids, models::step_count, Actor, AuthorRef, Comment, Reply};
use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use partition_store::Identity;
use std::sync::Arc;
use tracing::info;

/// Address of a node in a post's two-level comment tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Comment {
        id: String,
    },
    /// Without a parent id every comment is searched
    Reply {
        id: String,
        parent_id: Option<String>,
    },
}

impl NodeRef {
    pub fn comment(id: impl Into<String>) -> Self {
        NodeRef::Comment { id: id.into() }
    }

    pub fn reply(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        NodeRef::Reply {
            id: id.into(),
            parent_id: Some(parent_id.into()),
        }
    }

    /// Build from the `(id, is_reply, parent_id)` triple used by surfaces
    pub fn from_parts(id: &str, is_reply: bool, parent_id: Option<&str>) -> Self {
        if is_reply {
            NodeRef::Reply {
                id: id.to_string(),
                parent_id: parent_id.map(str::to_string),
            }
        } else {
            NodeRef::comment(id)
        }
    }

    pub fn id(&self) -> &str {
        match self {
            NodeRef::Comment { id } | NodeRef::Reply { id, .. } => id,
        }
    }

    fn describe(&self) -> String {
        match self {
            NodeRef::Comment { id } => format!("comment {}", id),
            NodeRef::Reply { id, .. } => format!("reply {}", id),
        }
    }
}

/// Comments and replies on any post of the merged feed
///
/// Authorship of deletes is the caller's responsibility; see
/// [`FeedEngine::delete_comment`](crate::services::FeedEngine::delete_comment).
pub struct CommentTreeManager {
    repository: Arc<FeedRepository>,
}

impl CommentTreeManager {
    pub fn new(repository: Arc<FeedRepository>) -> Self {
        Self { repository }
    }

    pub fn try_add_comment(&self, actor: &Actor, post_id: &str, text: &str) -> EngineResult<Comment> {
        let text = non_empty(text)?;
        let comment = Comment {
            id: ids::comment_id(),
            text,
            author: actor.author.clone(),
            timestamp: Utc::now(),
            likes_count: 0,
            replies: Vec::new(),
        };

        self.repository
            .modify(&actor.identity, post_id, Persist::Thread, |post| {
                post.comments.push(comment.clone());
                Ok(())
            })?;
        Ok(comment)
    }

    /// Append a comment to a post, authored by the actor
    pub fn add_comment(&self, actor: &Actor, post_id: &str, text: &str) -> Option<Comment> {
        match self.try_add_comment(actor, post_id, text) {
            Ok(comment) => {
                info!(post_id, comment_id = %comment.id, identity = %actor.identity, "Comment added");
                Some(comment)
            }
            Err(e) => {
                log_absorbed("add_comment", &e);
                None
            }
        }
    }

    pub fn try_add_reply(&self, actor: &Actor, parent_comment_id: &str, text: &str) -> EngineResult<Reply> {
        let text = non_empty(text)?;
        let post_id = self
            .repository
            .locate_comment(parent_comment_id)
            .ok_or_else(|| EngineError::lookup_miss("comment", parent_comment_id))?;

        let reply = Reply {
            id: ids::reply_id(),
            text,
            author: actor.author.clone(),
            timestamp: Utc::now(),
            likes_count: 0,
        };

        self.repository
            .modify(&actor.identity, &post_id, Persist::Thread, |post| {
                let parent = post
                    .find_comment_mut(parent_comment_id)
                    .ok_or_else(|| EngineError::lookup_miss("comment", parent_comment_id))?;
                parent.replies.push(reply.clone());
                Ok(())
            })?;
        Ok(reply)
    }

    /// Append a reply under a comment; a missing parent is a silent no-op
    pub fn add_reply(&self, actor: &Actor, parent_comment_id: &str, text: &str) -> Option<Reply> {
        match self.try_add_reply(actor, parent_comment_id, text) {
            Ok(reply) => {
                info!(parent_comment_id, reply_id = %reply.id, identity = %actor.identity, "Reply added");
                Some(reply)
            }
            Err(e) => {
                log_absorbed("add_reply", &e);
                None
            }
        }
    }

    pub fn try_like_node(&self, active: &Identity, node: &NodeRef, liked: bool) -> EngineResult<u32> {
        match node {
            NodeRef::Comment { id } => {
                let post_id = self
                    .repository
                    .locate_comment(id)
                    .ok_or_else(|| EngineError::lookup_miss("comment", id))?;
                self.repository
                    .modify(active, &post_id, Persist::Thread, |post| {
                        let comment = post
                            .find_comment_mut(id)
                            .ok_or_else(|| EngineError::lookup_miss("comment", id))?;
                        comment.likes_count = step_count(comment.likes_count, liked);
                        Ok(comment.likes_count)
                    })
            }
            NodeRef::Reply { id, parent_id } => {
                let (post_id, parent_id) = self.resolve_reply(id, parent_id.as_deref())?;
                self.repository
                    .modify(active, &post_id, Persist::Thread, |post| {
                        let reply = post
                            .find_comment_mut(&parent_id)
                            .and_then(|c| c.find_reply_mut(id))
                            .ok_or_else(|| EngineError::lookup_miss("reply", id))?;
                        reply.likes_count = step_count(reply.likes_count, liked);
                        Ok(reply.likes_count)
                    })
            }
        }
    }

    /// Step a comment or reply like counter; returns the new count
    pub fn like_node(&self, active: &Identity, node: &NodeRef, liked: bool) -> Option<u32> {
        self.try_like_node(active, node, liked)
            .map_err(|e| log_absorbed("like_node", &e))
            .ok()
    }

    pub fn try_delete_node(&self, active: &Identity, node: &NodeRef) -> EngineResult<()> {
        match node {
            NodeRef::Comment { id } => {
                let post_id = self
                    .repository
                    .locate_comment(id)
                    .ok_or_else(|| EngineError::lookup_miss("comment", id))?;
                self.repository
                    .modify(active, &post_id, Persist::Thread, |post| {
                        post.comments.retain(|c| &c.id != id);
                        Ok(())
                    })
            }
            NodeRef::Reply { id, parent_id } => {
                let (post_id, parent_id) = self.resolve_reply(id, parent_id.as_deref())?;
                self.repository
                    .modify(active, &post_id, Persist::Thread, |post| {
                        let parent = post
                            .find_comment_mut(&parent_id)
                            .ok_or_else(|| EngineError::lookup_miss("comment", &parent_id))?;
                        parent.replies.retain(|r| &r.id != id);
                        Ok(())
                    })
            }
        }
    }

    /// Remove a comment (with its replies) or a single reply
    pub fn delete_node(&self, active: &Identity, node: &NodeRef) -> bool {
        match self.try_delete_node(active, node) {
            Ok(()) => {
                info!(node = %node.describe(), identity = %active, "Comment node deleted");
                true
            }
            Err(e) => {
                log_absorbed("delete_node", &e);
                false
            }
        }
    }

    /// Author of the addressed node, if it exists
    pub fn node_author(&self, node: &NodeRef) -> Option<AuthorRef> {
        let (post_id, comment_id) = match node {
            NodeRef::Comment { id } => (self.repository.locate_comment(id)?, id.clone()),
            NodeRef::Reply { id, parent_id } => self.resolve_reply(id, parent_id.as_deref()).ok()?,
        };
        let post = self.repository.get(&post_id)?;
        let comment = post.find_comment(&comment_id)?;

        match node {
            NodeRef::Comment { .. } => Some(comment.author.clone()),
            NodeRef::Reply { id, .. } => comment
                .replies
                .iter()
                .find(|r| &r.id == id)
                .map(|r| r.author.clone()),
        }
    }

    /// `(post id, parent comment id)` for a reply
    fn resolve_reply(&self, reply_id: &str, parent_id: Option<&str>) -> EngineResult<(String, String)> {
        match parent_id {
            Some(parent_id) => {
                let post_id = self
                    .repository
                    .locate_comment(parent_id)
                    .ok_or_else(|| EngineError::lookup_miss("comment", parent_id))?;
                Ok((post_id, parent_id.to_string()))
            }
            None => self
                .repository
                .locate_reply(reply_id)
                .ok_or_else(|| EngineError::lookup_miss("reply", reply_id)),
        }
    }
}

fn non_empty(text: &str) -> EngineResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("comment text is empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrentUser, PostDraft, SeedCatalog};
    use partition_store::{MemoryStore, PartitionedStore};

    fn setup() -> (Arc<FeedRepository>, CommentTreeManager, Actor, String) {
        let store = PartitionedStore::new(Arc::new(MemoryStore::new()));
        let repo = Arc::new(FeedRepository::new(store, SeedCatalog::empty()));
        let actor = Actor::from_user(Some(&CurrentUser::new("u1").with_name("Mia")));
        let post = repo.add_post(&actor, PostDraft::titled("A"));
        let manager = CommentTreeManager::new(repo.clone());
        (repo, manager, actor, post.id)
    }

    #[test]
    fn test_add_comment_appends_oldest_first() {
        let (repo, manager, actor, post_id) = setup();
        let first = manager.add_comment(&actor, &post_id, "first").unwrap();
        manager.add_comment(&actor, &post_id, "second").unwrap();

        let post = repo.get(&post_id).unwrap();
        assert_eq!(post.comments[0].id, first.id);
        assert_eq!(post.comments[1].text, "second");
        assert_eq!(first.author.name, "Mia");
        assert_eq!(first.likes_count, 0);
    }

    #[test]
    fn test_reply_to_missing_parent_is_noop() {
        let (repo, manager, actor, post_id) = setup();
        assert!(manager.add_reply(&actor, "no-such-comment", "hello").is_none());
        assert_eq!(repo.get(&post_id).unwrap().comment_count(), 0);
    }

    #[test]
    fn test_blank_comment_rejected() {
        let (_, manager, actor, post_id) = setup();
        assert!(manager.add_comment(&actor, &post_id, "   ").is_none());
    }

    #[test]
    fn test_like_node_clamps_and_targets_reply() {
        let (repo, manager, actor, post_id) = setup();
        let comment = manager.add_comment(&actor, &post_id, "c").unwrap();
        let reply = manager.add_reply(&actor, &comment.id, "r").unwrap();

        let comment_node = NodeRef::comment(&comment.id);
        assert_eq!(manager.like_node(&actor.identity, &comment_node, false), Some(0));
        assert_eq!(manager.like_node(&actor.identity, &comment_node, true), Some(1));

        let reply_node = NodeRef::reply(&reply.id, &comment.id);
        assert_eq!(manager.like_node(&actor.identity, &reply_node, true), Some(1));

        let post = repo.get(&post_id).unwrap();
        assert_eq!(post.comments[0].likes_count, 1);
        assert_eq!(post.comments[0].replies[0].likes_count, 1);
    }

    #[test]
    fn test_reply_without_parent_is_found() {
        let (repo, manager, actor, post_id) = setup();
        let comment = manager.add_comment(&actor, &post_id, "c").unwrap();
        let reply = manager.add_reply(&actor, &comment.id, "r").unwrap();

        let node = NodeRef::from_parts(&reply.id, true, None);
        assert!(manager.delete_node(&actor.identity, &node));
        assert!(repo.get(&post_id).unwrap().comments[0].replies.is_empty());
    }

    #[test]
    fn test_deleted_node_stays_deleted() {
        let (_, manager, actor, post_id) = setup();
        let comment = manager.add_comment(&actor, &post_id, "c").unwrap();
        let node = NodeRef::comment(&comment.id);

        assert!(manager.delete_node(&actor.identity, &node));
        assert!(!manager.delete_node(&actor.identity, &node));
        assert_eq!(manager.like_node(&actor.identity, &node, true), None);
        assert!(manager.add_reply(&actor, &comment.id, "late").is_none());
    }

    #[test]
    fn test_node_author() {
        let (_, manager, actor, post_id) = setup();
        let comment = manager.add_comment(&actor, &post_id, "c").unwrap();
        let author = manager.node_author(&NodeRef::comment(&comment.id)).unwrap();
        assert!(author.is(&actor.identity));
        assert!(manager.node_author(&NodeRef::comment("missing")).is_none());
    }
}
