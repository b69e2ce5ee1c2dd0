use chrono::{DateTime, Utc};
use partition_store::Identity;
use serde::{Deserialize, Serialize};

/// Placeholder avatar for identities without a profile picture
pub const DEFAULT_AVATAR: &str = "https://picsum.photos/32/32?random=99";

/// Display name for identities without a name or username
pub const ANONYMOUS_NAME: &str = "Anonymous User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// Image or video attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: MediaType,
    pub url: String,
}

impl MediaItem {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: MediaType::Image,
            url: url.into(),
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            kind: MediaType::Video,
            url: url.into(),
        }
    }
}

/// Author stamp carried by posts, comments and replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Seed comment authors carry no id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub avatar: String,
}

impl AuthorRef {
    pub fn is(&self, identity: &Identity) -> bool {
        self.id.as_deref() == Some(identity.id.as_str())
    }
}

/// Reply to a comment (second and last level of a thread)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub text: String,
    pub author: AuthorRef,
    pub timestamp: DateTime<Utc>,
    pub likes_count: u32,
}

/// Top-level comment on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: AuthorRef,
    pub timestamp: DateTime<Utc>,
    pub likes_count: u32,
    /// Oldest first
    pub replies: Vec<Reply>,
}

impl Comment {
    pub fn find_reply_mut(&mut self, reply_id: &str) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == reply_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub author: AuthorRef,
    pub tags: Vec<String>,
    pub location: String,
    pub likes_count: u32,
    pub saves_count: u32,
    /// Oldest first
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub is_draft: bool,
}

impl Post {
    /// First media item, used as the card cover
    pub fn cover(&self) -> Option<&MediaItem> {
        self.media.first()
    }

    /// Comments plus replies
    pub fn comment_count(&self) -> usize {
        self.comments.iter().map(|c| 1 + c.replies.len()).sum()
    }

    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn find_comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Parent comment id of `reply_id`, if this post contains it
    pub fn find_reply_parent(&self, reply_id: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|c| c.replies.iter().any(|r| r.id == reply_id))
            .map(|c| c.id.as_str())
    }

    pub fn counter(&self, counter: Counter) -> u32 {
        match counter {
            Counter::Likes => self.likes_count,
            Counter::Saves => self.saves_count,
        }
    }
}

/// Shared per-post engagement counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Saves,
}

impl Counter {
    /// Move the post's counter one step, never below zero; returns the new value
    pub fn step(self, post: &mut Post, increment: bool) -> u32 {
        let slot = match self {
            Counter::Likes => &mut post.likes_count,
            Counter::Saves => &mut post.saves_count,
        };
        *slot = step_count(*slot, increment);
        *slot
    }
}

pub(crate) fn step_count(value: u32, increment: bool) -> u32 {
    if increment {
        value.saturating_add(1)
    } else {
        value.saturating_sub(1)
    }
}

/// Logged-in user as reported by the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub username: Option<String>,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Active identity plus the author stamp it puts on new content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity: Identity,
    pub author: AuthorRef,
}

impl Actor {
    pub fn anonymous() -> Self {
        let identity = Identity::anonymous();
        Self {
            author: AuthorRef {
                id: Some(identity.id.clone()),
                name: ANONYMOUS_NAME.to_string(),
                avatar: DEFAULT_AVATAR.to_string(),
            },
            identity,
        }
    }

    pub fn from_user(user: Option<&CurrentUser>) -> Self {
        let Some(user) = user.filter(|u| !u.id.is_empty()) else {
            return Self::anonymous();
        };

        let name = [&user.name, &user.username]
            .into_iter()
            .flatten()
            .find(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string());
        let avatar = user
            .avatar
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR.to_string());

        Self {
            identity: Identity::new(user.id.clone()),
            author: AuthorRef {
                id: Some(user.id.clone()),
                name,
                avatar,
            },
        }
    }
}

/// Fully-formed post handed over by the publish flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_draft: bool,
}

impl PostDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Materialise the draft as a post authored by `actor`
    pub fn into_post(self, actor: &Actor, id: String, now: DateTime<Utc>) -> Post {
        Post {
            id: self.id.filter(|id| !id.is_empty()).unwrap_or(id),
            title: self.title,
            content: self.content,
            media: self.media,
            author: actor.author.clone(),
            tags: self.tags,
            location: self.location,
            likes_count: 0,
            saves_count: 0,
            comments: Vec::new(),
            created_at: self.created_at.unwrap_or(now),
            is_private: self.is_private,
            is_draft: self.is_draft,
        }
    }
}

/// Shallow update of a post's content fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub media: Option<Vec<MediaItem>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub is_private: Option<bool>,
    pub is_draft: Option<bool>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(media) = self.media {
            post.media = media;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(location) = self.location {
            post.location = location;
        }
        if let Some(is_private) = self.is_private {
            post.is_private = is_private;
        }
        if let Some(is_draft) = self.is_draft {
            post.is_draft = is_draft;
        }
    }
}

/// One identity's recorded counters for a seed post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saves_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CounterOverride {
    pub fn capture(post: &Post, at: DateTime<Utc>) -> Self {
        Self {
            likes_count: Some(post.likes_count),
            saves_count: Some(post.saves_count),
            updated_at: Some(at),
        }
    }

    pub fn apply(&self, post: &mut Post) {
        if let Some(likes) = self.likes_count {
            post.likes_count = likes;
        }
        if let Some(saves) = self.saves_count {
            post.saves_count = saves;
        }
    }
}

/// Profile header numbers for the active identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub posts: usize,
    pub likes_and_saves: u64,
}
