//! Storage-boundary migration for persisted posts
//!
//! Older partitions were written by a looser schema: `image` / `imageUrl`
//! instead of `media`, `description` instead of `content`, missing counters,
//! comments without `replies`, and free-text timestamps like "2 hours ago".
//! Everything is normalised into the canonical [`Post`] here so the rest of
//! the engine only ever sees required fields. Writes always use the canonical
//! form, so a partition is migrated the first time it is rewritten.

use super::models::{AuthorRef, Comment, MediaItem, MediaType, Post, Reply, ANONYMOUS_NAME, DEFAULT_AVATAR};
use chrono::{DateTime, TimeZone, Utc};
use partition_store::Identity;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimestamp {
    Instant(DateTime<Utc>),
    Millis(i64),
    Text(String),
}

impl StoredTimestamp {
    fn resolve(self) -> Option<DateTime<Utc>> {
        match self {
            StoredTimestamp::Instant(at) => Some(at),
            StoredTimestamp::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
            StoredTimestamp::Text(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
struct StoredAuthor {
    id: Option<String>,
    name: Option<String>,
    username: Option<String>,
    avatar: Option<String>,
}

impl StoredAuthor {
    fn normalise(self) -> AuthorRef {
        AuthorRef {
            id: self.id.filter(|id| !id.is_empty()),
            name: self
                .name
                .or(self.username)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
            avatar: self
                .avatar
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMedia {
    #[serde(rename = "type", default)]
    kind: Option<MediaType>,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredComment {
    id: String,
    #[serde(default, alias = "content")]
    text: String,
    #[serde(default)]
    author: Option<StoredAuthor>,
    #[serde(default)]
    timestamp: Option<StoredTimestamp>,
    #[serde(default)]
    likes_count: Option<i64>,
    #[serde(default)]
    replies: Vec<StoredComment>,
}

impl StoredComment {
    fn into_reply(self, fallback: DateTime<Utc>) -> Reply {
        if !self.replies.is_empty() {
            debug!(reply_id = %self.id, dropped = self.replies.len(), "Nested replies beyond depth two dropped");
        }
        Reply {
            id: self.id,
            text: self.text,
            author: self.author.unwrap_or_default().normalise(),
            timestamp: self.timestamp.and_then(StoredTimestamp::resolve).unwrap_or(fallback),
            likes_count: clamp_count(self.likes_count),
        }
    }

    fn into_comment(self, fallback: DateTime<Utc>) -> Comment {
        let timestamp = self.timestamp.and_then(StoredTimestamp::resolve).unwrap_or(fallback);
        Comment {
            id: self.id,
            text: self.text,
            author: self.author.unwrap_or_default().normalise(),
            timestamp,
            likes_count: clamp_count(self.likes_count),
            replies: self
                .replies
                .into_iter()
                .map(|r| r.into_reply(fallback))
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    media: Option<Vec<StoredMedia>>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    author: Option<StoredAuthor>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default, alias = "likes")]
    likes_count: Option<i64>,
    #[serde(default, alias = "saves")]
    saves_count: Option<i64>,
    #[serde(default)]
    comments: Vec<StoredComment>,
    #[serde(default)]
    created_at: Option<StoredTimestamp>,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_draft: bool,
}

impl StoredPost {
    fn normalise(self) -> Post {
        let created_at = self
            .created_at
            .and_then(StoredTimestamp::resolve)
            .unwrap_or_default();

        let media = match self.media {
            Some(media) if !media.is_empty() => media
                .into_iter()
                .map(|m| MediaItem {
                    kind: m.kind.unwrap_or(MediaType::Image),
                    url: m.url,
                })
                .collect(),
            _ => self
                .image_url
                .or(self.image)
                .filter(|url| !url.is_empty())
                .map(|url| vec![MediaItem::image(url)])
                .unwrap_or_default(),
        };

        Post {
            id: self.id,
            title: self.title,
            content: self.content.or(self.description).unwrap_or_default(),
            media,
            author: self.author.unwrap_or_default().normalise(),
            tags: self.tags,
            location: self.location.unwrap_or_default(),
            likes_count: clamp_count(self.likes_count),
            saves_count: clamp_count(self.saves_count),
            comments: self
                .comments
                .into_iter()
                .map(|c| c.into_comment(created_at))
                .collect(),
            created_at,
            is_private: self.is_private,
            is_draft: self.is_draft,
        }
    }
}

fn clamp_count(value: Option<i64>) -> u32 {
    value
        .map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Decode a single stored post in either the canonical or a legacy shape
pub fn decode_post(value: Value) -> Result<Post, serde_json::Error> {
    serde_json::from_value::<StoredPost>(value).map(StoredPost::normalise)
}

/// Decode an identity's `userPosts` partition, skipping undecodable entries
pub fn decode_partition(identity: &Identity, raw: Vec<Value>) -> Vec<Post> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match decode_post(value) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(identity = %identity, index, error = %e, "Skipping undecodable stored post");
                None
            }
        })
        .collect()
}
