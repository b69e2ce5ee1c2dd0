//! Partition key schema
//!
//! Every persisted value lives under a physical key derived from a logical key
//! and the identity that owns the partition.
//! Key format: {logical}_{identity_id}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the logical key and the identity id
pub const PARTITION_SEPARATOR: char = '_';

/// Identity owning a partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    /// Sentinel used when nobody is logged in
    pub const ANONYMOUS: &'static str = "anonymous";
    /// Synthetic identity owning the seed catalog
    pub const CATALOG: &'static str = "catalog";

    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS)
    }

    pub fn catalog() -> Self {
        Self::new(Self::CATALOG)
    }

    /// Resolve an optional logged-in user id, falling back to the anonymous sentinel
    pub fn from_optional(id: Option<&str>) -> Self {
        match id {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::anonymous(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == Self::ANONYMOUS
    }

    pub fn is_catalog(&self) -> bool {
        self.id == Self::CATALOG
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Logical keys known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    /// Posts authored while an identity was active
    UserPosts,
    /// Post ids an identity has liked
    LikedPosts,
    /// Post ids an identity has saved
    SavedPosts,
    /// Per-identity counter overrides for seed posts
    DefaultPostCounts,
}

impl LogicalKey {
    pub const ALL: [LogicalKey; 4] = [
        LogicalKey::UserPosts,
        LogicalKey::LikedPosts,
        LogicalKey::SavedPosts,
        LogicalKey::DefaultPostCounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalKey::UserPosts => "userPosts",
            LogicalKey::LikedPosts => "likedPosts",
            LogicalKey::SavedPosts => "savedPosts",
            LogicalKey::DefaultPostCounts => "defaultPostCounts",
        }
    }

    /// Prefix shared by every partition of this key, separator included.
    ///
    /// Legacy unscoped keys (`likedPosts` with no suffix) never match it.
    pub fn partition_prefix(&self) -> String {
        format!("{}{}", self.as_str(), PARTITION_SEPARATOR)
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the physical key for a logical key and identity
///
/// # Example
///
/// ```
/// use partition_store::{physical_key, Identity, LogicalKey};
///
/// let key = physical_key(LogicalKey::UserPosts, &Identity::new("u1"));
/// assert_eq!(key, "userPosts_u1");
///
/// let key = physical_key(LogicalKey::LikedPosts, &Identity::anonymous());
/// assert_eq!(key, "likedPosts_anonymous");
/// ```
pub fn physical_key(logical: LogicalKey, identity: &Identity) -> String {
    format!("{}{}", logical.partition_prefix(), identity.id)
}

/// Recover the owning identity from a physical key
///
/// Returns `None` when the key does not belong to a partition of `logical`.
pub fn parse_physical_key(logical: LogicalKey, physical: &str) -> Option<Identity> {
    let id = physical.strip_prefix(&logical.partition_prefix())?;
    if id.is_empty() {
        return None;
    }
    Some(Identity::new(id))
}
