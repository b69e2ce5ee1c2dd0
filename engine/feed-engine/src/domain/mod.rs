pub mod ids;
pub mod legacy;
pub mod models;
pub mod seed;

pub use models::{
    Actor, AuthorRef, Comment, Counter, CounterOverride, CurrentUser, MediaItem, MediaType, Post,
    PostDraft, PostPatch, ProfileStats, Reply,
};
pub use seed::SeedCatalog;
