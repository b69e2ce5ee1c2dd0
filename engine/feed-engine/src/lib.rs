//! Client-resident feed state and sync engine
//!
//! Merges every identity's authored posts with the demo catalog, keeps
//! per-identity liked/saved sets against shared post counters, manages
//! two-level comment threads, and fans engagement changes out to every
//! mounted surface through an injected notification bus.

pub mod config;
pub mod domain;
pub mod error;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use domain::{Actor, Comment, CurrentUser, Post, PostDraft, PostPatch, Reply, SeedCatalog};
pub use error::{EngineError, EngineResult};
pub use repository::NodeRef;
pub use services::{EngineOptions, FeedEngine, PostSurface, SurfaceView};
