//! In-process notification bus for cross-surface engagement sync
//!
//! Lets any surface announce that a post's liked/saved state changed so every
//! other mounted surface showing that post can re-render from the payload,
//! without a direct call relationship between the two.
//!
//! # Architecture
//!
//! ```text
//! Feed card (surface A):
//!   1. User taps like
//!   2. Engagement manager flips membership, adjusts counter
//!   3. bus.publish(likeChanged {post_id: "p1", new_state: true, count: 43})
//!      ↓
//! NotificationBus (synchronous fan-out, exact topic match)
//!      ↓
//! Detail view, profile grid (surfaces B, C):
//!   4. Handler filters on post_id
//!   5. Local view updated from payload, no repository re-read
//! ```
//!
//! The bus keeps no history: a subscriber registered after a publish never
//! sees it.
//!
//! # Example
//!
//! ```
//! use notification_bus::{Notification, NotificationBus, Topic};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let bus = NotificationBus::new();
//! let liked = Arc::new(AtomicBool::new(false));
//!
//! let seen = Arc::clone(&liked);
//! let subscription = bus
//!     .subscribe(Topic::LikeChanged, move |msg| {
//!         if msg.post_id == "p1" {
//!             seen.store(msg.new_state, Ordering::SeqCst);
//!         }
//!     })
//!     .unwrap();
//!
//! let delivered = bus.publish(Notification::like_changed("p1", true));
//! assert_eq!(delivered, 1);
//! assert!(liked.load(Ordering::SeqCst));
//!
//! subscription.unsubscribe();
//! assert_eq!(bus.subscriber_count(Topic::LikeChanged), 0);
//! ```

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, info, warn};

mod error;
mod stats;

pub use error::BusError;
pub use stats::{BusStats, StatsCollector};

type Result<T> = std::result::Result<T, BusError>;

/// Bounded topic set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    LikeChanged,
    SaveChanged,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::LikeChanged, Topic::SaveChanged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::LikeChanged => "likeChanged",
            Topic::SaveChanged => "saveChanged",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "likeChanged" => Ok(Topic::LikeChanged),
            "saveChanged" => Ok(Topic::SaveChanged),
            other => Err(BusError::UnknownTopic(other.to_string())),
        }
    }
}

/// Engagement change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message_id: String,
    pub topic: Topic,
    pub post_id: String,
    pub new_state: bool,
    /// Post counter after the change, when the publisher knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    pub published_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(topic: Topic, post_id: impl Into<String>, new_state: bool) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            topic,
            post_id: post_id.into(),
            new_state,
            count: None,
            published_at: Utc::now(),
        }
    }

    /// Create new likeChanged message
    pub fn like_changed(post_id: impl Into<String>, liked: bool) -> Self {
        Self::new(Topic::LikeChanged, post_id, liked)
    }

    /// Create new saveChanged message
    pub fn save_changed(post_id: impl Into<String>, saved: bool) -> Self {
        Self::new(Topic::SaveChanged, post_id, saved)
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

struct Registration {
    id: u64,
    topic: Topic,
    handler: Handler,
}

struct BusInner {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    stats: StatsCollector,
}

impl BusInner {
    fn remove(&self, id: u64) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        before != registrations.len()
    }
}

/// Process-wide publish/subscribe channel
///
/// Cheap to clone; every clone refers to the same subscriber registry.
/// Create one at process start, pass it into each manager, and call
/// [`NotificationBus::shutdown`] at process end.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registrations: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                stats: StatsCollector::new(),
            }),
        }
    }

    /// Register `handler` for every future publish on `topic`
    ///
    /// The returned guard unsubscribes when dropped.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Result<Subscription>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.registrations.write().push(Registration {
            id,
            topic,
            handler: Arc::new(handler),
        });

        debug!(subscription_id = id, topic = %topic, "Subscribed");

        Ok(Subscription {
            id,
            topic,
            bus: Arc::downgrade(&self.inner),
            active: true,
        })
    }

    /// Deliver `notification` to every current subscriber of its topic
    ///
    /// Runs all handlers before returning. Returns the number of handlers
    /// that were invoked; a panicking handler is logged and counted as a
    /// failure without stopping the others.
    pub fn publish(&self, notification: Notification) -> usize {
        if self.is_closed() {
            warn!(
                message_id = %notification.message_id,
                topic = %notification.topic,
                "Publish on closed bus dropped"
            );
            return 0;
        }

        // Snapshot handlers so they can (un)subscribe re-entrantly
        let handlers: Vec<(u64, Handler)> = self
            .inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.topic == notification.topic)
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        let stats = &self.inner.stats;
        stats.record_publish();

        if handlers.is_empty() {
            debug!(
                message_id = %notification.message_id,
                topic = %notification.topic,
                post_id = %notification.post_id,
                "No subscribers for notification"
            );
            stats.record_undelivered();
            return 0;
        }

        let started = Instant::now();
        for (id, handler) in &handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&notification))) {
                Ok(()) => stats.record_delivery(),
                Err(_) => {
                    error!(
                        subscription_id = id,
                        message_id = %notification.message_id,
                        topic = %notification.topic,
                        "Notification handler panicked"
                    );
                    stats.record_failure();
                }
            }
        }
        stats.record_dispatch(started.elapsed().as_secs_f64() * 1_000_000.0);

        debug!(
            message_id = %notification.message_id,
            topic = %notification.topic,
            post_id = %notification.post_id,
            new_state = notification.new_state,
            subscribers = handlers.len(),
            "Notification published"
        );

        handlers.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.topic == topic)
            .count()
    }

    pub fn stats(&self) -> BusStats {
        self.inner.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the bus and drop every subscription
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = {
            let mut registrations = self.inner.registrations.write();
            let count = registrations.len();
            registrations.clear();
            count
        };
        info!(dropped_subscriptions = dropped, "Notification bus shut down");
    }
}

/// Handle for one registered handler
///
/// Dropping the handle unsubscribes; [`Subscription::unsubscribe`] does the
/// same explicitly.
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<BusInner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Stop receiving notifications
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.bus.upgrade() {
            if inner.remove(self.id) {
                debug!(subscription_id = self.id, topic = %self.topic, "Unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("active", &self.active)
            .finish()
    }
}
