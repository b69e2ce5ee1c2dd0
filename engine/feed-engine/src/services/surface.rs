//! Per-post view state kept in sync through the notification bus
//!
//! A surface (feed card, detail view) hydrates once from the engine when it
//! mounts, then only applies bus payloads for its own post until unmounted.

use super::engine::FeedEngine;
use crate::domain::models::step_count;
use crate::error::EngineError;
use crate::repository::log_absorbed;
use notification_bus::{Notification, NotificationBus, Subscription, Topic};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// What a surface renders for its post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub post_id: String,
    pub liked: bool,
    pub saved: bool,
    pub likes_count: u32,
    pub saves_count: u32,
}

impl SurfaceView {
    fn apply(&mut self, notification: &Notification) {
        let (state, count) = match notification.topic {
            Topic::LikeChanged => (&mut self.liked, &mut self.likes_count),
            Topic::SaveChanged => (&mut self.saved, &mut self.saves_count),
        };
        let current = *count;
        *state = notification.new_state;
        *count = notification
            .count
            .unwrap_or_else(|| step_count(current, notification.new_state));
    }
}

/// A mounted surface; dropping it unsubscribes
pub struct PostSurface {
    view: Arc<RwLock<SurfaceView>>,
    subscriptions: Vec<Subscription>,
}

impl PostSurface {
    /// Hydrate from the engine and subscribe to both engagement topics
    pub fn mount(engine: &FeedEngine, post_id: &str) -> Self {
        let (likes_count, saves_count) = engine
            .post(post_id)
            .map(|p| (p.likes_count, p.saves_count))
            .unwrap_or_default();

        let view = Arc::new(RwLock::new(SurfaceView {
            post_id: post_id.to_string(),
            liked: engine.is_liked(post_id),
            saved: engine.is_saved(post_id),
            likes_count,
            saves_count,
        }));

        let subscriptions = Topic::ALL
            .iter()
            .filter_map(|&topic| Self::listen(engine.bus(), topic, &view))
            .collect();

        debug!(post_id, "Surface mounted");
        Self { view, subscriptions }
    }

    fn listen(bus: &NotificationBus, topic: Topic, view: &Arc<RwLock<SurfaceView>>) -> Option<Subscription> {
        let target = Arc::clone(view);
        let post_id = view.read().post_id.clone();

        bus.subscribe(topic, move |notification| {
            if notification.post_id == post_id {
                target.write().apply(notification);
            }
        })
        .map_err(|e| {
            debug!(topic = %topic, "Surface will not receive updates");
            log_absorbed("mount", &EngineError::from(e));
        })
        .ok()
    }

    pub fn view(&self) -> SurfaceView {
        self.view.read().clone()
    }

    pub fn post_id(&self) -> String {
        self.view.read().post_id.clone()
    }

    /// Whether bus updates are still being applied
    pub fn is_live(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn unmount(self) {
        debug!(post_id = %self.view.read().post_id, "Surface unmounted");
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CurrentUser;

    #[test]
    fn test_mount_hydrates_from_engine() {
        let engine = FeedEngine::in_memory();
        engine.set_current_user(Some(&CurrentUser::new("u1")));
        engine.toggle_save("demo-2");

        let surface = PostSurface::mount(&engine, "demo-2");
        let view = surface.view();
        assert!(view.saved);
        assert!(!view.liked);
        assert_eq!(view.likes_count, 89);
        assert_eq!(view.saves_count, 35);
    }

    #[test]
    fn test_only_own_post_is_applied() {
        let engine = FeedEngine::in_memory();
        let surface = PostSurface::mount(&engine, "demo-1");

        engine.toggle_like("demo-2");
        assert!(!surface.view().liked);

        engine.toggle_like("demo-1");
        assert!(surface.view().liked);
        assert_eq!(surface.view().likes_count, 43);
    }

    #[test]
    fn test_unmount_releases_subscriptions() {
        let engine = FeedEngine::in_memory();
        let surface = PostSurface::mount(&engine, "demo-1");
        assert!(surface.is_live());
        assert_eq!(engine.bus().subscriber_count(Topic::LikeChanged), 1);

        surface.unmount();
        assert_eq!(engine.bus().subscriber_count(Topic::LikeChanged), 0);
    }

    #[test]
    fn test_mount_after_shutdown_is_static() {
        let engine = FeedEngine::in_memory();
        engine.shutdown();

        let surface = PostSurface::mount(&engine, "demo-1");
        assert!(!surface.is_live());
        assert_eq!(surface.view().likes_count, 42);
    }

    #[test]
    fn test_payload_without_count_steps_locally() {
        let mut view = SurfaceView {
            post_id: "p".to_string(),
            liked: false,
            saved: true,
            likes_count: 0,
            saves_count: 1,
        };
        view.apply(&Notification::save_changed("p", false));
        assert!(!view.saved);
        assert_eq!(view.saves_count, 0);
    }
}
