//! Delivery guarantees of the notification bus

use notification_bus::{Notification, NotificationBus, Subscription, Topic};
use std::sync::{Arc, Mutex};

type Received = Arc<Mutex<Vec<Notification>>>;

fn recorder(bus: &NotificationBus, topic: Topic) -> (Subscription, Received) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let sub = bus
        .subscribe(topic, move |msg| sink.lock().unwrap().push(msg.clone()))
        .expect("Failed to subscribe");
    (sub, received)
}

#[test]
fn test_subscriber_before_publish_receives_exactly_once() {
    let bus = NotificationBus::new();
    let (_sub, received) = recorder(&bus, Topic::LikeChanged);

    let msg = Notification::like_changed("x", true);
    bus.publish(msg.clone());

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], msg);
    assert_eq!(received[0].post_id, "x");
    assert!(received[0].new_state);
}

#[test]
fn test_subscriber_after_publish_sees_nothing() {
    let bus = NotificationBus::new();
    bus.publish(Notification::like_changed("x", true));

    let (_sub, received) = recorder(&bus, Topic::LikeChanged);
    assert!(received.lock().unwrap().is_empty());
}

#[test]
fn test_unsubscribed_surface_stops_receiving() {
    let bus = NotificationBus::new();
    let (card, card_seen) = recorder(&bus, Topic::SaveChanged);
    let (_detail, detail_seen) = recorder(&bus, Topic::SaveChanged);

    bus.publish(Notification::save_changed("p1", true));
    card.unsubscribe();
    bus.publish(Notification::save_changed("p1", false));

    assert_eq!(card_seen.lock().unwrap().len(), 1);
    let detail_seen = detail_seen.lock().unwrap();
    assert_eq!(detail_seen.len(), 2);
    assert!(!detail_seen[1].new_state);
}

#[test]
fn test_clones_share_registry() {
    let bus = NotificationBus::new();
    let publisher = bus.clone();
    let (_sub, received) = recorder(&bus, Topic::LikeChanged);

    assert_eq!(publisher.publish(Notification::like_changed("p9", false)), 1);
    assert_eq!(received.lock().unwrap().len(), 1);
}
