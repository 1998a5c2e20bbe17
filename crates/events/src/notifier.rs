//! Notifier port implementation that publishes onto the [`EventBus`].

use std::sync::Arc;

use achievo_core::notification::{Notification, NotificationType};
use achievo_core::ports::Notifier;

use crate::bus::{EventBus, PlatformEvent};

/// Source entity kind of every notification event.
pub const SOURCE_ACHIEVEMENT: &str = "achievement";

/// Event name for a notification type.
pub fn event_type(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::AchievementSubmitted => "achievement.submitted",
        NotificationType::AchievementVerified => "achievement.verified",
        NotificationType::AchievementRejected => "achievement.rejected",
    }
}

/// Recover the notification carried by an event, if it carries one.
pub fn notification_of(event: &PlatformEvent) -> Option<Notification> {
    if event.recipient_user_id.is_none() {
        return None;
    }
    let notification: Notification = serde_json::from_value(event.payload.clone()).ok()?;
    (event_type(notification.kind) == event.event_type).then_some(notification)
}

/// Publishes each enqueued notification as a [`PlatformEvent`].
#[derive(Clone)]
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl Notifier for BusNotifier {
    fn enqueue(&self, notification: Notification) {
        let payload = match serde_json::to_value(&notification) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = notification.user_id,
                    "Failed to encode notification, dropping it"
                );
                return;
            }
        };
        let mut event = PlatformEvent::new(event_type(notification.kind))
            .with_recipient(notification.user_id)
            .with_payload(payload);
        if let Some(reference_id) = notification.payload["reference_id"].as_i64() {
            event = event.with_source(SOURCE_ACHIEVEMENT, reference_id);
        }
        tracing::debug!(
            event_type = %event.event_type,
            user_id = notification.user_id,
            "Notification enqueued"
        );
        self.bus.publish(event);
    }
}
