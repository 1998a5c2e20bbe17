//! Background delivery of notification events into user inboxes.
//!
//! [`NotificationDelivery`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and stores every notification event through the [`Inbox`] port. Failures
//! are logged and never reach the request that produced the notification.

use std::sync::Arc;

use achievo_core::ports::Inbox;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::PlatformEvent;
use crate::notifier::notification_of;

/// Background service that writes notification events to the inbox.
pub struct NotificationDelivery {
    inbox: Arc<dyn Inbox>,
}

impl NotificationDelivery {
    pub fn new(inbox: Arc<dyn Inbox>) -> Self {
        Self { inbox }
    }

    /// Run the delivery loop.
    ///
    /// Exits when the bus is closed, or when `cancel` fires after the events
    /// already queued on `receiver` have been delivered.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.drain(&mut receiver).await;
                    tracing::info!("Notification delivery cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.deliver(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Notification delivery lagged, some notifications were dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification delivery shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn drain(&self, receiver: &mut broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.try_recv() {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notifications dropped during shutdown drain");
                }
                Err(_) => break,
            }
        }
    }

    /// Store one event if it carries a notification; other events are ignored.
    async fn deliver(&self, event: &PlatformEvent) {
        let Some(notification) = notification_of(event) else {
            return;
        };
        match self.inbox.store(&notification).await {
            Ok(id) => tracing::debug!(
                notification_id = id,
                user_id = notification.user_id,
                event_type = %event.event_type,
                "Notification delivered"
            ),
            Err(e) => tracing::error!(
                error = %e,
                user_id = notification.user_id,
                event_type = %event.event_type,
                "Failed to deliver notification"
            ),
        }
    }
}
