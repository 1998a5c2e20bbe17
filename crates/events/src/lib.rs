//! Achievo event bus and notification delivery.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] is the event envelope carried on the bus.
//! - [`BusNotifier`] implements the core's `Notifier` port by publishing
//!   notification events; it never blocks or fails the caller.
//! - [`NotificationDelivery`] is the background service that writes those
//!   events into each recipient's inbox.

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::NotificationDelivery;
pub use notifier::BusNotifier;
