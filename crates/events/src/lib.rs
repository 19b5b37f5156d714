//! In-process event bus and the notification delivery boundary.
//!
//! State-changing flows write outbox rows inside their transaction, then
//! publish a [`BookingEvent`] after commit. The [`NotificationDispatcher`]
//! consumes those events and hands the enqueued notifications to the push
//! and email collaborators, fire-and-forget.

pub mod bus;
pub mod delivery;
pub mod dispatch;

pub use bus::{BookingEvent, EventBus};
pub use dispatch::NotificationDispatcher;
