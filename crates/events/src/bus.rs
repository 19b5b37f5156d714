//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`BookingEvent`]s. It is
//! shared via `Arc<EventBus>` across the application; publishing never
//! blocks and never holds a database transaction.

use chrono::{DateTime, Utc};
use courtside_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BookingEvent
// ---------------------------------------------------------------------------

/// Event names published by the booking and score flows.
pub mod event_types {
    pub const RESERVATION_CREATED: &str = "reservation.created";
    pub const RESERVATION_VALIDATED: &str = "reservation.validated";
    pub const RESERVATION_CANCELLED: &str = "reservation.cancelled";
    pub const PARTICIPANT_JOINED: &str = "participant.joined";
    pub const PARTICIPANT_LEFT: &str = "participant.left";
    pub const SCORE_SUBMITTED: &str = "score.submitted";
    pub const SCORE_CONFIRMED: &str = "score.confirmed";
    pub const SCORE_CONFLICT: &str = "score.conflict";
}

/// A domain event that occurred on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Dot-separated event name, e.g. `"reservation.created"`.
    pub event_type: String,

    /// The reservation the event concerns, when there is one.
    pub reservation_id: Option<DbId>,

    /// The user that triggered the event, when there is one.
    pub actor_user_id: Option<DbId>,

    /// Outbox rows written alongside the state change; the delivery task
    /// pushes exactly these.
    pub notification_ids: Vec<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl BookingEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            reservation_id: None,
            actor_user_id: None,
            notification_ids: Vec::new(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the reservation the event concerns.
    pub fn with_reservation(mut self, reservation_id: DbId) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    /// Attach the acting user.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Attach the outbox rows to deliver.
    pub fn with_notifications(mut self, ids: Vec<DbId>) -> Self {
        self.notification_ids = ids;
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`BookingEvent`].
pub struct EventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero subscribers the event is silently dropped; the outbox rows
    /// stay in the database either way.
    pub fn publish(&self, event: BookingEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
