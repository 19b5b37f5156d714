//! Notification outbox entity model.

use courtside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub reservation_id: Option<DbId>,
    pub submitter_id: Option<DbId>,
    pub kind: String,
    pub title: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert payload for an outbox row.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub reservation_id: Option<DbId>,
    pub submitter_id: Option<DbId>,
    pub kind: &'static str,
    pub title: Option<String>,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Notification kinds emitted by the booking and score flows.
pub mod kinds {
    pub const RESERVATION_CONFIRMED: &str = "reservation_confirmed";
    pub const RESERVATION_CANCELLED: &str = "reservation_cancelled";
    pub const CREDIT_DEDUCTION: &str = "credit_deduction";
    pub const PARTICIPANT_LEFT: &str = "participant_left";
    pub const MATCH_STATUS_CHANGED: &str = "match_status_changed";
    pub const SCORE_PROPOSAL: &str = "SCORE_PROPOSAL";
    pub const SCORE_CONFIRMED: &str = "SCORE_CONFIRMED";
    pub const SCORE_CONFLICT: &str = "SCORE_CONFLICT";
}
