//! Participant entity model.

use courtside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One seat on a reservation. Seats 0/1 form team A, seats 2/3 team B.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: DbId,
    pub reservation_id: DbId,
    pub user_id: DbId,
    pub is_creator: bool,
    /// 0 = unpaid, 1 = paid.
    pub payment_state: i16,
    /// 1 = credit, 2 = on site.
    pub payment_channel: i16,
    pub team: i16,
    pub created_at: Timestamp,
}

/// Insert payload for a participant row.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub reservation_id: DbId,
    pub user_id: DbId,
    pub is_creator: bool,
    pub payment_state: i16,
    pub payment_channel: i16,
    pub team: i16,
}
