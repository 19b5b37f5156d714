//! Court slot entity model.

use courtside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `court_slots` table: one time-bounded booking surface on a
/// specific court. Rows sharing `(court_id, start_time, end_time)` are
/// siblings and pool their capacity for a given date.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourtSlot {
    pub id: DbId,
    pub court_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub unit_price: f64,
    pub capacity: i32,
    /// Hint only; never the source of truth for capacity decisions.
    pub available: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A slot with its availability computed for a specific date.
#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: CourtSlot,
    pub valid_reservations: i64,
    pub has_capacity: bool,
}
