//! Reservation entity model and DTOs.

use courtside_core::types::{CalendarDate, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full reservation row.
///
/// The numeric state columns (`etat`, `reservation_type`, `score_status`)
/// keep the legacy wire values; `courtside_core::reservation` holds the
/// matching enums.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: DbId,
    pub slot_id: DbId,
    pub date: CalendarDate,
    pub creator_user_id: DbId,
    #[serde(rename = "type")]
    pub reservation_type: i16,
    pub etat: i16,
    pub is_cancel: bool,
    pub coder: String,
    pub unit_total_price: f64,
    pub is_prepaid_for_all: bool,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub set1_a: Option<i16>,
    pub set1_b: Option<i16>,
    pub set2_a: Option<i16>,
    pub set2_b: Option<i16>,
    pub set3_a: Option<i16>,
    pub set3_b: Option<i16>,
    pub super_tiebreak: bool,
    pub teamwin: Option<i16>,
    pub score_status: i16,
    pub last_score_submitter_id: Option<DbId>,
    pub last_score_update_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reservation {
    /// The stored score sheet, when at least the first two sets are present.
    pub fn score_sheet(&self) -> Option<courtside_core::scoring::ScoreSheet> {
        let mut sets = Vec::new();
        match (self.set1_a, self.set1_b, self.set2_a, self.set2_b) {
            (Some(a1), Some(b1), Some(a2), Some(b2)) => {
                sets.push(courtside_core::scoring::SetScore::new(a1, b1));
                sets.push(courtside_core::scoring::SetScore::new(a2, b2));
            }
            _ => return None,
        }
        if let (Some(a3), Some(b3)) = (self.set3_a, self.set3_b) {
            sets.push(courtside_core::scoring::SetScore::new(a3, b3));
        }
        Some(courtside_core::scoring::ScoreSheet {
            sets,
            super_tiebreak: self.super_tiebreak,
        })
    }
}

/// Insert payload for a new reservation.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub slot_id: DbId,
    pub date: CalendarDate,
    pub creator_user_id: DbId,
    pub reservation_type: i16,
    pub etat: i16,
    pub coder: String,
    pub unit_total_price: f64,
    pub is_prepaid_for_all: bool,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

/// Persisted outcome of one score submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreUpdate {
    pub set1_a: i16,
    pub set1_b: i16,
    pub set2_a: i16,
    pub set2_b: i16,
    pub set3_a: Option<i16>,
    pub set3_b: Option<i16>,
    pub super_tiebreak: bool,
}
