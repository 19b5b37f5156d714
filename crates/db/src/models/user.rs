//! User entity model.

use courtside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Authentication material lives outside the core; this row only carries
/// what booking, ledger, and rating operations need.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    /// Skill rating in `[0.5, 7.0]`.
    pub rating: f64,
    /// Reliability as an integer percentage (0..100).
    pub reliability: i32,
    pub credit_balance: f64,
    /// 0 = none, 1..3 = flat discount, 4 = infinity.
    pub membership_tier: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Reliability as the `[0, 1]` coefficient used by the engines.
    pub fn reliability_coefficient(&self) -> f64 {
        f64::from(self.reliability) / 100.0
    }
}
