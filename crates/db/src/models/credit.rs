//! Credit ledger entity model.

use courtside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One append-only ledger entry. Negative amounts are debits, positive ones
/// refunds; `(user_id, type_key)` is unique.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub amount: f64,
    pub type_key: String,
    pub created_at: Timestamp,
}
