//! Handler for the per-user credit view.

use axum::extract::{Path, State};
use axum::Json;
use courtside_core::error::CoreError;
use courtside_core::types::DbId;
use courtside_db::models::credit::CreditTransaction;
use courtside_db::repositories::CreditLedgerRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// How many ledger entries the credit view returns.
const HISTORY_LIMIT: i64 = 50;

/// Balance plus recent ledger entries.
#[derive(Debug, Serialize)]
pub struct CreditView {
    pub balance: f64,
    pub transactions: Vec<CreditTransaction>,
}

/// GET /api/v1/users/{id}/credit
///
/// Current balance and the most recent ledger entries.
pub async fn get(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CreditView>>> {
    let balance = CreditLedgerRepo::balance(&state.pool, user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user_id,
        })?;
    let transactions =
        CreditLedgerRepo::list_for_user(&state.pool, user_id, HISTORY_LIMIT).await?;
    Ok(Json(DataResponse {
        data: CreditView {
            balance,
            transactions,
        },
    }))
}
