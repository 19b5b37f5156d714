//! Handler for slot availability listings.

use axum::extract::{Query, State};
use axum::Json;
use courtside_core::types::{CalendarDate, DbId};
use courtside_db::models::slot::SlotAvailability;
use courtside_db::repositories::SlotRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /slots`.
#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub court_id: DbId,
    pub date: CalendarDate,
}

/// GET /api/v1/slots?court_id=..&date=..
///
/// A court's slots with availability computed for the date. Read-only;
/// booking re-checks capacity under lock regardless of what this returns.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SlotQuery>,
) -> AppResult<Json<DataResponse<Vec<SlotAvailability>>>> {
    let slots = SlotRepo::list_for_court_date(&state.pool, params.court_id, params.date).await?;
    Ok(Json(DataResponse { data: slots }))
}
