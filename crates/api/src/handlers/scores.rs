//! Handler for score submission.

use axum::extract::{Path, State};
use axum::Json;
use courtside_core::types::DbId;
use courtside_db::models::reservation::{Reservation, ScoreUpdate};
use serde::Deserialize;

use crate::engine::scores;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Payload for `POST /reservations/{id}/score`.
#[derive(Debug, Deserialize)]
pub struct SubmitScore {
    pub user_id: DbId,
    #[serde(flatten)]
    pub score: ScoreUpdate,
}

/// POST /api/v1/reservations/{id}/score
///
/// Submit one player's score. Returns 200 with the updated reservation,
/// 409 `SCORE_LOCKED` once confirmed, 400 on invalid or undecided sheets.
pub async fn submit(
    State(state): State<AppState>,
    Path(reservation_id): Path<DbId>,
    Json(req): Json<SubmitScore>,
) -> AppResult<Json<DataResponse<Reservation>>> {
    let reservation =
        scores::update_score(&state, reservation_id, req.score, req.user_id).await?;
    Ok(Json(DataResponse { data: reservation }))
}
