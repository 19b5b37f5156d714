//! Handlers for the `/reservations` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use courtside_core::error::CoreError;
use courtside_core::types::DbId;
use courtside_db::models::participant::Participant;
use courtside_db::models::reservation::Reservation;
use courtside_db::repositories::{ParticipantRepo, ReservationRepo};
use serde::{Deserialize, Serialize};

use crate::engine::booking::{
    self, CancelReservation, CreateReservation, JoinReservation,
};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for reservation listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for reservation listing.
const DEFAULT_LIMIT: i64 = 50;

/// A reservation together with its seats.
#[derive(Debug, Serialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub participants: Vec<Participant>,
}

/// POST /api/v1/reservations
///
/// Book a slot. Returns 201 with the created reservation, 409 on capacity
/// or contention failures, 400 on insufficient funds or bad input.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<DataResponse<Reservation>>)> {
    let reservation = booking::create_reservation(&state, req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: reservation })))
}

/// POST /api/v1/reservations/{id}/join
///
/// Take a seat on an open match.
pub async fn join(
    State(state): State<AppState>,
    Path(reservation_id): Path<DbId>,
    Json(req): Json<JoinReservation>,
) -> AppResult<Json<DataResponse<Participant>>> {
    let participant = booking::join_reservation(&state, reservation_id, req).await?;
    Ok(Json(DataResponse { data: participant }))
}

/// POST /api/v1/reservations/{id}/cancel
///
/// Cancel a reservation (creator) or leave it (participant). Returns the
/// reservation in its post-cancellation state.
pub async fn cancel(
    State(state): State<AppState>,
    Path(reservation_id): Path<DbId>,
    Json(req): Json<CancelReservation>,
) -> AppResult<Json<DataResponse<Reservation>>> {
    let reservation = booking::cancel_reservation(&state, reservation_id, req).await?;
    Ok(Json(DataResponse { data: reservation }))
}

/// GET /api/v1/reservations/{id}
///
/// One reservation with its participants.
pub async fn get(
    State(state): State<AppState>,
    Path(reservation_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ReservationDetail>>> {
    let reservation = ReservationRepo::find_by_id(&state.pool, reservation_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Reservation",
            id: reservation_id,
        })?;
    let participants = ParticipantRepo::list_for_reservation(&state.pool, reservation_id).await?;
    Ok(Json(DataResponse {
        data: ReservationDetail {
            reservation,
            participants,
        },
    }))
}

/// Query parameters for the per-user reservation listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/users/{id}/reservations
///
/// Reservations the user created or joined, newest first.
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let reservations =
        ReservationRepo::list_for_user(&state.pool, user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: reservations }))
}
