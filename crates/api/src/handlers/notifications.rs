//! Handlers for the `/notifications` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use courtside_core::error::CoreError;
use courtside_core::types::DbId;
use courtside_db::models::notification::Notification;
use courtside_db::repositories::NotificationRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub user_id: DbId,
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// GET /api/v1/notifications?user_id=..
///
/// List a user's notifications with optional filtering.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let unread_only = params.unread_only.unwrap_or(false);

    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        params.user_id,
        unread_only,
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// Payload for `POST /notifications/{id}/read`.
#[derive(Debug, Deserialize)]
pub struct MarkRead {
    pub user_id: DbId,
}

/// POST /api/v1/notifications/{id}/read
///
/// Mark a single notification as read. Returns 204 No Content on success,
/// or 404 if the notification does not belong to the user.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
    Json(req): Json<MarkRead>,
) -> AppResult<impl IntoResponse> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id, req.user_id).await?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}
