use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courtside_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `courtside_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => (core_status(core), core.code(), core_message(core)),

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// HTTP status for each domain error.
///
/// Contention and business conflicts are 409, validation failures 400.
fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,

        CoreError::Validation(_)
        | CoreError::InvalidRange(_)
        | CoreError::InvalidAmount
        | CoreError::InsufficientFunds
        | CoreError::InvalidScore(_)
        | CoreError::MatchUndecided => StatusCode::BAD_REQUEST,

        CoreError::SlotFull
        | CoreError::SlotJustTaken
        | CoreError::SlotContention
        | CoreError::TooLateToCancel
        | CoreError::ScoreLocked
        | CoreError::Conflict(_) => StatusCode::CONFLICT,

        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message for each domain error; internal details are sanitized.
fn core_message(err: &CoreError) -> String {
    match err {
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            "An internal error occurred".to_string()
        }
        other => other.to_string(),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Deadlocks (40P01) and serialization failures (40001) map to 409
///   `SLOT_CONTENTION`: the booking lock order makes these retryable.
/// - Unique violations (23505) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("40001") | Some("40P01") => (
                StatusCode::CONFLICT,
                "SLOT_CONTENTION",
                "The slot is being booked concurrently, retry".to_string(),
            ),
            Some("23505") => {
                let constraint = db_err.constraint().unwrap_or("unknown");
                (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                )
            }
            _ => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        },
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
