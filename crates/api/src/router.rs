//! Route table.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{credits, health, notifications, reservations, scores, slots};
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Booking
        .route("/reservations", post(reservations::create))
        .route("/reservations/{id}", get(reservations::get))
        .route("/reservations/{id}/join", post(reservations::join))
        .route("/reservations/{id}/cancel", post(reservations::cancel))
        .route("/reservations/{id}/score", post(scores::submit))
        .route("/users/{id}/reservations", get(reservations::list_for_user))
        // Slots
        .route("/slots", get(slots::list))
        // Credit
        .route("/users/{id}/credit", get(credits::get))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
}

/// Root-level routes (health lives outside `/api/v1`).
pub fn root_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}
