//! Liveness probe.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
///
/// Liveness plus a cheap database round-trip.
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    courtside_db::health_check(&state.pool).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
