use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: courtside_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus; booking flows publish here after commit.
    pub event_bus: Arc<courtside_events::EventBus>,
}
