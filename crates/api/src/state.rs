use std::sync::Arc;

use pillars_tracker::ProcessingTracker;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pillars_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Processing tracker: sessions + pipeline progress.
    pub tracker: Arc<ProcessingTracker>,
    /// Centralized event bus carrying tracker change notifications.
    pub event_bus: Arc<pillars_events::EventBus>,
}
