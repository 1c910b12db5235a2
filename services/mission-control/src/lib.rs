//! Mission control HTTP/WebSocket service.
//!
//! Exposes mission logging, telemetry/command history and point cloud
//! distribution over a versioned REST API plus a WebSocket stream.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use state::AppState;

/// Build the service router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/missions/list", get(handlers::list_missions))
        .route("/api/v1/missions/start", post(handlers::start_mission))
        .route("/api/v1/missions/stop", post(handlers::stop_mission))
        .route(
            "/api/v1/missions/:mission_id/metadata",
            get(handlers::mission_metadata),
        )
        .route(
            "/api/v1/data/telemetry/:mission_id",
            get(handlers::get_mission_telemetry).post(handlers::log_mission_telemetry),
        )
        .route(
            "/api/v1/data/commands/:mission_id",
            get(handlers::get_mission_commands).post(handlers::log_mission_command),
        )
        .route(
            "/api/v1/data/commands/status/:command_id",
            put(handlers::update_command_status),
        )
        .route("/api/v1/pointcloud/load", post(handlers::load_pointcloud))
        .route("/api/v1/pointcloud/current", get(handlers::current_pointcloud))
        .route("/api/v1/pointcloud/status", get(handlers::pointcloud_status))
        .route(
            "/api/v1/pointcloud/stream/start",
            post(handlers::start_streaming),
        )
        .route("/api/v1/pointcloud/stream/stop", post(handlers::stop_streaming))
        .route("/api/v1/pointcloud/ws", get(ws::pointcloud_ws))
        .with_state(state)
}
