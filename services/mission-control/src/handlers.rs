use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use missionctl_missions::{
    CommandId, CommandLogEntry, CommandStatus, Mission, MissionId, MissionStatus,
    TelemetryLogEntry, DEFAULT_COMMAND_LIMIT, DEFAULT_TELEMETRY_LIMIT,
};
use missionctl_stream::{PointCloudSnapshot, PointCloudStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartMissionRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopMissionRequest {
    /// Terminal status to record, `completed` when omitted
    pub status: Option<MissionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    pub topic: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CommandQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LogTelemetryRequest {
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct LogCommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommandStatusRequest {
    pub status: CommandStatus,
}

#[derive(Debug, Serialize)]
pub struct CommandStatusResponse {
    pub id: CommandId,
    pub status: CommandStatus,
}

#[derive(Debug, Deserialize)]
pub struct LoadPointCloudRequest {
    pub positions: Vec<f32>,
    pub colors: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct StreamingResponse {
    pub message: String,
    pub is_streaming: bool,
}

/// An absent or blank body means "stop with the default status"; anything
/// else must be a valid request.
fn parse_stop_request(body: &[u8]) -> Result<StopMissionRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StopMissionRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid stop request: {}", e)))
}

fn mission_not_found(id: MissionId) -> ApiError {
    ApiError::NotFound(format!("Mission {} not found", id))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "mission-control",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// Missions

pub async fn list_missions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Mission>>, ApiError> {
    let missions = state.with_missions(|log| log.list_missions()).await?;
    Ok(Json(missions))
}

pub async fn start_mission(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<StartMissionRequest>,
) -> Result<(StatusCode, Json<Mission>), ApiError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Mission name must not be empty".to_string()));
    }

    let mission = state
        .with_missions(move |log| log.start_mission(&name))
        .await?;

    info!(mission_id = mission.id, "Mission logging started");

    Ok((StatusCode::CREATED, Json(mission)))
}

pub async fn stop_mission(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Mission>, ApiError> {
    let request = parse_stop_request(&body)?;
    let status = request.status.unwrap_or(MissionStatus::Completed);

    let mission = state
        .with_missions(move |log| log.stop_active_mission(status))
        .await?
        .ok_or_else(|| ApiError::NotFound("No active mission".to_string()))?;

    info!(mission_id = mission.id, status = %mission.status, "Mission logging stopped");

    Ok(Json(mission))
}

pub async fn mission_metadata(
    State(state): State<Arc<AppState>>,
    ApiPath(mission_id): ApiPath<MissionId>,
) -> Result<Json<Mission>, ApiError> {
    state
        .with_missions(move |log| log.get_mission(mission_id))
        .await?
        .map(Json)
        .ok_or_else(|| mission_not_found(mission_id))
}

// Telemetry and command history

pub async fn get_mission_telemetry(
    State(state): State<Arc<AppState>>,
    ApiPath(mission_id): ApiPath<MissionId>,
    ApiQuery(query): ApiQuery<TelemetryQuery>,
) -> Result<Json<Vec<TelemetryLogEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TELEMETRY_LIMIT);

    state
        .with_missions(move |log| {
            if log.get_mission(mission_id)?.is_none() {
                return Ok(None);
            }
            log.get_telemetry_logs(mission_id, query.topic.as_deref(), limit)
                .map(Some)
        })
        .await?
        .map(Json)
        .ok_or_else(|| mission_not_found(mission_id))
}

pub async fn log_mission_telemetry(
    State(state): State<Arc<AppState>>,
    ApiPath(mission_id): ApiPath<MissionId>,
    ApiJson(request): ApiJson<LogTelemetryRequest>,
) -> Result<(StatusCode, Json<TelemetryLogEntry>), ApiError> {
    let entry = state
        .with_missions(move |log| {
            if log.get_mission(mission_id)?.is_none() {
                return Ok(None);
            }
            log.log_telemetry(mission_id, &request.topic, &request.data)
                .map(Some)
        })
        .await?
        .ok_or_else(|| mission_not_found(mission_id))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_mission_commands(
    State(state): State<Arc<AppState>>,
    ApiPath(mission_id): ApiPath<MissionId>,
    ApiQuery(query): ApiQuery<CommandQuery>,
) -> Result<Json<Vec<CommandLogEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_COMMAND_LIMIT);

    state
        .with_missions(move |log| {
            if log.get_mission(mission_id)?.is_none() {
                return Ok(None);
            }
            log.get_command_logs(mission_id, limit).map(Some)
        })
        .await?
        .map(Json)
        .ok_or_else(|| mission_not_found(mission_id))
}

pub async fn log_mission_command(
    State(state): State<Arc<AppState>>,
    ApiPath(mission_id): ApiPath<MissionId>,
    ApiJson(request): ApiJson<LogCommandRequest>,
) -> Result<(StatusCode, Json<CommandLogEntry>), ApiError> {
    let entry = state
        .with_missions(move |log| {
            if log.get_mission(mission_id)?.is_none() {
                return Ok(None);
            }
            log.log_command(mission_id, &request.command, &request.parameters)
                .map(Some)
        })
        .await?
        .ok_or_else(|| mission_not_found(mission_id))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_command_status(
    State(state): State<Arc<AppState>>,
    ApiPath(command_id): ApiPath<CommandId>,
    ApiJson(request): ApiJson<UpdateCommandStatusRequest>,
) -> Result<Json<CommandStatusResponse>, ApiError> {
    let status = request.status;

    let updated = state
        .with_missions(move |log| log.update_command_status(command_id, status))
        .await?;

    if !updated {
        return Err(ApiError::NotFound(format!("Command {} not found", command_id)));
    }

    Ok(Json(CommandStatusResponse {
        id: command_id,
        status,
    }))
}

// Point cloud

pub async fn load_pointcloud(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoadPointCloudRequest>,
) -> Result<Json<Arc<PointCloudSnapshot>>, ApiError> {
    let snapshot = state
        .pointcloud
        .load_point_cloud(request.positions, request.colors)
        .await?;

    Ok(Json(snapshot))
}

pub async fn current_pointcloud(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Arc<PointCloudSnapshot>>, ApiError> {
    state
        .pointcloud
        .current_point_cloud()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No point cloud loaded".to_string()))
}

pub async fn pointcloud_status(State(state): State<Arc<AppState>>) -> Json<PointCloudStatus> {
    Json(state.pointcloud.status().await)
}

pub async fn start_streaming(State(state): State<Arc<AppState>>) -> Json<StreamingResponse> {
    state.pointcloud.start_streaming();

    Json(StreamingResponse {
        message: "Point cloud streaming started".to_string(),
        is_streaming: state.pointcloud.is_streaming(),
    })
}

pub async fn stop_streaming(State(state): State<Arc<AppState>>) -> Json<StreamingResponse> {
    state.pointcloud.stop_streaming();

    Json(StreamingResponse {
        message: "Point cloud streaming stopped".to_string(),
        is_streaming: state.pointcloud.is_streaming(),
    })
}
