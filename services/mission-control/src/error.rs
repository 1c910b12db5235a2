//! HTTP error mapping.
//!
//! Error responses have the shape `{ "status": "error", "message": "..." }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use missionctl_missions::MissionLogError;
use missionctl_stream::StreamError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Missions(#[from] MissionLogError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Missions(MissionLogError::MissionAlreadyActive { .. }) => StatusCode::CONFLICT,
            ApiError::Missions(MissionLogError::InvalidStatusTransition { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Missions(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Stream(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = json!({
            "status": "error",
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StreamError::InvalidPositions { len: 2 }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(MissionLogError::MissionAlreadyActive { id: 1 }).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MissionLogError::LockPoisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NotFound("Mission 3 not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
