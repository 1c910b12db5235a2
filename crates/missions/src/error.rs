//! Errors that can occur in mission log operations

use thiserror::Error;

use crate::model::{MissionId, MissionStatus};

#[derive(Debug, Error)]
pub enum MissionLogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Payload serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Mission {id} is already active")]
    MissionAlreadyActive { id: MissionId },

    #[error("Invalid mission status transition to {status}")]
    InvalidStatusTransition { status: MissionStatus },

    #[error("Mission log connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, MissionLogError>;
