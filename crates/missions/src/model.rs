//! Record types persisted by the mission log.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row identifier of a mission
pub type MissionId = i64;

/// Row identifier of a command log entry
pub type CommandId = i64;

/// Lifecycle status of a mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    /// Mission is recording
    Active,
    /// Mission ended normally
    Completed,
    /// Mission was aborted
    Failed,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Active => "active",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
        }
    }

    /// Whether the status ends a mission
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MissionStatus::Active)
    }
}

/// Delivery status of an issued command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Sent,
    Acknowledged,
    Failed,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Sent => "sent",
            CommandStatus::Acknowledged => "acknowledged",
            CommandStatus::Failed => "failed",
        }
    }
}

/// Error returned when a status string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for MissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MissionStatus::Active),
            "completed" => Ok(MissionStatus::Completed),
            "failed" => Ok(MissionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for CommandStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(CommandStatus::Sent),
            "acknowledged" => Ok(CommandStatus::Acknowledged),
            "failed" => Ok(CommandStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sql_text_enum!(MissionStatus);
sql_text_enum!(CommandStatus);

/// A bounded logging session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub start_time: DateTime<Utc>,
    /// Unset while the mission is active
    pub end_time: Option<DateTime<Utc>>,
    pub status: MissionStatus,
}

/// Immutable telemetry sample attached to a mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryLogEntry {
    pub id: i64,
    pub mission_id: MissionId,
    pub timestamp: DateTime<Utc>,
    /// Source key, e.g. `sensors/vesc`
    pub topic: String,
    pub data: serde_json::Value,
}

/// Record of an issued command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub id: CommandId,
    pub mission_id: MissionId,
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub parameters: serde_json::Value,
    pub status: CommandStatus,
}
