//! Mission Log Store
//!
//! Durable mission lifecycle tracking for the rover backend. A mission is a
//! bounded logging session; telemetry samples and issued commands are
//! recorded against it and queried newest-first.
//!
//! # Examples
//!
//! ```no_run
//! use missionctl_missions::{MissionLog, MissionStatus};
//! use serde_json::json;
//!
//! let log = MissionLog::open("./mission_control.db")?;
//! let mission = log.start_mission("Yard traverse")?;
//! log.log_telemetry(mission.id, "sensors/vesc", &json!({"rpm": 1200}))?;
//! log.end_mission(mission.id, MissionStatus::Completed)?;
//! # Ok::<(), missionctl_missions::MissionLogError>(())
//! ```

pub mod error;
pub mod model;
pub mod store;

pub use error::{MissionLogError, Result};
pub use model::{
    CommandId, CommandLogEntry, CommandStatus, Mission, MissionId, MissionStatus,
    TelemetryLogEntry, UnknownStatus,
};
pub use store::{MissionLog, MissionLogMetrics, DEFAULT_COMMAND_LIMIT, DEFAULT_TELEMETRY_LIMIT};
