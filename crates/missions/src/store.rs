//! Mission Log Store - SQLite-backed mission lifecycle and event logs
//!
//! This module provides durable storage for:
//! - Missions: bounded logging sessions (active -> completed/failed)
//! - Telemetry logs: append-only, timestamped topic samples per mission
//! - Command logs: issued commands whose status may be updated
//!
//! # Guarantees
//!
//! - Every mutating call commits before it returns
//! - Telemetry entries are never updated or deleted
//! - A mission leaves `active` at most once; `end_time` is set exactly then
//! - `start_mission` checks for an active mission and inserts under the same
//!   lock and transaction, so two concurrent starts cannot both succeed
//!
//! # Non-guarantees
//!
//! - `mission_id` on log entries is not checked against `missions`
//! - `create_mission` does not look at existing active missions

use chrono::{DateTime, Timelike, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{MissionLogError, Result};
use crate::model::{
    CommandId, CommandLogEntry, CommandStatus, Mission, MissionId, MissionStatus,
    TelemetryLogEntry,
};

/// Telemetry entries returned when the caller gives no limit
pub const DEFAULT_TELEMETRY_LIMIT: usize = 100;

/// Command entries returned when the caller gives no limit
pub const DEFAULT_COMMAND_LIMIT: usize = 50;

const MISSION_COLUMNS: &str = "id, name, start_time, end_time, status";
const TELEMETRY_COLUMNS: &str = "id, mission_id, timestamp, topic, data";
const COMMAND_COLUMNS: &str = "id, mission_id, timestamp, command, parameters, status";

/// Observability counters for the mission log
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLogMetrics {
    /// Missions inserted
    pub missions_created_total: u64,
    /// Missions moved to a terminal status
    pub missions_ended_total: u64,
    /// Telemetry entries appended
    pub telemetry_logged_total: u64,
    /// Command entries appended
    pub commands_logged_total: u64,
    /// Successful command status updates
    pub command_status_updates_total: u64,
}

struct Inner {
    conn: Connection,
    metrics: MissionLogMetrics,
}

/// Mission log store with SQLite backend
///
/// The connection is serialized behind a mutex, so a `MissionLog` can be
/// shared across threads with `Arc`. Calls block on SQLite I/O; async callers
/// should run them on a blocking worker.
pub struct MissionLog {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl MissionLog {
    /// Create or open a mission log at the specified path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), "Opening mission log");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory mission log
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        Self::init_schema(&conn)?;

        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                metrics: MissionLogMetrics::default(),
            }),
            path,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS missions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                status TEXT NOT NULL DEFAULT 'active'
            );

            CREATE TABLE IF NOT EXISTS telemetry_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mission_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                topic TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS command_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mission_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                command TEXT NOT NULL,
                parameters TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'sent'
            );

            CREATE INDEX IF NOT EXISTS idx_missions_status ON missions(status);
            CREATE INDEX IF NOT EXISTS idx_missions_start_time ON missions(start_time);
            CREATE INDEX IF NOT EXISTS idx_telemetry_mission ON telemetry_logs(mission_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_telemetry_topic ON telemetry_logs(topic);
            CREATE INDEX IF NOT EXISTS idx_command_mission ON command_logs(mission_id, timestamp);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| MissionLogError::LockPoisoned)
    }

    // Missions

    /// Insert a new mission in `active` status starting now
    ///
    /// Does not check for other active missions; use [`MissionLog::start_mission`]
    /// when the single-active-mission rule must hold.
    pub fn create_mission(&self, name: &str) -> Result<Mission> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let mission = Self::insert_mission(&inner.conn, name)?;
        inner.metrics.missions_created_total += 1;

        info!(mission_id = mission.id, name = %mission.name, "Mission created");

        Ok(mission)
    }

    /// Start a mission unless one is already active
    ///
    /// # Returns
    /// * `Ok(Mission)` - The newly created active mission
    /// * `Err(MissionLogError::MissionAlreadyActive)` - Another mission is active
    pub fn start_mission(&self, name: &str) -> Result<Mission> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let tx = inner.conn.transaction()?;

        if let Some(active) = Self::find_active(&tx)? {
            warn!(
                active_mission_id = active.id,
                "Refusing to start mission while another is active"
            );
            return Err(MissionLogError::MissionAlreadyActive { id: active.id });
        }

        let mission = Self::insert_mission(&tx, name)?;
        tx.commit()?;

        inner.metrics.missions_created_total += 1;

        info!(mission_id = mission.id, name = %mission.name, "Mission started");

        Ok(mission)
    }

    fn insert_mission(conn: &Connection, name: &str) -> Result<Mission> {
        let start_time = utc_now();

        conn.execute(
            "INSERT INTO missions (name, start_time, end_time, status) VALUES (?1, ?2, NULL, ?3)",
            params![name, start_time.timestamp_micros(), MissionStatus::Active],
        )?;

        Ok(Mission {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            start_time,
            end_time: None,
            status: MissionStatus::Active,
        })
    }

    /// Look up a mission by id
    pub fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let inner = self.lock()?;

        let mission = inner
            .conn
            .query_row(
                &format!("SELECT {} FROM missions WHERE id = ?1", MISSION_COLUMNS),
                [id],
                mission_from_row,
            )
            .optional()?;

        Ok(mission)
    }

    /// Get the active mission, if any
    ///
    /// Should several missions be active (possible only through
    /// `create_mission`), the most recently started one is returned.
    pub fn get_active_mission(&self) -> Result<Option<Mission>> {
        let inner = self.lock()?;
        Self::find_active(&inner.conn)
    }

    fn find_active(conn: &Connection) -> Result<Option<Mission>> {
        let mission = conn
            .query_row(
                &format!(
                    "SELECT {} FROM missions WHERE status = ?1 \
                     ORDER BY start_time DESC, id DESC LIMIT 1",
                    MISSION_COLUMNS
                ),
                [MissionStatus::Active],
                mission_from_row,
            )
            .optional()?;

        Ok(mission)
    }

    /// End an active mission with a terminal status
    ///
    /// # Returns
    /// * `Ok(true)` - The mission was active and is now ended
    /// * `Ok(false)` - No such mission, or it had already ended
    /// * `Err(InvalidStatusTransition)` - `status` is `active`
    pub fn end_mission(&self, id: MissionId, status: MissionStatus) -> Result<bool> {
        if !status.is_terminal() {
            return Err(MissionLogError::InvalidStatusTransition { status });
        }

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let ended = Self::close_mission(&inner.conn, id, status, utc_now())?;

        if ended {
            inner.metrics.missions_ended_total += 1;
            info!(mission_id = id, status = %status, "Mission ended");
        } else {
            debug!(mission_id = id, "End requested for unknown or finished mission");
        }

        Ok(ended)
    }

    /// End whichever mission is active and return its final record
    pub fn stop_active_mission(&self, status: MissionStatus) -> Result<Option<Mission>> {
        if !status.is_terminal() {
            return Err(MissionLogError::InvalidStatusTransition { status });
        }

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let tx = inner.conn.transaction()?;

        let Some(mut mission) = Self::find_active(&tx)? else {
            return Ok(None);
        };

        let end_time = utc_now();
        if !Self::close_mission(&tx, mission.id, status, end_time)? {
            return Ok(None);
        }
        tx.commit()?;

        inner.metrics.missions_ended_total += 1;

        mission.end_time = Some(end_time);
        mission.status = status;

        info!(mission_id = mission.id, status = %status, "Active mission stopped");

        Ok(Some(mission))
    }

    fn close_mission(
        conn: &Connection,
        id: MissionId,
        status: MissionStatus,
        end_time: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = conn.execute(
            "UPDATE missions SET end_time = ?1, status = ?2 WHERE id = ?3 AND status = ?4",
            params![end_time.timestamp_micros(), status, id, MissionStatus::Active],
        )?;

        Ok(affected == 1)
    }

    /// All missions, most recently started first
    pub fn list_missions(&self) -> Result<Vec<Mission>> {
        let inner = self.lock()?;

        let mut stmt = inner.conn.prepare(&format!(
            "SELECT {} FROM missions ORDER BY start_time DESC, id DESC",
            MISSION_COLUMNS
        ))?;

        let missions = stmt
            .query_map([], mission_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(missions)
    }

    // Telemetry

    /// Append a telemetry sample to a mission
    pub fn log_telemetry(
        &self,
        mission_id: MissionId,
        topic: &str,
        data: &serde_json::Value,
    ) -> Result<TelemetryLogEntry> {
        let encoded = serde_json::to_string(data)?;
        let timestamp = utc_now();

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        inner.conn.execute(
            "INSERT INTO telemetry_logs (mission_id, timestamp, topic, data) VALUES (?1, ?2, ?3, ?4)",
            params![mission_id, timestamp.timestamp_micros(), topic, encoded],
        )?;
        let id = inner.conn.last_insert_rowid();

        inner.metrics.telemetry_logged_total += 1;

        debug!(mission_id, entry_id = id, topic, "Telemetry logged");

        Ok(TelemetryLogEntry {
            id,
            mission_id,
            timestamp,
            topic: topic.to_string(),
            data: data.clone(),
        })
    }

    /// Newest-first telemetry for a mission, optionally restricted to one topic
    pub fn get_telemetry_logs(
        &self,
        mission_id: MissionId,
        topic: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TelemetryLogEntry>> {
        let inner = self.lock()?;

        let mut stmt = inner.conn.prepare(&format!(
            "SELECT {} FROM telemetry_logs \
             WHERE mission_id = ?1 AND (?2 IS NULL OR topic = ?2) \
             ORDER BY timestamp DESC, id DESC LIMIT ?3",
            TELEMETRY_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![mission_id, topic, sql_limit(limit)], |row| {
                Ok(TelemetryLogEntry {
                    id: row.get(0)?,
                    mission_id: row.get(1)?,
                    timestamp: timestamp_column(row, 2)?,
                    topic: row.get(3)?,
                    data: json_column(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // Commands

    /// Record an issued command with status `sent`
    pub fn log_command(
        &self,
        mission_id: MissionId,
        command: &str,
        parameters: &serde_json::Value,
    ) -> Result<CommandLogEntry> {
        let encoded = serde_json::to_string(parameters)?;
        let timestamp = utc_now();

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        inner.conn.execute(
            "INSERT INTO command_logs (mission_id, timestamp, command, parameters, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mission_id,
                timestamp.timestamp_micros(),
                command,
                encoded,
                CommandStatus::Sent
            ],
        )?;
        let id = inner.conn.last_insert_rowid();

        inner.metrics.commands_logged_total += 1;

        debug!(mission_id, command_id = id, command, "Command logged");

        Ok(CommandLogEntry {
            id,
            mission_id,
            timestamp,
            command: command.to_string(),
            parameters: parameters.clone(),
            status: CommandStatus::Sent,
        })
    }

    /// Set the status of a command entry; `false` if no such entry exists
    pub fn update_command_status(&self, command_id: CommandId, status: CommandStatus) -> Result<bool> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let affected = inner.conn.execute(
            "UPDATE command_logs SET status = ?1 WHERE id = ?2",
            params![status, command_id],
        )?;

        let updated = affected == 1;
        if updated {
            inner.metrics.command_status_updates_total += 1;
            debug!(command_id, status = %status, "Command status updated");
        }

        Ok(updated)
    }

    /// Newest-first command history for a mission
    pub fn get_command_logs(&self, mission_id: MissionId, limit: usize) -> Result<Vec<CommandLogEntry>> {
        let inner = self.lock()?;

        let mut stmt = inner.conn.prepare(&format!(
            "SELECT {} FROM command_logs WHERE mission_id = ?1 \
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
            COMMAND_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![mission_id, sql_limit(limit)], |row| {
                Ok(CommandLogEntry {
                    id: row.get(0)?,
                    mission_id: row.get(1)?,
                    timestamp: timestamp_column(row, 2)?,
                    command: row.get(3)?,
                    parameters: json_column(row, 4)?,
                    status: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Snapshot of the store's counters
    pub fn metrics(&self) -> Result<MissionLogMetrics> {
        Ok(self.lock()?.metrics.clone())
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Current UTC time truncated to the stored microsecond precision
fn utc_now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn micros_to_datetime(idx: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    micros_to_datetime(idx, row.get(idx)?)
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn mission_from_row(row: &Row<'_>) -> rusqlite::Result<Mission> {
    Ok(Mission {
        id: row.get(0)?,
        name: row.get(1)?,
        start_time: timestamp_column(row, 2)?,
        end_time: row
            .get::<_, Option<i64>>(3)?
            .map(|micros| micros_to_datetime(3, micros))
            .transpose()?,
        status: row.get(4)?,
    })
}
