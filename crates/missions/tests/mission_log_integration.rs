//! Integration tests for the mission log store
//!
//! These tests verify end-to-end scenarios including:
//! - Mission lifecycle across a process restart
//! - Telemetry and command history ordering and limits
//! - Concurrent mission starts against one store

use missionctl_missions::{
    CommandStatus, MissionLog, MissionLogError, MissionStatus, DEFAULT_COMMAND_LIMIT,
    DEFAULT_TELEMETRY_LIMIT,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

fn temp_db(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}.db", prefix, uuid::Uuid::new_v4()))
}

fn cleanup(path: &PathBuf) {
    std::fs::remove_file(path).ok();
    std::fs::remove_file(path.with_extension("db-wal")).ok();
    std::fs::remove_file(path.with_extension("db-shm")).ok();
}

#[test]
fn test_mission_survives_restart() {
    let db_path = temp_db("integration_restart");

    let mission_id = {
        let log = MissionLog::open(&db_path).unwrap();
        assert_eq!(log.path(), Some(db_path.as_path()));

        let mission = log.start_mission("Traverse").unwrap();
        log.log_telemetry(mission.id, "sensors/vesc", &json!({"temperature": 25.5, "voltage": 12.1}))
            .unwrap();
        let cmd = log
            .log_command(mission.id, "drive", &json!({"linear": 0.4, "angular": 0.0}))
            .unwrap();
        log.update_command_status(cmd.id, CommandStatus::Acknowledged)
            .unwrap();
        mission.id
    };

    {
        let log = MissionLog::open(&db_path).unwrap();

        let active = log.get_active_mission().unwrap().unwrap();
        assert_eq!(active.id, mission_id);
        assert_eq!(active.name, "Traverse");

        let telemetry = log
            .get_telemetry_logs(mission_id, Some("sensors/vesc"), DEFAULT_TELEMETRY_LIMIT)
            .unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].data, json!({"temperature": 25.5, "voltage": 12.1}));

        let commands = log.get_command_logs(mission_id, DEFAULT_COMMAND_LIMIT).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].status, CommandStatus::Acknowledged);

        // Counters are per-process
        assert_eq!(log.metrics().unwrap().telemetry_logged_total, 0);
    }

    cleanup(&db_path);
}

#[test]
fn test_end_mission_lifecycle() {
    let db_path = temp_db("integration_lifecycle");
    let log = MissionLog::open(&db_path).unwrap();

    let mission = log.create_mission("M").unwrap();
    assert_eq!(mission.status, MissionStatus::Active);
    assert!(mission.end_time.is_none());

    assert!(log.end_mission(mission.id, MissionStatus::Completed).unwrap());
    let ended = log.get_mission(mission.id).unwrap().unwrap();
    assert_eq!(ended.status, MissionStatus::Completed);
    let end_time = ended.end_time.unwrap();
    assert!(end_time >= ended.start_time);

    assert!(!log.end_mission(mission.id, MissionStatus::Completed).unwrap());

    cleanup(&db_path);
}

#[test]
fn test_telemetry_limit_returns_most_recent() {
    let db_path = temp_db("integration_limit");
    let log = MissionLog::open(&db_path).unwrap();
    let mission = log.create_mission("limits").unwrap();

    let total = 25;
    for i in 0..total {
        let topic = if i % 2 == 0 { "even" } else { "odd" };
        log.log_telemetry(mission.id, topic, &json!({"i": i})).unwrap();
    }

    let latest = log.get_telemetry_logs(mission.id, None, 5).unwrap();
    let indexes: Vec<i64> = latest.iter().map(|e| e.data["i"].as_i64().unwrap()).collect();
    assert_eq!(indexes, vec![24, 23, 22, 21, 20]);
    assert!(latest.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    let odd = log.get_telemetry_logs(mission.id, Some("odd"), 100).unwrap();
    assert_eq!(odd.len(), 12);
    assert!(odd.iter().all(|e| e.topic == "odd"));

    assert!(log.get_telemetry_logs(mission.id, None, 0).unwrap().is_empty());

    cleanup(&db_path);
}

#[test]
fn test_command_history_is_newest_first() {
    let db_path = temp_db("integration_commands");
    let log = MissionLog::open(&db_path).unwrap();
    let mission = log.create_mission("commands").unwrap();

    let first = log.log_command(mission.id, "arm", &json!({})).unwrap();
    let second = log.log_command(mission.id, "drive", &json!({"speed": 1})).unwrap();
    log.update_command_status(first.id, CommandStatus::Failed).unwrap();

    let history = log.get_command_logs(mission.id, 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[0].status, CommandStatus::Sent);
    assert_eq!(history[1].id, first.id);
    assert_eq!(history[1].status, CommandStatus::Failed);

    assert_eq!(log.get_command_logs(mission.id, 1).unwrap().len(), 1);

    cleanup(&db_path);
}

#[test]
fn test_concurrent_starts_yield_one_active_mission() {
    let db_path = temp_db("integration_concurrent");
    let log = Arc::new(MissionLog::open(&db_path).unwrap());

    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let log = Arc::clone(&log);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                log.start_mission(&format!("racer-{}", i))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let started = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(MissionLogError::MissionAlreadyActive { .. })))
        .count();
    assert_eq!(started, 1);
    assert_eq!(refused, workers - 1);

    let missions = log.list_missions().unwrap();
    assert_eq!(missions.len(), 1);
    assert_eq!(missions[0].status, MissionStatus::Active);

    cleanup(&db_path);
}
