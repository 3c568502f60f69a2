//! Integration tests for the scheduler against the SQLite snapshot store.

use std::time::Duration;

use lifeclock_core::storage::{Database, SqliteSnapshotStore};
use lifeclock_core::timer::{
    Scheduler, SchedulerOptions, TimerCommand, TimerConfiguration, TimerResponse,
};
use tokio::time::sleep;

fn spawn_at(path: &std::path::Path) -> lifeclock_core::SchedulerHandle {
    let store = SqliteSnapshotStore::new(Database::open_at(path).unwrap());
    Scheduler::spawn(Box::new(store), SchedulerOptions::default())
}

#[tokio::test(start_paused = true)]
async fn test_session_survives_scheduler_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifeclock.db");

    {
        let handle = spawn_at(&path);
        handle
            .start(TimerConfiguration::new(50, 20, 5).unwrap())
            .await
            .unwrap();
        sleep(Duration::from_millis(30_500)).await;
        handle.pause().await.unwrap();
    }
    // Let the first task observe the closed channel and write its final snapshot.
    sleep(Duration::from_millis(10)).await;

    let handle = spawn_at(&path);
    let reply = handle.query_state().await.unwrap();
    let state = reply.timer_state.expect("restored state");
    assert!(reply.paused);
    assert_eq!(state.block_count, 2);
    assert_eq!(state.tail_minutes, 0);
    assert!(state.is_work_phase);
    assert_eq!(state.seconds_remaining_in_phase, 20 * 60 - 30);

    // Resuming carries on from the restored countdown.
    handle.resume().await.unwrap();
    sleep(Duration::from_millis(5_500)).await;
    let state = handle.query_state().await.unwrap().timer_state.unwrap();
    assert_eq!(state.seconds_remaining_in_phase, 20 * 60 - 35);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifeclock.db");

    {
        let handle = spawn_at(&path);
        handle
            .start(TimerConfiguration::new(30, 10, 2).unwrap())
            .await
            .unwrap();
        sleep(Duration::from_millis(2_500)).await;
        handle.stop().await.unwrap();
    }
    sleep(Duration::from_millis(10)).await;

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.kv_get("timer_snapshot").unwrap(), None);

    let handle = spawn_at(&path);
    assert!(handle.query_state().await.unwrap().timer_state.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_wire_commands_drive_the_scheduler() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_at(&dir.path().join("lifeclock.db"));

    let start: TimerCommand = serde_json::from_str(
        r#"{"type":"START_TIMER","total":25,"segment":10,"grace":5}"#,
    )
    .unwrap();
    let reply = handle.dispatch(start).await.unwrap();
    assert_eq!(serde_json::to_value(&reply).unwrap()["success"], true);

    let query: TimerCommand = serde_json::from_str(r#"{"type":"GET_TIMER_STATE"}"#).unwrap();
    let TimerResponse::State(state) = handle.dispatch(query).await.unwrap() else {
        panic!("expected a state reply");
    };
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["timerState"]["blockCount"], 1);
    assert_eq!(json["timerState"]["tailMinutes"], 10);
    assert_eq!(json["paused"], false);

    let bad: TimerCommand = serde_json::from_str(
        r#"{"type":"START_TIMER","total":25,"segment":0,"grace":5}"#,
    )
    .unwrap();
    let TimerResponse::Ack(ack) = handle.dispatch(bad).await.unwrap() else {
        panic!("expected an ack");
    };
    assert!(!ack.success);
    assert!(ack.error.unwrap().contains("segmentMinutes"));
}
