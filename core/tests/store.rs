//! SQLite persistence: event log, snapshot rows and desync reports.

mod common;

use parksim_core::{
    event::{EventLogEntry, SimEvent},
    snapshot::{compare_snapshots, DesyncReport, StateSnapshot},
    store::SimStore,
    types::new_run_id,
};

fn store_with_run(run_id: &str) -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run(run_id, 42, "test").expect("run row");
    store
}

#[test]
fn migration_is_idempotent() {
    let store = store_with_run("r");
    store.migrate().expect("second migration");
}

#[test]
fn event_log_round_trips_by_tick() {
    let run_id = new_run_id();
    let store = store_with_run(&run_id);
    let events = [
        SimEvent::RunInitialized { run_id: run_id.clone(), seed: 42 },
        SimEvent::TickCompleted { tick: 0 },
        SimEvent::ChatMessage { tick: 1, player: 1, message: "hi".into() },
        SimEvent::TickCompleted { tick: 1 },
    ];
    for event in &events {
        store
            .append_event(&EventLogEntry::from_event(&run_id, event).expect("encode"))
            .expect("append");
    }

    assert_eq!(store.event_count(&run_id).expect("count"), 4);
    let tick_one = store.events_for_tick(&run_id, 1).expect("read");
    let types: Vec<&str> = tick_one.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, ["chat_message", "tick_completed"]);
    let decoded: SimEvent = serde_json::from_str(&tick_one[0].payload).expect("decode");
    assert_eq!(decoded, events[2]);
    assert_eq!(store.events_for_tick(&run_id, 0).expect("read").len(), 2);
}

#[test]
fn snapshot_rows_evict_oldest_first() {
    let store = store_with_run("snap");
    let engine = common::test_engine();
    for tick in 0..6 {
        let snapshot = StateSnapshot::of_world(&engine.world, tick).expect("snapshot");
        store.save_snapshot("snap", &snapshot).expect("save");
    }
    assert_eq!(store.snapshot_count("snap").expect("count"), 6);
    assert_eq!(store.evict_oldest_snapshots("snap", 2).expect("evict"), 4);
    assert!(store.snapshot_at("snap", 3).expect("read").is_none());

    let latest = store.latest_snapshot("snap").expect("read").expect("present");
    assert_eq!(latest.tick, 5);
    assert_eq!(latest.state, engine.world.encode().expect("encode"));
}

#[test]
fn desync_report_round_trips() {
    let store = store_with_run("desync");
    let engine = common::test_engine();
    let local = StateSnapshot::of_world(&engine.world, 9).expect("snapshot");
    let mut drifted = engine.world.clone();
    drifted.park.entrance_fee += 100;
    let remote = StateSnapshot::of_world(&drifted, 9).expect("snapshot");

    let diff = compare_snapshots(&local, &remote).expect("diff");
    let report = DesyncReport::from_diff(&local, &remote, diff);
    store.insert_desync_report("desync", &report).expect("insert");

    let stored = store.desync_reports("desync").expect("read");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tick, 9);
    assert_eq!(stored[0].total, 1);
    assert_eq!(stored[0].differences[0].path, ".park.entrance_fee");
    assert_eq!(stored[0].remote.hash, remote.hash);
}

#[test]
fn unknown_run_is_rejected_by_foreign_key() {
    let store = store_with_run("known");
    let entry = EventLogEntry::from_event("unknown", &SimEvent::TickCompleted { tick: 0 })
        .expect("encode");
    assert!(store.append_event(&entry).is_err());
}
