//! Server-side snapshot linkage, retention and restore.

mod common;

use common::ScriptedSession;
use parksim_core::{
    config::SimConfig,
    engine::SimEngine,
    error::SimError,
    event::SimEvent,
    network::NetworkMode,
    snapshot::{MemorySnapshotStore, SnapshotStore, StateSnapshot},
    store::{SimStore, SqliteSnapshotStore},
    types::Tick,
};

fn server(history: usize) -> SimEngine {
    let config = SimConfig { snapshot_history: history, ..SimConfig::default_test() };
    let (session, _log) = ScriptedSession::new(NetworkMode::Server);
    SimEngine::build(config).with_network(session)
}

#[test]
fn server_links_one_snapshot_per_tick_matching_offline_replay() {
    const TICKS: Tick = 40;
    let mut engine = server(64);
    let events = engine.run_ticks(TICKS).expect("ticks");

    let captured: Vec<Tick> = events
        .iter()
        .filter_map(|e| match e {
            SimEvent::SnapshotCaptured { tick, .. } => Some(*tick),
            _ => None,
        })
        .collect();
    assert_eq!(captured, (0..TICKS).collect::<Vec<_>>(), "unique, strictly increasing ticks");
    assert_eq!(engine.snapshots().len().expect("len"), TICKS as usize);

    let mut offline = common::test_engine();
    for tick in 0..TICKS {
        let snapshot = engine.snapshots().find(tick).expect("find").expect("retained");
        let expected = offline.state_checksum().expect("hash");
        assert_eq!(snapshot.tick, tick);
        assert_eq!(snapshot.checksum(), expected, "snapshot at tick {tick}");
        offline.update_logic(None).expect("tick");
    }
}

#[test]
fn memory_history_evicts_oldest() {
    let mut engine = server(8);
    engine.run_ticks(30).expect("ticks");
    assert_eq!(engine.snapshots().len().expect("len"), 8);
    assert!(engine.snapshots().find(21).expect("find").is_none());
    for tick in 22..30 {
        assert!(engine.snapshots().find(tick).expect("find").is_some(), "tick {tick}");
    }
}

#[test]
fn offline_engine_takes_no_snapshots() {
    let mut engine = common::test_engine();
    let events = engine.run_ticks(10).expect("ticks");
    assert!(!events.iter().any(|e| matches!(e, SimEvent::SnapshotCaptured { .. })));
    assert_eq!(engine.snapshots().len().expect("len"), 0);
}

#[test]
fn sqlite_store_retains_recent_snapshots_and_restores() {
    let store = SimStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    store.insert_run("sqlite-run", 42, "test").expect("run");

    let mut engine = server(5).with_snapshot_store(SqliteSnapshotStore::new(store, "sqlite-run", 5));
    engine.run_ticks(12).expect("ticks");

    assert_eq!(engine.snapshots().len().expect("len"), 5);
    assert!(engine.snapshots().find(3).expect("find").is_none());
    let latest = engine.snapshots().find(11).expect("find").expect("tick 11 retained");

    let mut restored = common::test_engine();
    restored.restore(&latest).expect("restore");
    assert_eq!(restored.clock.current_tick, 11);
    assert_eq!(restored.state_checksum().expect("hash").hash, latest.hash);

    // One more tick from the restored state lands where the server did.
    restored.update_logic(None).expect("tick");
    assert_eq!(
        restored.state_checksum().expect("hash"),
        engine.state_checksum().expect("hash")
    );
}

#[test]
fn server_keeps_ticking_after_restoring_an_earlier_snapshot() {
    let mut engine = server(16);
    engine.run_ticks(10).expect("ticks");
    let earlier = engine.snapshots().find(3).expect("find").expect("tick 3 retained");

    engine.restore(&earlier).expect("restore");
    assert_eq!(engine.clock.current_tick, 3);
    assert_eq!(engine.snapshots().len().expect("len"), 0, "history restarts with the world");

    let events = engine.run_ticks(5).expect("ticks after restore");
    assert_eq!(engine.clock.current_tick, 8);
    let captured: Vec<Tick> = events
        .iter()
        .filter_map(|e| match e {
            SimEvent::SnapshotCaptured { tick, .. } => Some(*tick),
            _ => None,
        })
        .collect();
    assert_eq!(captured, [3, 4, 5, 6, 7]);
    let relinked = engine.snapshots().find(3).expect("find").expect("relinked");
    assert_eq!(relinked, earlier, "replay from the restore point is identical");
}

#[test]
fn sqlite_store_clears_history_on_restore() {
    let store = SimStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    store.insert_run("restore-run", 42, "test").expect("run");

    let mut engine = server(8).with_snapshot_store(SqliteSnapshotStore::new(store, "restore-run", 8));
    engine.run_ticks(6).expect("ticks");
    let earlier = engine.snapshots().find(2).expect("find").expect("retained");

    engine.restore(&earlier).expect("restore");
    assert_eq!(engine.snapshots().len().expect("len"), 0);
    engine.run_ticks(2).expect("ticks after restore");
    assert_eq!(engine.snapshots().len().expect("len"), 2);
    assert!(engine.snapshots().find(5).expect("find").is_none(), "pre-restore rows are gone");
}

#[test]
fn restore_rejects_mismatched_seed() {
    let engine = common::test_engine();
    let mut snapshot = StateSnapshot::of_world(&engine.world, 0).expect("snapshot");
    snapshot.seed = snapshot.seed.wrapping_add(1);

    let mut target = common::test_engine();
    let before = target.state_checksum().expect("hash");
    let err = target.restore(&snapshot).expect_err("must reject");
    assert!(matches!(err, SimError::InvariantViolation { tick: 0, .. }));
    assert_eq!(target.state_checksum().expect("hash"), before, "world untouched");
}

#[test]
fn store_rejects_linking_the_same_pair_twice() {
    let engine = common::test_engine();
    let mut store = MemorySnapshotStore::new(4);
    let first = store.create_snapshot();
    store.capture(first, &engine.world).expect("capture");
    store.link_snapshot(first, 5, 9).expect("link");

    let second = store.create_snapshot();
    store.capture(second, &engine.world).expect("capture");
    assert!(matches!(
        store.link_snapshot(second, 5, 9),
        Err(SimError::SnapshotOrder { tick: 5, last_tick: 5, .. })
    ));
    store.link_snapshot(second, 6, 9).expect("later tick is fine");
}
