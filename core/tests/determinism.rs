//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Same starting state, same ordered actions, same number of ticks:
//! the world hash and the event log must be byte-identical.
//! Any divergence is a blocker. Do not merge until fixed.

mod common;

use parksim_core::{
    action::GameAction,
    config::SimConfig,
    engine::SimEngine,
    event::EventLogEntry,
    research_subsystem::ResearchFunding,
    ride_subsystem::RideStatus,
    snapshot::StateSnapshot,
    store::SimStore,
    types::{Tick, TileCoord},
};

const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

/// Actions submitted at fixed ticks, including some that will be rejected.
fn scripted_actions() -> Vec<(Tick, GameAction)> {
    vec![
        (10, GameAction::PlacePath { at: TileCoord::new(3, 3), provisional: true }),
        (10, GameAction::PlacePath { at: TileCoord::new(4, 3), provisional: false }),
        (50, GameAction::SetRidePrice { ride: 0, price: 350 }),
        (50, GameAction::SetRidePrice { ride: 99, price: 1 }),
        (120, GameAction::SetParkEntranceFee { fee: 1500 }),
        (200, GameAction::SetRideStatus { ride: 1, status: RideStatus::Closed }),
        (260, GameAction::Chat { message: "hello".into() }),
        (320, GameAction::RemovePath { at: TileCoord::new(3, 3) }),
        (400, GameAction::SetResearchFunding { funding: ResearchFunding::Maximum }),
        (480, GameAction::SetRideStatus { ride: 1, status: RideStatus::Open }),
        (650, GameAction::PlacePath { at: TileCoord::new(5, 3), provisional: true }),
    ]
}

fn run(engine: &mut SimEngine, until: Tick, store: &SimStore, run_id: &str) {
    let actions = scripted_actions();
    while engine.clock.current_tick < until {
        let tick = engine.clock.current_tick;
        for (_, action) in actions.iter().filter(|(at, _)| *at == tick) {
            engine.submit_action(0, action.clone());
        }
        let outcome = engine.update_logic(None).expect("tick");
        for event in &outcome.events {
            store
                .append_event(&EventLogEntry::from_event(run_id, event).expect("encode"))
                .expect("append");
        }
    }
}

fn event_log(store: &SimStore, run_id: &str, until: Tick) -> Vec<String> {
    (0..until)
        .flat_map(|tick| {
            store
                .events_for_tick(run_id, tick)
                .expect("read events")
                .into_iter()
                .map(|e| e.payload)
        })
        .collect()
}

fn store_with_run(run_id: &str, seed: u64) -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run(run_id, seed, "0.1.0-test").expect("insert run");
    store
}

fn config(seed: u64) -> SimConfig {
    SimConfig { seed, ..SimConfig::default_test() }
}

#[test]
fn same_seed_produces_identical_state_and_event_logs() {
    const TICKS: Tick = 800;
    let store = store_with_run("a", SEED);
    store.insert_run("b", SEED, "0.1.0-test").expect("insert run");

    let mut engine_a = SimEngine::build(config(SEED));
    let mut engine_b = SimEngine::build(config(SEED));
    run(&mut engine_a, TICKS, &store, "a");
    run(&mut engine_b, TICKS, &store, "b");

    assert_eq!(
        engine_a.state_checksum().expect("hash a"),
        engine_b.state_checksum().expect("hash b"),
        "world state diverged"
    );

    let log_a = event_log(&store, "a", TICKS);
    let log_b = event_log(&store, "b", TICKS);
    assert!(log_a.len() >= TICKS as usize, "every tick logs at least its completion");
    assert_eq!(log_a.len(), log_b.len(), "event log lengths differ");
    for (i, (a, b)) in log_a.iter().zip(log_b.iter()).enumerate() {
        assert_eq!(a, b, "event log diverged at entry {i}:\n  A: {a}\n  B: {b}");
    }
}

#[test]
fn different_seeds_diverge() {
    let store = store_with_run("x", 1);
    store.insert_run("y", 2, "0.1.0-test").expect("insert run");
    let mut a = SimEngine::build(config(1));
    let mut b = SimEngine::build(config(2));
    run(&mut a, 200, &store, "x");
    run(&mut b, 200, &store, "y");
    assert_ne!(
        a.state_checksum().expect("hash").hash,
        b.state_checksum().expect("hash").hash,
        "seeds must matter"
    );
}

#[test]
fn replay_from_snapshot_matches_continuous_run() {
    const SPLIT: Tick = 300;
    const END: Tick = 700;
    let store = store_with_run("cont", SEED);
    store.insert_run("replay", SEED, "0.1.0-test").expect("insert run");

    let mut continuous = SimEngine::build(config(SEED));
    run(&mut continuous, SPLIT, &store, "cont");
    let snapshot = StateSnapshot::of_world(&continuous.world, continuous.clock.current_tick)
        .expect("snapshot");
    run(&mut continuous, END, &store, "cont");

    // Start from an unrelated world, then restore.
    let mut replay = SimEngine::build(config(SEED ^ 0xFFFF));
    replay.restore(&snapshot).expect("restore");
    assert_eq!(replay.clock.current_tick, SPLIT);
    run(&mut replay, END, &store, "replay");

    assert_eq!(
        continuous.state_checksum().expect("hash"),
        replay.state_checksum().expect("hash"),
        "replay from tick {SPLIT} diverged"
    );
    let continuous_tail = event_log(&store, "cont", END).len() - event_log(&store, "cont", SPLIT).len();
    let replayed = store.event_count("replay").expect("count") as usize;
    assert_eq!(continuous_tail, replayed, "replayed ticks logged a different number of events");
}

#[test]
fn restore_rejects_snapshot_with_wrong_seed() {
    let engine = SimEngine::build(config(SEED));
    let mut snapshot = StateSnapshot::of_world(&engine.world, 0).expect("snapshot");
    snapshot.seed ^= 1;
    let mut other = SimEngine::build(config(SEED));
    let err = other.restore(&snapshot).expect_err("seed mismatch");
    assert!(err.is_fatal());
}
