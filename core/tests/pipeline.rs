//! Phase ordering, timing capture and fatal subsystem errors.

mod common;

use common::ScriptedSession;
use parksim_core::{
    date_subsystem::DateSubsystem,
    driver::FrameDriver,
    error::{SimError, SimResult},
    event::SimEvent,
    pipeline::Pipeline,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::{LogicPhase, LogicTimings},
    types::Tick,
    world::World,
};
use std::time::Duration;

/// Corrupts nothing, but reports the world as untrustworthy at one tick.
struct FailsAt(Tick);

impl SimSubsystem for FailsAt {
    fn name(&self) -> &'static str { "fails_at" }
    fn phase(&self) -> LogicPhase { LogicPhase::Park }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Park }

    fn update(&mut self, tick: Tick, _world: &mut World, _rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        if tick == self.0 {
            return Err(SimError::invariant(tick, "park ledger out of balance"));
        }
        Ok(vec![])
    }
}

/// Claims an engine-owned phase.
struct Impostor;

impl SimSubsystem for Impostor {
    fn name(&self) -> &'static str { "impostor" }
    fn phase(&self) -> LogicPhase { LogicPhase::GameActions }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Misc }

    fn update(&mut self, _tick: Tick, _world: &mut World, _rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        Ok(vec![])
    }
}

#[test]
fn phase_timings_accumulate_in_execution_order() {
    let mut engine = common::test_engine();
    let mut driver = FrameDriver::for_engine(&engine).with_timings();
    driver.run_frame(&mut engine).expect("frame");

    let timings = driver.timings().expect("timings enabled");
    assert_eq!(timings.current_slot(), 1, "one tick rotates one slot");
    let samples: Vec<_> = LogicPhase::ALL.iter().map(|p| timings.sample(0, *p)).collect();
    for (pair, phases) in samples.windows(2).zip(LogicPhase::ALL.windows(2)) {
        assert!(
            pair[0] <= pair[1],
            "{} recorded after {}",
            phases[1].name(),
            phases[0].name()
        );
    }
}

#[test]
fn fatal_subsystem_error_propagates_and_stops_the_clock() {
    let mut pipeline = Pipeline::new();
    pipeline.register(Box::new(DateSubsystem)).expect("date");
    pipeline.register(Box::new(FailsAt(3))).expect("park phase");
    let mut engine = common::test_engine().with_pipeline(pipeline);

    engine.run_ticks(3).expect("ticks before the failure");
    let err = engine.update_logic(None).expect_err("tick 3 fails");
    assert!(err.is_fatal());
    assert!(matches!(err, SimError::InvariantViolation { tick: 3, .. }));
    assert_eq!(engine.clock.current_tick, 3, "a failed tick never advances the clock");
}

#[test]
fn engine_owned_phases_cannot_be_registered() {
    let mut pipeline = Pipeline::new();
    let err = pipeline.register(Box::new(Impostor)).expect_err("engine phase");
    assert!(matches!(err, SimError::PipelineOrder { phase: "game_actions", .. }));
    assert!(pipeline.phases().is_empty());
}

#[test]
fn standard_pipeline_names_every_world_phase() {
    let names = common::test_engine().pipeline().names();
    assert_eq!(names.first(), Some(&"date"));
    assert_eq!(names.len(), LogicPhase::ALL.iter().filter(|p| p.is_world_phase()).count());
}

#[test]
fn network_update_timing_covers_only_inbound_sync() {
    // Level with the server: the client returns right after inbound sync.
    let (mut session, _log) = ScriptedSession::client(0);
    session.update_delay = Duration::from_millis(2);
    let mut engine = common::test_engine().with_network(session);
    let mut timings = LogicTimings::with_capacity(4);

    let outcome = engine.update_logic(Some(&mut timings)).expect("tick");
    assert!(!outcome.completed());
    assert!(timings.sample(0, LogicPhase::NetworkUpdate) >= Duration::from_millis(2));
    assert_eq!(timings.sample(0, LogicPhase::Date), Duration::ZERO, "pipeline never ran");
    assert_eq!(timings.current_slot(), 0, "a waiting call completes no tick");
}
