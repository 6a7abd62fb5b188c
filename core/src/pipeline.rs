//! The subsystem update pipeline.
//!
//! EXECUTION ORDER is data: LogicPhase::ALL. The pipeline holds the world
//! subsystems for the world phases and refuses any registration that
//! would run a phase before one already registered. The engine runs the
//! phases it owns (network, actions, clock, scripts) around these.

use crate::{
    climate_subsystem::ClimateSubsystem,
    date_subsystem::DateSubsystem,
    error::{SimError, SimResult},
    event::SimEvent,
    map_subsystem::{
        MapAnimationSubsystem, MapTilesSubsystem, PathWideFlagsSubsystem,
        RestoreProvisionalSubsystem, StashProvisionalSubsystem,
    },
    misc_subsystem::MiscSubsystem,
    news_subsystem::NewsSubsystem,
    park_subsystem::ParkSubsystem,
    peep_subsystem::PeepSubsystem,
    research_subsystem::ResearchSubsystem,
    ride_subsystem::{RideRatingsSubsystem, RideSubsystem},
    scenario_subsystem::ScenarioSubsystem,
    sound_subsystem::SoundSubsystem,
    subsystem::SimSubsystem,
    timing::{LogicPhase, LogicTimings},
    types::Tick,
    vehicle_subsystem::VehicleSubsystem,
    world::World,
};
use std::time::Instant;

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn SimSubsystem>>,
}

impl Pipeline {
    /// An empty pipeline. Useful for tests that drive engine phases only.
    pub fn new() -> Self {
        Self::default()
    }

    /// All default world subsystems, in canonical order.
    pub fn standard() -> Self {
        let steps: Vec<Box<dyn SimSubsystem>> = vec![
            Box::new(DateSubsystem),
            Box::new(ScenarioSubsystem),
            Box::new(ClimateSubsystem),
            Box::new(MapTilesSubsystem),
            Box::new(StashProvisionalSubsystem),
            Box::new(PathWideFlagsSubsystem),
            Box::new(PeepSubsystem),
            Box::new(RestoreProvisionalSubsystem),
            Box::new(VehicleSubsystem),
            Box::new(MiscSubsystem),
            Box::new(RideSubsystem),
            Box::new(ParkSubsystem),
            Box::new(ResearchSubsystem),
            Box::new(RideRatingsSubsystem),
            Box::new(NewsSubsystem),
            Box::new(MapAnimationSubsystem),
            Box::new(SoundSubsystem),
        ];
        Self { steps }
    }

    /// Append a subsystem. Its phase must come strictly after the last one.
    pub fn register(&mut self, subsystem: Box<dyn SimSubsystem>) -> SimResult<()> {
        let phase = subsystem.phase();
        if !phase.is_world_phase() {
            return Err(SimError::PipelineOrder {
                phase: phase.name(),
                previous: "engine-owned phase",
            });
        }
        if let Some(last) = self.steps.last() {
            if last.phase() >= phase {
                return Err(SimError::PipelineOrder {
                    phase: phase.name(),
                    previous: last.phase().name(),
                });
            }
        }
        self.steps.push(subsystem);
        Ok(())
    }

    /// Registered phases, in execution order.
    pub fn phases(&self) -> Vec<LogicPhase> {
        self.steps.iter().map(|s| s.phase()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every world phase once. Elapsed time since `started` is
    /// recorded after each phase when a timing sink is supplied.
    pub fn run(
        &mut self,
        tick: Tick,
        world: &mut World,
        started: Instant,
        mut timings: Option<&mut LogicTimings>,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        for step in &mut self.steps {
            let mut rng = world.rng.for_subsystem(step.slot());
            let produced = step.update(tick, world, &mut rng)?;
            events.extend(produced);
            if let Some(t) = timings.as_deref_mut() {
                t.record_phase(step.phase(), started.elapsed());
            }
        }
        Ok(events)
    }
}
