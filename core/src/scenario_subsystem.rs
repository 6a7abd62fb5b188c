use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::Tick,
    world::World,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioObjective {
    pub guests:          u32,
    pub min_park_rating: u16,
    /// Objective is judged at the end of this (1-based) year.
    pub deadline_year:   u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioState {
    pub objective:   ScenarioObjective,
    pub status:      ScenarioStatus,
    pub resolved_at: Option<Tick>,
}

impl ScenarioState {
    pub fn new(objective: ScenarioObjective) -> Self {
        Self { objective, status: ScenarioStatus::InProgress, resolved_at: None }
    }
}

pub struct ScenarioSubsystem;

impl SimSubsystem for ScenarioSubsystem {
    fn name(&self) -> &'static str { "scenario" }
    fn phase(&self) -> LogicPhase { LogicPhase::Scenario }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Scenario }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        // Judged on month boundaries only.
        if world.scenario.status != ScenarioStatus::InProgress || !world.date.is_month_start() {
            return Ok(vec![]);
        }

        let objective = world.scenario.objective;
        let guests = world.guest_count();
        if guests >= objective.guests && world.park.rating >= objective.min_park_rating {
            world.scenario.status = ScenarioStatus::Completed;
            world.scenario.resolved_at = Some(tick);
            world.news.push(tick, "Scenario objective achieved!");
            log::info!("tick={tick} scenario completed with {guests} guests");
            return Ok(vec![SimEvent::ScenarioCompleted { tick }]);
        }

        // The year just finished is the one before the current date's year.
        if world.date.year() > objective.deadline_year {
            world.scenario.status = ScenarioStatus::Failed;
            world.scenario.resolved_at = Some(tick);
            world.news.push(tick, "Scenario objective failed");
            log::info!("tick={tick} scenario failed with {guests} guests");
            return Ok(vec![SimEvent::ScenarioFailed { tick }]);
        }

        Ok(vec![])
    }
}
