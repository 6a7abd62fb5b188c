use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{Money, Tick},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Progress needed to complete one research item.
pub const RESEARCH_COMPLETE: u32 = 0x10000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchFunding {
    None,
    Minimum,
    Normal,
    Maximum,
}

impl ResearchFunding {
    /// Progress points gained per tick.
    pub fn rate(self) -> u32 {
        match self {
            Self::None    => 0,
            Self::Minimum => 8,
            Self::Normal  => 16,
            Self::Maximum => 32,
        }
    }

    pub fn monthly_cost(self) -> Money {
        match self {
            Self::None    => 0,
            Self::Minimum => 10_000,
            Self::Normal  => 40_000,
            Self::Maximum => 80_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchState {
    pub funding:  ResearchFunding,
    pub progress: u32,
    /// Items still to research, front first.
    pub queue:    Vec<String>,
    pub invented: Vec<String>,
}

impl ResearchState {
    pub fn new(funding: ResearchFunding, queue: Vec<String>) -> Self {
        Self { funding, progress: 0, queue, invented: Vec::new() }
    }
}

pub struct ResearchSubsystem;

impl SimSubsystem for ResearchSubsystem {
    fn name(&self) -> &'static str { "research" }
    fn phase(&self) -> LogicPhase { LogicPhase::Research }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Research }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let research = &mut world.research;
        if research.queue.is_empty() {
            return Ok(vec![]);
        }
        research.progress += research.funding.rate();
        if research.progress < RESEARCH_COMPLETE {
            return Ok(vec![]);
        }

        research.progress -= RESEARCH_COMPLETE;
        let item = research.queue.remove(0);
        research.invented.push(item.clone());
        world.news.push(tick, format!("New invention: {item}"));
        log::debug!("tick={tick} research: completed {item}");
        Ok(vec![SimEvent::ResearchCompleted { tick, item }])
    }
}
