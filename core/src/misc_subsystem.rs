use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{EntityId, Tick, TileCoord},
    world::World,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MiscKind {
    Litter,
    Balloon,
    Particle,
}

impl MiscKind {
    /// Ticks before the entity disappears on its own. Litter waits for a handyman.
    pub fn lifetime(self) -> Option<u16> {
        match self {
            Self::Litter   => None,
            Self::Balloon  => Some(600),
            Self::Particle => Some(40),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiscEntity {
    pub id:       EntityId,
    pub kind:     MiscKind,
    pub position: TileCoord,
    pub age:      u16,
}

pub struct MiscSubsystem;

impl SimSubsystem for MiscSubsystem {
    fn name(&self) -> &'static str { "misc" }
    fn phase(&self) -> LogicPhase { LogicPhase::Misc }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Misc }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        for entity in world.misc.iter_mut() {
            entity.age = entity.age.saturating_add(1);
        }
        world
            .misc
            .retain(|e| e.kind.lifetime().map_or(true, |limit| e.age < limit));
        Ok(vec![])
    }
}
