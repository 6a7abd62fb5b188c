//! Guests and staff.
//!
//! Peeps see the map with provisional elements removed; the pipeline
//! guarantees the stash phase ran before this one.

use crate::{
    error::{SimError, SimResult},
    event::SimEvent,
    misc_subsystem::MiscKind,
    ride_subsystem::RideStatus,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{EntityId, Money, RideId, Tick, TileCoord},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Happiness below which a guest heads home.
pub const LEAVE_HAPPINESS: u8 = 40;
/// Guests leave after this many ticks regardless of mood.
pub const MAX_VISIT_TICKS: u32 = 40_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeepKind {
    Guest,
    Handyman,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PeepState {
    Walking,
    Queuing { ride: RideId },
    OnRide { ride: RideId, ticks_left: u16 },
    Leaving,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peep {
    pub id:            EntityId,
    pub kind:          PeepKind,
    pub position:      TileCoord,
    pub state:         PeepState,
    pub happiness:     u8,
    pub hunger:        u8,
    pub cash:          Money,
    pub rides_taken:   u16,
    pub ticks_in_park: u32,
}

impl Peep {
    pub fn guest(id: EntityId, position: TileCoord, cash: Money) -> Self {
        Self {
            id,
            kind: PeepKind::Guest,
            position,
            state: PeepState::Walking,
            happiness: 128,
            hunger: 0,
            cash,
            rides_taken: 0,
            ticks_in_park: 0,
        }
    }

    pub fn handyman(id: EntityId, position: TileCoord) -> Self {
        Self { kind: PeepKind::Handyman, cash: 0, ..Self::guest(id, position, 0) }
    }

    pub fn is_guest(&self) -> bool {
        self.kind == PeepKind::Guest
    }

    /// Peeps move every fourth tick, staggered by id.
    fn moves_this_tick(&self, tick: Tick) -> bool {
        (tick + self.id as u64) % 4 == 0
    }
}

fn manhattan(a: TileCoord, b: TileCoord) -> u32 {
    a.x.abs_diff(b.x) as u32 + a.y.abs_diff(b.y) as u32
}

pub struct PeepSubsystem;

impl PeepSubsystem {
    fn update_guest(
        tick: Tick,
        peep: &mut Peep,
        world: &mut PeepWorld<'_>,
        rng: &mut SubsystemRng,
    ) {
        peep.ticks_in_park += 1;
        if peep.ticks_in_park % 64 == 0 {
            peep.hunger = peep.hunger.saturating_add(1);
        }
        let exposed = !matches!(peep.state, PeepState::OnRide { .. });
        if exposed && world.raining && peep.ticks_in_park % 32 == 0 {
            peep.happiness = peep.happiness.saturating_sub(1);
        }

        match peep.state {
            PeepState::Walking => {
                if peep.happiness < LEAVE_HAPPINESS
                    || peep.cash <= 0
                    || peep.ticks_in_park > MAX_VISIT_TICKS
                {
                    peep.state = PeepState::Leaving;
                    return;
                }
                if let Some(ride) = world.ride_at_entrance(peep.position) {
                    let r = &mut world.rides[ride as usize];
                    if r.status == RideStatus::Open && peep.cash >= r.price && rng.chance_u16(0x8000) {
                        peep.cash -= r.price;
                        r.income += r.price;
                        r.queue_length += 1;
                        peep.state = PeepState::Queuing { ride };
                        return;
                    }
                }
                if peep.hunger > 100 && rng.chance_u16(0x0400) {
                    peep.hunger = 0;
                    world.litter.push(peep.position);
                }
                if peep.moves_this_tick(tick) {
                    let options = world.map.walkable_neighbours(peep.position);
                    if !options.is_empty() {
                        peep.position = options[rng.below(options.len() as u32) as usize];
                    }
                }
            }
            PeepState::Queuing { ride } => {
                let r = &mut world.rides[ride as usize];
                if r.status != RideStatus::Open {
                    r.queue_length = r.queue_length.saturating_sub(1);
                    peep.state = PeepState::Walking;
                } else if r.boarding_slots > 0 {
                    r.boarding_slots -= 1;
                    r.queue_length = r.queue_length.saturating_sub(1);
                    peep.state = PeepState::OnRide { ride, ticks_left: r.ride_duration };
                }
            }
            PeepState::OnRide { ride, ticks_left } => {
                if ticks_left > 1 {
                    peep.state = PeepState::OnRide { ride, ticks_left: ticks_left - 1 };
                    return;
                }
                let r = &mut world.rides[ride as usize];
                r.total_customers += 1;
                let thrill = (r.ratings.excitement / 100).min(40) as u8;
                peep.happiness = peep.happiness.saturating_add(thrill);
                peep.rides_taken += 1;
                peep.state = PeepState::Walking;
            }
            PeepState::Leaving => {
                if !peep.moves_this_tick(tick) {
                    return;
                }
                let entrance = world.map.entrance;
                let options = world.map.walkable_neighbours(peep.position);
                let closer = options
                    .iter()
                    .copied()
                    .filter(|c| manhattan(*c, entrance) < manhattan(peep.position, entrance))
                    .min_by_key(|c| manhattan(*c, entrance));
                if let Some(next) = closer {
                    peep.position = next;
                } else if !options.is_empty() {
                    peep.position = options[rng.below(options.len() as u32) as usize];
                }
            }
        }
    }

    fn update_handyman(
        tick: Tick,
        peep: &mut Peep,
        world: &mut PeepWorld<'_>,
        rng: &mut SubsystemRng,
    ) {
        world.swept.push(peep.position);
        if peep.moves_this_tick(tick) {
            let options = world.map.walkable_neighbours(peep.position);
            if !options.is_empty() {
                peep.position = options[rng.below(options.len() as u32) as usize];
            }
        }
    }
}

/// Borrowed view of everything peeps touch besides the peep list itself.
struct PeepWorld<'a> {
    map:     &'a crate::map_subsystem::TileMap,
    rides:   &'a mut [crate::ride_subsystem::Ride],
    raining: bool,
    litter:  Vec<TileCoord>,
    swept:   Vec<TileCoord>,
}

impl PeepWorld<'_> {
    fn ride_at_entrance(&self, at: TileCoord) -> Option<RideId> {
        self.rides.iter().find(|r| r.entrance == at).map(|r| r.id)
    }
}

impl SimSubsystem for PeepSubsystem {
    fn name(&self) -> &'static str { "peep" }
    fn phase(&self) -> LogicPhase { LogicPhase::Peeps }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Peep }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if world.map.provisional_count() > 0 {
            return Err(SimError::invariant(tick, "peeps updated with provisional elements visible"));
        }

        let mut view = PeepWorld {
            map:     &world.map,
            rides:   &mut world.rides,
            raining: world.climate.weather.is_raining(),
            litter:  Vec::new(),
            swept:   Vec::new(),
        };
        for peep in world.peeps.iter_mut() {
            match peep.kind {
                PeepKind::Guest    => Self::update_guest(tick, peep, &mut view, rng),
                PeepKind::Handyman => Self::update_handyman(tick, peep, &mut view, rng),
            }
        }
        let PeepWorld { litter, swept, .. } = view;

        // Handymen clear one piece of litter from the tile they stand on.
        for spot in swept {
            if let Some(pos) = world
                .misc
                .iter()
                .position(|m| m.kind == MiscKind::Litter && m.position == spot)
            {
                world.misc.remove(pos);
            }
        }
        for spot in litter {
            world.spawn_misc(MiscKind::Litter, spot);
        }

        let entrance = world.map.entrance;
        let mut events = Vec::new();
        world.peeps.retain(|p| {
            let gone = p.state == PeepState::Leaving && p.position == entrance;
            if gone {
                events.push(SimEvent::GuestLeft { tick, guest: p.id });
            }
            !gone
        });
        Ok(events)
    }
}
