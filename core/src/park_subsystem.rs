use crate::{
    error::SimResult,
    event::SimEvent,
    misc_subsystem::MiscKind,
    peep_subsystem::Peep,
    ride_subsystem::RideStatus,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{Money, Tick},
    world::World,
};
use serde::{Deserialize, Serialize};

pub const PARK_RATING_INTERVAL: Tick = 128;
pub const MAX_PARK_RATING: u16 = 999;
pub const RIDE_RUNNING_COST: Money = 1_000;
pub const GUEST_STARTING_CASH: Money = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParkState {
    pub cash:             Money,
    pub entrance_fee:     Money,
    pub rating:           u16,
    pub total_admissions: u32,
    pub max_guests:       u32,
}

impl ParkState {
    pub fn new(cash: Money, entrance_fee: Money, max_guests: u32) -> Self {
        Self {
            cash,
            entrance_fee,
            rating: 600,
            total_admissions: 0,
            max_guests,
        }
    }
}

fn compute_rating(world: &World) -> u16 {
    let guests: Vec<&Peep> = world.peeps.iter().filter(|p| p.is_guest()).collect();
    let mut rating: i32 = 1150;

    if !guests.is_empty() {
        let happy = guests.iter().filter(|p| p.happiness > 128).count() as i32;
        rating += (happy * 300) / guests.len() as i32 - 150;
    } else {
        rating -= 200;
    }

    let broken = world
        .rides
        .iter()
        .filter(|r| r.status == RideStatus::BrokenDown)
        .count() as i32;
    rating -= broken * 50;

    let litter = world.misc.iter().filter(|m| m.kind == MiscKind::Litter).count() as i32;
    rating -= litter.min(100) * 4;

    rating.clamp(0, i32::from(MAX_PARK_RATING)) as u16
}

pub struct ParkSubsystem;

impl SimSubsystem for ParkSubsystem {
    fn name(&self) -> &'static str { "park" }
    fn phase(&self) -> LogicPhase { LogicPhase::Park }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Park }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        // The scenario editor freezes park-wide state.
        if world.editor_mode {
            return Ok(vec![]);
        }

        for ride in world.rides.iter_mut() {
            world.park.cash += ride.income;
            ride.income = 0;
        }

        if world.date.is_month_start() {
            let upkeep = RIDE_RUNNING_COST * world.rides.len() as Money
                + world.research.funding.monthly_cost();
            world.park.cash -= upkeep;
            log::debug!("tick={tick} park: monthly upkeep {upkeep}, cash {}", world.park.cash);
        }

        if tick % PARK_RATING_INTERVAL == 0 {
            world.park.rating = compute_rating(world);
        }

        // Guest generation: better parks attract more visitors.
        let mut events = Vec::new();
        let guests = world.guest_count();
        let odds = u32::from(world.park.rating) * 2;
        if guests < world.park.max_guests && rng.chance_u16(odds) {
            let cash = GUEST_STARTING_CASH + Money::from(rng.below(3_000));
            let fee = world.park.entrance_fee.min(cash);
            let id = world.next_entity_id();
            let entrance = world.map.entrance;
            world.peeps.push(Peep::guest(id, entrance, cash - fee));
            world.park.cash += fee;
            world.park.total_admissions += 1;
            events.push(SimEvent::GuestEntered { tick, guest: id });
        }
        Ok(events)
    }
}

