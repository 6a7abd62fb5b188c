//! Ride operation, breakdowns and ratings.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{Money, RideId, Tick, TileCoord},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Reliability is stored in hundredths of a percent.
pub const MAX_RELIABILITY: u16 = 10_000;
/// Ticks between reliability decay and breakdown checks.
pub const RELIABILITY_INTERVAL: Tick = 64;
pub const REPAIR_TICKS: u16 = 1_500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideKind {
    Carousel,
    WoodenCoaster,
    LogFlume,
    Chairlift,
}

impl RideKind {
    pub const ALL: [RideKind; 4] = [
        Self::Carousel,
        Self::WoodenCoaster,
        Self::LogFlume,
        Self::Chairlift,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Carousel      => "Merry-Go-Round",
            Self::WoodenCoaster => "Wooden Roller Coaster",
            Self::LogFlume      => "Log Flume",
            Self::Chairlift     => "Chairlift",
        }
    }

    pub fn acceleration(self) -> i32 {
        match self {
            Self::Carousel      => 16,
            Self::WoodenCoaster => 48,
            Self::LogFlume      => 32,
            Self::Chairlift     => 8,
        }
    }

    pub fn max_velocity(self) -> i32 {
        match self {
            Self::Carousel      => 256,
            Self::WoodenCoaster => 1536,
            Self::LogFlume      => 768,
            Self::Chairlift     => 192,
        }
    }

    pub fn track_length(self) -> u32 {
        match self {
            Self::Carousel      => 4_096,
            Self::WoodenCoaster => 32_768,
            Self::LogFlume      => 16_384,
            Self::Chairlift     => 8_192,
        }
    }

    pub fn vehicle_capacity(self) -> u16 {
        match self {
            Self::Carousel      => 16,
            Self::WoodenCoaster => 24,
            Self::LogFlume      => 8,
            Self::Chairlift     => 4,
        }
    }

    pub fn ride_duration(self) -> u16 {
        match self {
            Self::Carousel      => 200,
            Self::WoodenCoaster => 400,
            Self::LogFlume      => 300,
            Self::Chairlift     => 350,
        }
    }

    /// (excitement, intensity, nausea) before measurements.
    fn base_ratings(self) -> (u16, u16, u16) {
        match self {
            Self::Carousel      => (120, 40, 30),
            Self::WoodenCoaster => (550, 500, 350),
            Self::LogFlume      => (400, 250, 150),
            Self::Chairlift     => (160, 60, 40),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Open,
    Closed,
    BrokenDown,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RideRatings {
    pub excitement: u16,
    pub intensity:  u16,
    pub nausea:     u16,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RideMeasurement {
    pub max_velocity: i32,
    pub laps:         u32,
    pub samples:      u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ride {
    pub id:              RideId,
    pub name:            String,
    pub kind:            RideKind,
    pub status:          RideStatus,
    pub entrance:        TileCoord,
    pub price:           Money,
    pub queue_length:    u16,
    pub boarding_slots:  u16,
    pub total_customers: u32,
    /// Ticket revenue not yet collected by the park phase.
    pub income:          Money,
    pub reliability:     u16,
    pub breakdown_timer: u16,
    pub ride_duration:   u16,
    pub track_length:    u32,
    pub ratings:         RideRatings,
    pub measurement:     RideMeasurement,
}

impl Ride {
    pub fn new(id: RideId, kind: RideKind, entrance: TileCoord, price: Money) -> Self {
        Self {
            id,
            name: format!("{} {}", kind.label(), id + 1),
            kind,
            status: RideStatus::Open,
            entrance,
            price,
            queue_length: 0,
            boarding_slots: 0,
            total_customers: 0,
            income: 0,
            reliability: MAX_RELIABILITY - 500,
            breakdown_timer: 0,
            ride_duration: kind.ride_duration(),
            track_length: kind.track_length(),
            ratings: RideRatings::default(),
            measurement: RideMeasurement::default(),
        }
    }
}

pub struct RideSubsystem;

impl SimSubsystem for RideSubsystem {
    fn name(&self) -> &'static str { "ride" }
    fn phase(&self) -> LogicPhase { LogicPhase::Rides }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Ride }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let check = tick % RELIABILITY_INTERVAL == 0;

        for ride in world.rides.iter_mut() {
            match ride.status {
                RideStatus::BrokenDown => {
                    ride.breakdown_timer = ride.breakdown_timer.saturating_sub(1);
                    if ride.breakdown_timer == 0 {
                        ride.status = RideStatus::Open;
                        ride.reliability = (ride.reliability + 500).min(MAX_RELIABILITY);
                        world.news.push(tick, format!("{} has been fixed", ride.name));
                        events.push(SimEvent::RideRepaired { tick, ride: ride.id });
                    }
                }
                RideStatus::Open if check => {
                    ride.reliability = ride.reliability.saturating_sub(1);
                    let odds = u32::from(MAX_RELIABILITY - ride.reliability) / 4;
                    if rng.chance_u16(odds) {
                        ride.status = RideStatus::BrokenDown;
                        ride.breakdown_timer = REPAIR_TICKS;
                        ride.boarding_slots = 0;
                        world.news.push(tick, format!("{} has broken down", ride.name));
                        log::debug!("tick={tick} ride {} broke down", ride.id);
                        events.push(SimEvent::RideBrokeDown { tick, ride: ride.id });
                    }
                }
                RideStatus::Open | RideStatus::Closed => {}
            }
        }
        Ok(events)
    }
}

/// Recomputes one ride's ratings per tick, round robin.
pub struct RideRatingsSubsystem;

impl SimSubsystem for RideRatingsSubsystem {
    fn name(&self) -> &'static str { "ride_ratings" }
    fn phase(&self) -> LogicPhase { LogicPhase::RideRatings }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::RideRatings }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if world.rides.is_empty() {
            return Ok(vec![]);
        }
        for ride in world.rides.iter_mut().filter(|r| r.status == RideStatus::Open) {
            ride.measurement.samples = ride.measurement.samples.saturating_add(1);
        }

        let idx = world.ratings_cursor as usize % world.rides.len();
        world.ratings_cursor = ((idx + 1) % world.rides.len()) as RideId;

        let ride = &mut world.rides[idx];
        let (excitement, intensity, nausea) = ride.kind.base_ratings();
        let speed = ride.measurement.max_velocity.max(0) as u32;
        let laps = ride.measurement.laps.min(50);
        let intensity = u32::from(intensity) + speed / 6;
        ride.ratings = RideRatings {
            excitement: clamp_rating(u32::from(excitement) + speed / 8 + laps * 2),
            intensity:  clamp_rating(intensity),
            nausea:     clamp_rating(u32::from(nausea) + intensity / 4),
        };
        Ok(vec![])
    }
}

fn clamp_rating(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}
