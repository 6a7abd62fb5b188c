use crate::{
    error::SimResult,
    event::SimEvent,
    ride_subsystem::RideStatus,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{EntityId, RideId, Tick},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Velocity lost per tick while a ride is stopped.
const BRAKE_DECELERATION: i32 = 128;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    pub id:       EntityId,
    pub ride:     RideId,
    /// Distance along the circuit, in track units.
    pub position: u32,
    pub velocity: i32,
    pub laps:     u32,
    pub capacity: u16,
}

pub struct VehicleSubsystem;

impl SimSubsystem for VehicleSubsystem {
    fn name(&self) -> &'static str { "vehicle" }
    fn phase(&self) -> LogicPhase { LogicPhase::Vehicles }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Vehicle }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        for vehicle in world.vehicles.iter_mut() {
            let Some(ride) = world.rides.get_mut(vehicle.ride as usize) else {
                continue;
            };
            let kind = ride.kind;
            if ride.status == RideStatus::Open {
                vehicle.velocity = (vehicle.velocity + kind.acceleration()).min(kind.max_velocity());
            } else {
                vehicle.velocity = (vehicle.velocity - BRAKE_DECELERATION).max(0);
            }

            vehicle.position += vehicle.velocity as u32;
            if ride.track_length > 0 && vehicle.position >= ride.track_length {
                vehicle.laps += vehicle.position / ride.track_length;
                vehicle.position %= ride.track_length;
                // Back at the station: seats open for the queue.
                if ride.status == RideStatus::Open {
                    ride.boarding_slots = ride.boarding_slots.max(vehicle.capacity);
                }
            }

            ride.measurement.max_velocity = ride.measurement.max_velocity.max(vehicle.velocity);
            ride.measurement.laps = ride.measurement.laps.max(vehicle.laps);
        }
        Ok(vec![])
    }
}
