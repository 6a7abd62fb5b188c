//! Ambient sound triggers.
//!
//! Output goes to the presentation area of the world, which is excluded
//! from snapshots and state hashes. Participants may disagree on sound
//! cues without desynchronising.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{RideId, Tick},
    world::World,
};

/// Vehicles faster than this rumble.
const RUMBLE_VELOCITY: i32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    VehicleRumble { ride: RideId },
    Crowd { volume: u8 },
    Rain,
    Thunder,
}

pub struct SoundSubsystem;

impl SimSubsystem for SoundSubsystem {
    fn name(&self) -> &'static str { "sound" }
    fn phase(&self) -> LogicPhase { LogicPhase::Sounds }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Sound }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut cues = Vec::new();
        for vehicle in world.vehicles.iter().filter(|v| v.velocity > RUMBLE_VELOCITY) {
            cues.push(SoundCue::VehicleRumble { ride: vehicle.ride });
        }

        let guests = world.guest_count();
        if guests > 0 {
            cues.push(SoundCue::Crowd { volume: guests.min(255) as u8 });
        }

        if world.climate.weather.is_raining() {
            cues.push(SoundCue::Rain);
            if world.climate.weather == crate::climate_subsystem::Weather::Thunder
                && rng.chance_u16(0x0200)
            {
                cues.push(SoundCue::Thunder);
            }
        }

        world.presentation.sound_cues = cues;
        Ok(vec![])
    }
}
