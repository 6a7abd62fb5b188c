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

/// Ticks between climate steps.
pub const CLIMATE_UPDATE_INTERVAL: u16 = 1920;

const BASE_TEMPERATURE: [i8; 8] = [8, 11, 15, 18, 21, 21, 17, 12];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Sunny,
    PartiallyCloudy,
    Cloudy,
    Rain,
    HeavyRain,
    Thunder,
}

impl Weather {
    pub fn is_raining(self) -> bool {
        matches!(self, Self::Rain | Self::HeavyRain | Self::Thunder)
    }

    fn temperature_offset(self) -> i8 {
        match self {
            Self::Sunny           => 2,
            Self::PartiallyCloudy => 1,
            Self::Cloudy          => 0,
            Self::Rain            => -1,
            Self::HeavyRain       => -2,
            Self::Thunder         => -2,
        }
    }

    /// Pick from a fixed percentage table, drier in mid-season.
    fn roll(month: u32, rng: &mut SubsystemRng) -> Self {
        let wet_bias = if (2..=5).contains(&month) { 0 } else { 10 };
        match rng.below(100) + wet_bias {
            0..=39   => Self::Sunny,
            40..=59  => Self::PartiallyCloudy,
            60..=74  => Self::Cloudy,
            75..=87  => Self::Rain,
            88..=96  => Self::HeavyRain,
            _        => Self::Thunder,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClimateState {
    pub temperature:        i8,
    pub target_temperature: i8,
    pub weather:            Weather,
    pub next_weather:       Weather,
    pub update_timer:       u16,
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            temperature:        BASE_TEMPERATURE[0],
            target_temperature: BASE_TEMPERATURE[0],
            weather:            Weather::Sunny,
            next_weather:       Weather::Sunny,
            update_timer:       CLIMATE_UPDATE_INTERVAL,
        }
    }
}

pub struct ClimateSubsystem;

impl SimSubsystem for ClimateSubsystem {
    fn name(&self) -> &'static str { "climate" }
    fn phase(&self) -> LogicPhase { LogicPhase::Climate }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Climate }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let climate = &mut world.climate;
        if climate.update_timer > 0 {
            climate.update_timer -= 1;
            return Ok(vec![]);
        }
        climate.update_timer = CLIMATE_UPDATE_INTERVAL;

        // Temperature drifts one degree per step until it reaches target.
        if climate.temperature != climate.target_temperature {
            climate.temperature += (climate.target_temperature - climate.temperature).signum();
            return Ok(vec![]);
        }

        let previous = climate.weather;
        climate.weather = climate.next_weather;

        let month = world.date.month();
        climate.next_weather = Weather::roll(month, rng);
        let jitter = rng.below(5) as i8 - 2;
        climate.target_temperature =
            BASE_TEMPERATURE[month as usize] + climate.next_weather.temperature_offset() + jitter;

        if climate.weather == previous {
            return Ok(vec![]);
        }
        log::debug!(
            "tick={tick} climate: {:?} -> {:?} at {}C",
            previous,
            climate.weather,
            climate.temperature
        );
        Ok(vec![SimEvent::WeatherChanged {
            tick,
            weather: climate.weather,
            temperature: climate.temperature,
        }])
    }
}
