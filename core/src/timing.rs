//! Per-phase tick timing, kept purely for diagnostics.
//!
//! Nothing in the simulation reads these values back.

use std::time::Duration;

/// Number of ticks kept in the ring before slots are overwritten.
pub const LOGIC_UPDATE_MEASUREMENTS: usize = 1024;

/// The timed phases of one logical tick, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicPhase {
    NetworkUpdate,
    Date,
    Scenario,
    Climate,
    MapTiles,
    MapStashProvisional,
    MapPathWideFlags,
    Peeps,
    MapRestoreProvisional,
    Vehicles,
    Misc,
    Rides,
    Park,
    Research,
    RideRatings,
    News,
    MapAnimation,
    Sounds,
    GameActions,
    NetworkFlush,
    Clock,
    Scripts,
}

impl LogicPhase {
    pub const COUNT: usize = 22;

    pub const ALL: [LogicPhase; Self::COUNT] = [
        Self::NetworkUpdate,
        Self::Date,
        Self::Scenario,
        Self::Climate,
        Self::MapTiles,
        Self::MapStashProvisional,
        Self::MapPathWideFlags,
        Self::Peeps,
        Self::MapRestoreProvisional,
        Self::Vehicles,
        Self::Misc,
        Self::Rides,
        Self::Park,
        Self::Research,
        Self::RideRatings,
        Self::News,
        Self::MapAnimation,
        Self::Sounds,
        Self::GameActions,
        Self::NetworkFlush,
        Self::Clock,
        Self::Scripts,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NetworkUpdate => "network_update",
            Self::Date => "date",
            Self::Scenario => "scenario",
            Self::Climate => "climate",
            Self::MapTiles => "map_tiles",
            Self::MapStashProvisional => "map_stash_provisional",
            Self::MapPathWideFlags => "map_path_wide_flags",
            Self::Peeps => "peeps",
            Self::MapRestoreProvisional => "map_restore_provisional",
            Self::Vehicles => "vehicles",
            Self::Misc => "misc",
            Self::Rides => "rides",
            Self::Park => "park",
            Self::Research => "research",
            Self::RideRatings => "ride_ratings",
            Self::News => "news",
            Self::MapAnimation => "map_animation",
            Self::Sounds => "sounds",
            Self::GameActions => "game_actions",
            Self::NetworkFlush => "network_flush",
            Self::Clock => "clock",
            Self::Scripts => "scripts",
        }
    }

    /// Phases driven by registered world subsystems rather than the engine.
    pub fn is_world_phase(self) -> bool {
        !matches!(
            self,
            Self::NetworkUpdate | Self::GameActions | Self::NetworkFlush | Self::Clock | Self::Scripts
        )
    }
}

/// Ring buffer of per-phase elapsed times.
#[derive(Debug, Clone)]
pub struct LogicTimings {
    samples:     Vec<[Duration; LogicPhase::COUNT]>,
    current_idx: usize,
}

impl Default for LogicTimings {
    fn default() -> Self {
        Self::with_capacity(LOGIC_UPDATE_MEASUREMENTS)
    }
}

impl LogicTimings {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples:     vec![[Duration::ZERO; LogicPhase::COUNT]; capacity.max(1)],
            current_idx: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn current_slot(&self) -> usize {
        self.current_idx
    }

    pub fn record_phase(&mut self, phase: LogicPhase, elapsed: Duration) {
        self.samples[self.current_idx][phase.index()] = elapsed;
    }

    /// Move to the next slot once a full tick has been recorded.
    pub fn rotate_slot(&mut self) {
        self.current_idx = (self.current_idx + 1) % self.samples.len();
    }

    pub fn sample(&self, slot: usize, phase: LogicPhase) -> Duration {
        self.samples[slot % self.samples.len()][phase.index()]
    }

    /// Mean elapsed time for a phase across every slot.
    pub fn average(&self, phase: LogicPhase) -> Duration {
        let total: Duration = self.samples.iter().map(|s| s[phase.index()]).sum();
        total / self.samples.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_table_matches_discriminants() {
        for (i, phase) in LogicPhase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i, "{} out of place", phase.name());
        }
    }

    #[test]
    fn rotate_wraps_at_capacity() {
        let mut timings = LogicTimings::with_capacity(3);
        timings.record_phase(LogicPhase::Date, Duration::from_micros(5));
        for _ in 0..3 {
            timings.rotate_slot();
        }
        assert_eq!(timings.current_slot(), 0);
        assert_eq!(timings.sample(0, LogicPhase::Date), Duration::from_micros(5));
    }
}
