//! Logical clock and pause/speed control.

use crate::types::Tick;
use serde::{Deserialize, Serialize};

/// Highest selectable speed level. Level s runs 2^(s-1) ticks per frame.
pub const MAX_GAME_SPEED: u8 = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LogicalClock {
    pub current_tick: Tick,
    /// Ticks since the world was last saved. Saturates instead of wrapping.
    pub save_age:     u32,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(tick: Tick) -> Self {
        Self { current_tick: tick, save_age: 0 }
    }

    /// Advance one tick. Returns the new tick number.
    /// Only the pipeline's clock phase calls this.
    pub fn advance(&mut self) -> Tick {
        self.current_tick = self.current_tick.wrapping_add(1);
        self.save_age = self.save_age.saturating_add(1);
        self.current_tick
    }

    pub fn mark_saved(&mut self) {
        self.save_age = 0;
    }
}

/// {is-paused, speed-multiplier, single-step-requested}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PauseState {
    pub paused: bool,
    speed:      u8,
    pub single_step_requested: bool,
}

impl Default for PauseState {
    fn default() -> Self {
        Self { paused: false, speed: 1, single_step_requested: false }
    }
}

impl PauseState {
    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Clamp into 1..=MAX_GAME_SPEED.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.clamp(1, MAX_GAME_SPEED);
    }

    /// Ticks a frame runs at the current speed when nothing else applies.
    pub fn ticks_per_frame(&self) -> u32 {
        1u32 << (self.speed - 1)
    }

    pub fn request_single_step(&mut self) {
        self.single_step_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_levels_double_tick_rate() {
        let mut state = PauseState::default();
        let expected = [1, 2, 4, 8, 16, 32, 64, 128];
        for (level, want) in (1..=MAX_GAME_SPEED).zip(expected) {
            state.set_speed(level);
            assert_eq!(state.ticks_per_frame(), want, "speed {level}");
        }
    }

    #[test]
    fn speed_is_clamped() {
        let mut state = PauseState::default();
        state.set_speed(0);
        assert_eq!(state.speed(), 1);
        state.set_speed(200);
        assert_eq!(state.speed(), MAX_GAME_SPEED);
    }

    #[test]
    fn save_age_saturates() {
        let mut clock = LogicalClock { current_tick: 5, save_age: u32::MAX };
        assert_eq!(clock.advance(), 6);
        assert_eq!(clock.save_age, u32::MAX);
    }
}
