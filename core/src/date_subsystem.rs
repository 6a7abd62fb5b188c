//! Logical date: months elapsed plus a 16-bit month-tick counter.
//!
//! The park season has eight months (March to October). Each tick adds
//! MONTH_TICK_INCREMENT to the month counter; a month ends when the
//! counter reaches TICKS_PER_MONTH.

use crate::{
    error::{SimError, SimResult},
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::Tick,
    world::World,
};
use serde::{Deserialize, Serialize};

pub const MONTH_COUNT: u32 = 8;
pub const TICKS_PER_MONTH: u32 = 0x10000;
pub const MONTH_TICK_INCREMENT: u32 = 4;

const DAYS_IN_MONTH: [u32; MONTH_COUNT as usize] = [31, 30, 31, 30, 31, 31, 30, 31];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalDate {
    pub months_elapsed: u32,
    pub month_ticks:    u32,
}

impl LogicalDate {
    pub fn new(months_elapsed: u32, month_ticks: u32) -> Self {
        Self { months_elapsed, month_ticks }
    }

    /// 0 = March … 7 = October.
    pub fn month(&self) -> u32 {
        self.months_elapsed % MONTH_COUNT
    }

    /// 1-based year.
    pub fn year(&self) -> u32 {
        self.months_elapsed / MONTH_COUNT + 1
    }

    pub fn days_in_month(&self) -> u32 {
        DAYS_IN_MONTH[self.month() as usize]
    }

    /// 0-based day of the month.
    pub fn day(&self) -> u32 {
        (self.month_ticks * self.days_in_month()) >> 16
    }

    pub fn is_month_start(&self) -> bool {
        self.month_ticks == 0
    }

    /// Step the date by one tick. Returns true when a new month began.
    pub fn advance(&mut self) -> bool {
        let next = self.month_ticks + MONTH_TICK_INCREMENT;
        if next >= TICKS_PER_MONTH {
            self.month_ticks = 0;
            self.months_elapsed += 1;
            true
        } else {
            self.month_ticks = next;
            false
        }
    }

    pub fn validate(&self, tick: Tick) -> SimResult<()> {
        if self.month_ticks >= TICKS_PER_MONTH || self.month_ticks % MONTH_TICK_INCREMENT != 0 {
            return Err(SimError::invariant(
                tick,
                format!("impossible month tick counter {:#x}", self.month_ticks),
            ));
        }
        Ok(())
    }
}

pub struct DateSubsystem;

impl SimSubsystem for DateSubsystem {
    fn name(&self) -> &'static str { "date" }
    fn phase(&self) -> LogicPhase { LogicPhase::Date }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Date }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        world.date.validate(tick)?;
        if !world.date.advance() {
            return Ok(vec![]);
        }
        log::debug!(
            "tick={tick} date: month {} of year {}",
            world.date.month(),
            world.date.year()
        );
        Ok(vec![SimEvent::MonthElapsed {
            tick,
            months_elapsed: world.date.months_elapsed,
        }])
    }
}
