//! Subsystem trait.
//!
//! RULE: Every world subsystem implements SimSubsystem.
//! The pipeline calls update() on each registered subsystem
//! in phase order, exactly once per tick.
//! Canonical phase order lives in timing.rs (LogicPhase::ALL).

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    timing::LogicPhase,
    types::Tick,
    world::World,
};

/// The contract every subsystem must fulfill.
///
/// `update` must be a pure function of the world it is handed, the tick
/// number and the RNG stream it is given. No wall-clock reads, no I/O.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// The pipeline phase this subsystem occupies.
    fn phase(&self) -> LogicPhase;

    /// Stable RNG slot. Never reassign once released.
    fn slot(&self) -> SubsystemSlot;

    /// Called once per tick by the pipeline.
    ///
    /// - `tick`:  the tick being computed (the clock value before advance)
    /// - `world`: the shared world aggregate, already updated by earlier phases
    /// - `rng`:   this subsystem's deterministic RNG for this tick
    ///
    /// An `Err` is fatal for the whole process; return one only when the
    /// world can no longer be trusted.
    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
