//! Shared primitive types used across the entire simulation.

/// A logical tick. One tick = one full pass of the update pipeline.
pub type Tick = u64;

/// Identifier of a participant issuing game actions.
/// Player 0 is always the local host (or the offline player).
pub type PlayerId = u32;

/// Stable identifier for any entity (peep, vehicle, misc entity).
pub type EntityId = u32;

/// Index into the ride list.
pub type RideId = u16;

/// Money in fixed-point hundredths. Never use floats for park finance.
pub type Money = i64;

/// The canonical run identifier.
pub type RunId = String;

/// Tile coordinate on the park map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileCoord {
    pub x: u16,
    pub y: u16,
}

impl TileCoord {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Fresh run identifier for the event log and snapshot tables.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}
