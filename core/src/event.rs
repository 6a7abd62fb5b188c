//! Simulation events.
//!
//! Events are the observable trail of a tick: subsystems and the engine
//! return them, the runner may persist them to the event log. They never
//! feed back into world state.

use crate::{
    climate_subsystem::Weather,
    types::{EntityId, PlayerId, RideId, RunId, Tick},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickCompleted {
        tick: Tick,
    },
    DayElapsed {
        tick: Tick,
        day: u32,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    SnapshotCaptured {
        tick: Tick,
        seed: u64,
    },
    DesyncDetected {
        tick: Tick,
        local_hash: String,
    },
    SnapshotsCompared {
        tick: Tick,
        differences: usize,
    },

    // ── Action queue events ────────────────────────
    ActionExecuted {
        tick: Tick,
        sequence: u64,
        player: PlayerId,
        action: String,
    },
    ActionRejected {
        tick: Tick,
        sequence: u64,
        player: PlayerId,
        reason: String,
    },
    ChatMessage {
        tick: Tick,
        player: PlayerId,
        message: String,
    },

    // ── World events ───────────────────────────────
    MonthElapsed {
        tick: Tick,
        months_elapsed: u32,
    },
    ScenarioCompleted {
        tick: Tick,
    },
    ScenarioFailed {
        tick: Tick,
    },
    WeatherChanged {
        tick: Tick,
        weather: Weather,
        temperature: i8,
    },
    GuestEntered {
        tick: Tick,
        guest: EntityId,
    },
    GuestLeft {
        tick: Tick,
        guest: EntityId,
    },
    RideBrokeDown {
        tick: Tick,
        ride: RideId,
    },
    RideRepaired {
        tick: Tick,
        ride: RideId,
    },
    ResearchCompleted {
        tick: Tick,
        item: String,
    },
}

impl SimEvent {
    /// Stable name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TickCompleted { .. }     => "tick_completed",
            Self::DayElapsed { .. }        => "day_elapsed",
            Self::RunInitialized { .. }    => "run_initialized",
            Self::SnapshotCaptured { .. }  => "snapshot_captured",
            Self::DesyncDetected { .. }    => "desync_detected",
            Self::SnapshotsCompared { .. } => "snapshots_compared",
            Self::ActionExecuted { .. }    => "action_executed",
            Self::ActionRejected { .. }    => "action_rejected",
            Self::ChatMessage { .. }       => "chat_message",
            Self::MonthElapsed { .. }      => "month_elapsed",
            Self::ScenarioCompleted { .. } => "scenario_completed",
            Self::ScenarioFailed { .. }    => "scenario_failed",
            Self::WeatherChanged { .. }    => "weather_changed",
            Self::GuestEntered { .. }      => "guest_entered",
            Self::GuestLeft { .. }         => "guest_left",
            Self::RideBrokeDown { .. }     => "ride_broke_down",
            Self::RideRepaired { .. }      => "ride_repaired",
            Self::ResearchCompleted { .. } => "research_completed",
        }
    }

    /// Tick the event belongs to. Run initialisation is tick 0.
    pub fn tick(&self) -> Tick {
        match self {
            Self::RunInitialized { .. } => 0,
            Self::TickCompleted { tick }
            | Self::DayElapsed { tick, .. }
            | Self::SnapshotCaptured { tick, .. }
            | Self::DesyncDetected { tick, .. }
            | Self::SnapshotsCompared { tick, .. }
            | Self::ActionExecuted { tick, .. }
            | Self::ActionRejected { tick, .. }
            | Self::ChatMessage { tick, .. }
            | Self::MonthElapsed { tick, .. }
            | Self::ScenarioCompleted { tick }
            | Self::ScenarioFailed { tick }
            | Self::WeatherChanged { tick, .. }
            | Self::GuestEntered { tick, .. }
            | Self::GuestLeft { tick, .. }
            | Self::RideBrokeDown { tick, .. }
            | Self::RideRepaired { tick, .. }
            | Self::ResearchCompleted { tick, .. } => *tick,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}

impl EventLogEntry {
    pub fn from_event(run_id: &str, event: &SimEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            run_id: run_id.to_string(),
            tick: event.tick(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}
