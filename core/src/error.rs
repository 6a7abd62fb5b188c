use crate::types::Tick;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// World state is corrupt. Fatal: the process must not continue
    /// simulating, because any recovery would diverge from other participants.
    #[error("Invariant violated at tick {tick}: {detail}")]
    InvariantViolation { tick: Tick, detail: String },

    #[error("Pipeline phase {phase} registered after {previous}")]
    PipelineOrder {
        phase: &'static str,
        previous: &'static str,
    },

    #[error("Snapshot handle {handle} not found")]
    UnknownSnapshot { handle: u64 },

    #[error("Snapshot handle {handle} linked before capture")]
    SnapshotNotCaptured { handle: u64 },

    #[error("Snapshot handle {handle} is already linked")]
    SnapshotAlreadyLinked { handle: u64 },

    #[error("Snapshot (tick {tick}, seed {seed:#x}) does not follow last linked tick {last_tick}")]
    SnapshotOrder { tick: Tick, seed: u64, last_tick: Tick },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn invariant(tick: Tick, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            tick,
            detail: detail.into(),
        }
    }

    /// True for errors that mean the world can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
