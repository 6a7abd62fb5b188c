//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single world seed held by the RngBank.
//!
//! The bank seed is part of world state: it is serialized into every
//! snapshot and advanced exactly once per tick by the engine. Each
//! subsystem gets its own stream, seeded from (seed XOR slot mix), so:
//!   - Adding a new subsystem never changes existing subsystems' streams.
//!   - Presentation-only subsystems may draw freely without perturbing
//!     the simulation streams.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// A named, deterministic RNG for a single subsystem and tick.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a subsystem RNG from the bank seed and a stable
    /// subsystem index. The index must never change once assigned.
    pub fn new(seed: u64, subsystem_index: u64) -> Self {
        let derived_seed = seed ^ (subsystem_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u32 (full range).
    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u32 in [0, n). Returns 0 when n is 0.
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.inner.next_u32() % n
    }

    /// Integer Bernoulli trial: true with probability `numerator / 65536`.
    pub fn chance_u16(&mut self, numerator: u32) -> bool {
        (self.inner.next_u32() & 0xFFFF) < numerator
    }
}

/// The world's random state, indexed by stable slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Current seed value. This is what snapshots are linked against.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.seed, slot as u64).with_name(slot.name())
    }

    /// Step the seed forward. Called once per tick, by the clock phase only.
    pub fn advance(&mut self) {
        let mut rng = Pcg64Mcg::seed_from_u64(self.seed);
        self.seed = rng.next_u64();
    }
}

/// Stable subsystem slot assignments.
/// NEVER reorder or remove entries; only append.
/// Reordering changes every subsystem's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Generation = 0,
    Date = 1,
    Scenario = 2,
    Climate = 3,
    Map = 4,
    Peep = 5,
    Vehicle = 6,
    Misc = 7,
    Ride = 8,
    Park = 9,
    Research = 10,
    RideRatings = 11,
    News = 12,
    Animation = 13,
    Sound = 14,
    // Add new subsystems here, append only.
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Date => "date",
            Self::Scenario => "scenario",
            Self::Climate => "climate",
            Self::Map => "map",
            Self::Peep => "peep",
            Self::Vehicle => "vehicle",
            Self::Misc => "misc",
            Self::Ride => "ride",
            Self::Park => "park",
            Self::Research => "research",
            Self::RideRatings => "ride_ratings",
            Self::News => "news",
            Self::Animation => "animation",
            Self::Sound => "sound",
        }
    }
}
