//! The world aggregate: every piece of simulation state, in one place.
//!
//! RULE: Anything that influences a future tick lives in World and is
//! serialized. Presentation bookkeeping lives in `presentation` and is
//! skipped by serde, so it can never cause a desync.
//!
//! No hash maps anywhere in this tree: encoding order must be stable
//! for the state hash to be comparable across participants.

use crate::{
    climate_subsystem::ClimateState,
    config::WorldConfig,
    date_subsystem::LogicalDate,
    error::SimResult,
    map_subsystem::{PathElement, TileMap},
    misc_subsystem::{MiscEntity, MiscKind},
    news_subsystem::NewsQueue,
    park_subsystem::{ParkState, GUEST_STARTING_CASH},
    peep_subsystem::{Peep, PeepKind},
    research_subsystem::ResearchState,
    ride_subsystem::{Ride, RideKind},
    rng::{RngBank, SubsystemSlot},
    scenario_subsystem::ScenarioState,
    sound_subsystem::SoundCue,
    types::{EntityId, Money, RideId, Tick, TileCoord},
    vehicle_subsystem::Vehicle,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MIN_MAP_WIDTH: u16 = 24;
pub const MIN_MAP_HEIGHT: u16 = 16;
/// Columns where side paths branch off the main avenue.
const BRANCH_COLUMNS: [u16; 3] = [6, 14, 22];
const BRANCH_REACH: u16 = 6;

const RESEARCH_ITEMS: [&str; 6] = [
    "Ferris Wheel",
    "Go Karts",
    "Steel Roller Coaster",
    "Haunted House",
    "River Rapids",
    "Observation Tower",
];

/// Presentation-only state. Never serialized, never hashed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    pub animation_invalidations: u64,
    pub sound_cues: Vec<SoundCue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub date:           LogicalDate,
    pub rng:            RngBank,
    pub scenario:       ScenarioState,
    pub climate:        ClimateState,
    pub map:            TileMap,
    pub peeps:          Vec<Peep>,
    pub vehicles:       Vec<Vehicle>,
    pub misc:           Vec<MiscEntity>,
    pub rides:          Vec<Ride>,
    pub park:           ParkState,
    pub research:       ResearchState,
    pub news:           NewsQueue,
    pub ratings_cursor: RideId,
    pub editor_mode:    bool,
    next_entity_id:     EntityId,
    #[serde(skip)]
    pub presentation:   Presentation,
}

/// (tick, seed, hash) triple exchanged between participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateChecksum {
    pub tick: Tick,
    pub seed: u64,
    pub hash: String,
}

impl World {
    /// Build the starting park. Pure function of config and seed.
    pub fn generate(config: &WorldConfig, seed: u64) -> Self {
        let width = config.map_width.max(MIN_MAP_WIDTH);
        let height = config.map_height.max(MIN_MAP_HEIGHT);
        let mid = height / 2;
        let entrance = TileCoord::new(0, mid);
        let bank = RngBank::new(seed);
        let mut rng = bank.for_subsystem(SubsystemSlot::Generation);

        let mut map = TileMap::new(width, height, entrance);
        let lay_path = |map: &mut TileMap, x: u16, y: u16| {
            if let Some(tile) = map.tile_mut(TileCoord::new(x, y)) {
                tile.path = Some(PathElement::permanent());
            }
        };
        for x in 0..width {
            lay_path(&mut map, x, mid);
        }
        for col in BRANCH_COLUMNS {
            for y in (mid - BRANCH_REACH)..=(mid + BRANCH_REACH) {
                lay_path(&mut map, col, y);
            }
        }

        let mut world = Self {
            date: LogicalDate::default(),
            rng: bank,
            scenario: ScenarioState::new(config.objective),
            climate: ClimateState::default(),
            map,
            peeps: Vec::new(),
            vehicles: Vec::new(),
            misc: Vec::new(),
            rides: Vec::new(),
            park: ParkState::new(config.starting_cash, config.entrance_fee, config.max_guests),
            research: ResearchState::new(
                config.research_funding,
                RESEARCH_ITEMS.iter().map(|s| s.to_string()).collect(),
            ),
            news: NewsQueue::default(),
            ratings_cursor: 0,
            editor_mode: false,
            next_entity_id: 1,
            presentation: Presentation::default(),
        };

        // Ride entrances sit at the ends of the side paths; the ride
        // footprint is the tile just beyond.
        let slots = BRANCH_COLUMNS.iter().flat_map(|&col| {
            [
                (TileCoord::new(col, mid - BRANCH_REACH), TileCoord::new(col, mid - BRANCH_REACH - 1)),
                (TileCoord::new(col, mid + BRANCH_REACH), TileCoord::new(col, mid + BRANCH_REACH + 1)),
            ]
        });
        for (i, (ride_entrance, footprint)) in slots.take(config.rides as usize).enumerate() {
            let id = i as RideId;
            let kind = RideKind::ALL[i % RideKind::ALL.len()];
            world.rides.push(Ride::new(id, kind, ride_entrance, config.ride_price));
            if let Some(tile) = world.map.tile_mut(footprint) {
                tile.ride = Some(id);
            }
            let vehicle_id = world.next_entity_id();
            world.vehicles.push(Vehicle {
                id: vehicle_id,
                ride: id,
                position: 0,
                velocity: 0,
                laps: 0,
                capacity: kind.vehicle_capacity(),
            });
        }

        for i in 0..config.initial_guests {
            let id = world.next_entity_id();
            let at = TileCoord::new((i % u32::from(width)) as u16, mid);
            let cash = GUEST_STARTING_CASH + Money::from(rng.below(3_000));
            world.peeps.push(Peep::guest(id, at, cash));
        }
        for i in 0..config.handymen {
            let id = world.next_entity_id();
            let col = BRANCH_COLUMNS[i as usize % BRANCH_COLUMNS.len()];
            world.peeps.push(Peep::handyman(id, TileCoord::new(col, mid)));
        }

        world
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn spawn_misc(&mut self, kind: MiscKind, position: TileCoord) -> EntityId {
        let id = self.next_entity_id();
        self.misc.push(MiscEntity { id, kind, position, age: 0 });
        id
    }

    pub fn guest_count(&self) -> u32 {
        self.peeps.iter().filter(|p| p.kind == PeepKind::Guest).count() as u32
    }

    pub fn ride(&self, id: RideId) -> Option<&Ride> {
        self.rides.get(id as usize)
    }

    pub fn invalidate_map_animation(&mut self) {
        self.presentation.animation_invalidations =
            self.presentation.animation_invalidations.wrapping_add(1);
    }

    /// Canonical byte encoding used for snapshots and hashing.
    pub fn encode(&self) -> SimResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> SimResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// SHA-256 of the canonical encoding, lower-case hex.
    pub fn state_hash(&self) -> SimResult<String> {
        Ok(hash_bytes(&self.encode()?))
    }

    pub fn checksum(&self, tick: Tick) -> SimResult<StateChecksum> {
        Ok(StateChecksum {
            tick,
            seed: self.rng.seed(),
            hash: self.state_hash()?,
        })
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
