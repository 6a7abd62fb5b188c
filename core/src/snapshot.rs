//! State snapshots: full world state linked to (tick, seed).
//!
//! Lifecycle: create a handle, capture the world into it, link it to the
//! tick and RNG seed it was taken at. Linked snapshots are immutable and
//! kept in a bounded history, oldest evicted first. Within one store,
//! linked (tick, seed) pairs are unique and never go back in tick.

use crate::{
    error::{SimError, SimResult},
    types::Tick,
    world::{hash_bytes, StateChecksum, World},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Differences listed per comparison; the total is still counted.
pub const MAX_REPORTED_DIFFERENCES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotHandle(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateSnapshot {
    pub tick:  Tick,
    pub seed:  u64,
    pub hash:  String,
    /// Canonical world encoding (see World::encode).
    pub state: Vec<u8>,
}

impl StateSnapshot {
    /// Encode a world directly, outside any store's linkage rules (autosave).
    pub fn of_world(world: &World, tick: Tick) -> SimResult<Self> {
        let state = world.encode()?;
        Ok(Self { tick, seed: world.rng.seed(), hash: hash_bytes(&state), state })
    }

    pub fn world(&self) -> SimResult<World> {
        World::decode(&self.state)
    }

    pub fn checksum(&self) -> StateChecksum {
        StateChecksum { tick: self.tick, seed: self.seed, hash: self.hash.clone() }
    }
}

/// The snapshot store collaborator.
pub trait SnapshotStore {
    fn create_snapshot(&mut self) -> SnapshotHandle;
    fn capture(&mut self, handle: SnapshotHandle, world: &World) -> SimResult<()>;
    fn link_snapshot(&mut self, handle: SnapshotHandle, tick: Tick, seed: u64) -> SimResult<()>;
    /// Most recent linked snapshot for `tick`, if still retained.
    fn find(&self, tick: Tick) -> SimResult<Option<StateSnapshot>>;
    fn len(&self) -> SimResult<usize>;
    /// Drop all history and linkage state. Used when the world is re-initialised.
    fn clear(&mut self) -> SimResult<()>;
}

#[derive(Debug, Clone)]
enum Pending {
    Created,
    Captured { state: Vec<u8>, hash: String },
}

/// Handle bookkeeping shared by every store implementation.
#[derive(Debug, Default)]
pub struct SnapshotLinker {
    next_handle: u64,
    pending:     BTreeMap<u64, Pending>,
    last_linked: Option<(Tick, u64)>,
}

impl SnapshotLinker {
    pub fn create(&mut self) -> SnapshotHandle {
        let handle = SnapshotHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.insert(handle.0, Pending::Created);
        handle
    }

    fn pending_mut(&mut self, handle: SnapshotHandle) -> SimResult<&mut Pending> {
        if handle.0 >= self.next_handle {
            return Err(SimError::UnknownSnapshot { handle: handle.0 });
        }
        self.pending
            .get_mut(&handle.0)
            .ok_or(SimError::SnapshotAlreadyLinked { handle: handle.0 })
    }

    pub fn capture(&mut self, handle: SnapshotHandle, world: &World) -> SimResult<()> {
        let state = world.encode()?;
        let hash = hash_bytes(&state);
        *self.pending_mut(handle)? = Pending::Captured { state, hash };
        Ok(())
    }

    /// Validate linkage and hand back the finished snapshot.
    pub fn link(&mut self, handle: SnapshotHandle, tick: Tick, seed: u64) -> SimResult<StateSnapshot> {
        if let Pending::Created = self.pending_mut(handle)? {
            return Err(SimError::SnapshotNotCaptured { handle: handle.0 });
        }
        if let Some((last_tick, last_seed)) = self.last_linked {
            if tick < last_tick || (tick, seed) == (last_tick, last_seed) {
                return Err(SimError::SnapshotOrder { tick, seed, last_tick });
            }
        }
        let Some(Pending::Captured { state, hash }) = self.pending.remove(&handle.0) else {
            return Err(SimError::SnapshotNotCaptured { handle: handle.0 });
        };
        self.last_linked = Some((tick, seed));
        Ok(StateSnapshot { tick, seed, hash, state })
    }
}

/// In-process store with bounded history.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    capacity: usize,
    history:  VecDeque<StateSnapshot>,
    linker:   SnapshotLinker,
}

impl MemorySnapshotStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            history:  VecDeque::new(),
            linker:   SnapshotLinker::default(),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &StateSnapshot> {
        self.history.iter()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn create_snapshot(&mut self) -> SnapshotHandle {
        self.linker.create()
    }

    fn capture(&mut self, handle: SnapshotHandle, world: &World) -> SimResult<()> {
        self.linker.capture(handle, world)
    }

    fn link_snapshot(&mut self, handle: SnapshotHandle, tick: Tick, seed: u64) -> SimResult<()> {
        let snapshot = self.linker.link(handle, tick, seed)?;
        self.history.push_back(snapshot);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        Ok(())
    }

    fn find(&self, tick: Tick) -> SimResult<Option<StateSnapshot>> {
        Ok(self.history.iter().rev().find(|s| s.tick == tick).cloned())
    }

    fn len(&self) -> SimResult<usize> {
        Ok(self.history.len())
    }

    fn clear(&mut self) -> SimResult<()> {
        self.history.clear();
        self.linker = SnapshotLinker::default();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDifference {
    pub path:   String,
    pub local:  String,
    pub remote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub tick:        Tick,
    pub local_hash:  String,
    pub remote_hash: String,
    /// First MAX_REPORTED_DIFFERENCES differing leaves.
    pub differences: Vec<FieldDifference>,
    pub total:       usize,
}

impl SnapshotDiff {
    pub fn is_identical(&self) -> bool {
        self.total == 0
    }
}

/// Walk both decoded world trees and list differing leaves.
pub fn compare_snapshots(local: &StateSnapshot, remote: &StateSnapshot) -> SimResult<SnapshotDiff> {
    let a: Value = serde_json::from_slice(&local.state)?;
    let b: Value = serde_json::from_slice(&remote.state)?;
    let mut diff = SnapshotDiff {
        tick:        local.tick,
        local_hash:  local.hash.clone(),
        remote_hash: remote.hash.clone(),
        differences: Vec::new(),
        total:       0,
    };
    diff_values("", Some(&a), Some(&b), &mut diff);
    Ok(diff)
}

fn diff_values(path: &str, a: Option<&Value>, b: Option<&Value>, diff: &mut SnapshotDiff) {
    match (a, b) {
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            for (key, value) in x {
                diff_values(&format!("{path}.{key}"), Some(value), y.get(key), diff);
            }
            for (key, value) in y.iter().filter(|(k, _)| !x.contains_key(*k)) {
                diff_values(&format!("{path}.{key}"), None, Some(value), diff);
            }
        }
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for i in 0..x.len().max(y.len()) {
                diff_values(&format!("{path}[{i}]"), x.get(i), y.get(i), diff);
            }
        }
        (x, y) if x == y => {}
        (x, y) => {
            diff.total += 1;
            if diff.differences.len() < MAX_REPORTED_DIFFERENCES {
                let show = |v: Option<&Value>| v.map_or_else(|| "<absent>".to_string(), Value::to_string);
                diff.differences.push(FieldDifference {
                    path:   if path.is_empty() { "$".to_string() } else { path.to_string() },
                    local:  show(x),
                    remote: show(y),
                });
            }
        }
    }
}

/// Diagnostic record for a client that diverged from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesyncReport {
    pub tick:        Tick,
    pub local:       StateChecksum,
    pub remote:      StateChecksum,
    pub differences: Vec<FieldDifference>,
    pub total:       usize,
    pub detected_at: DateTime<Utc>,
}

impl DesyncReport {
    pub fn from_diff(local: &StateSnapshot, remote: &StateSnapshot, diff: SnapshotDiff) -> Self {
        Self {
            tick:        diff.tick,
            local:       local.checksum(),
            remote:      remote.checksum(),
            differences: diff.differences,
            total:       diff.total,
            detected_at: Utc::now(),
        }
    }
}
