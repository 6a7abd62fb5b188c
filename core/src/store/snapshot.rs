//! Linked state snapshot rows and the SQLite-backed snapshot store.

use super::SimStore;
use crate::{
    error::SimResult,
    snapshot::{SnapshotHandle, SnapshotLinker, SnapshotStore, StateSnapshot},
    types::{RunId, Tick},
    world::World,
};
use rusqlite::{params, OptionalExtension};

impl SimStore {
    pub fn save_snapshot(&self, run_id: &str, snapshot: &StateSnapshot) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO state_snapshot (run_id, tick, seed, hash, state)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                snapshot.tick as i64,
                snapshot.seed as i64,
                snapshot.hash,
                snapshot.state,
            ],
        )?;
        Ok(())
    }

    /// Most recently stored snapshot for `tick`.
    pub fn snapshot_at(&self, run_id: &str, tick: Tick) -> SimResult<Option<StateSnapshot>> {
        Ok(self
            .conn
            .query_row(
                "SELECT tick, seed, hash, state FROM state_snapshot
                 WHERE run_id = ?1 AND tick = ?2
                 ORDER BY id DESC LIMIT 1",
                params![run_id, tick as i64],
                |row| {
                    Ok(StateSnapshot {
                        tick: row.get::<_, i64>(0)? as u64,
                        seed: row.get::<_, i64>(1)? as u64,
                        hash: row.get(2)?,
                        state: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn latest_snapshot(&self, run_id: &str) -> SimResult<Option<StateSnapshot>> {
        Ok(self
            .conn
            .query_row(
                "SELECT tick, seed, hash, state FROM state_snapshot
                 WHERE run_id = ?1 ORDER BY id DESC LIMIT 1",
                params![run_id],
                |row| {
                    Ok(StateSnapshot {
                        tick: row.get::<_, i64>(0)? as u64,
                        seed: row.get::<_, i64>(1)? as u64,
                        hash: row.get(2)?,
                        state: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn snapshot_count(&self, run_id: &str) -> SimResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM state_snapshot WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn delete_snapshots(&self, run_id: &str) -> SimResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM state_snapshot WHERE run_id = ?1", params![run_id])?;
        Ok(removed)
    }

    /// Drop all but the `keep` most recent snapshots of a run.
    pub fn evict_oldest_snapshots(&self, run_id: &str, keep: usize) -> SimResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM state_snapshot WHERE run_id = ?1 AND id NOT IN (
                 SELECT id FROM state_snapshot WHERE run_id = ?1
                 ORDER BY id DESC LIMIT ?2
             )",
            params![run_id, keep as i64],
        )?;
        Ok(removed)
    }
}

/// Snapshot store persisting linked snapshots for one run.
pub struct SqliteSnapshotStore {
    store:    SimStore,
    run_id:   RunId,
    capacity: usize,
    linker:   SnapshotLinker,
}

impl SqliteSnapshotStore {
    /// The run row must already exist.
    pub fn new(store: SimStore, run_id: impl Into<RunId>, capacity: usize) -> Self {
        Self {
            store,
            run_id: run_id.into(),
            capacity: capacity.max(1),
            linker: SnapshotLinker::default(),
        }
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn create_snapshot(&mut self) -> SnapshotHandle {
        self.linker.create()
    }

    fn capture(&mut self, handle: SnapshotHandle, world: &World) -> SimResult<()> {
        self.linker.capture(handle, world)
    }

    fn link_snapshot(&mut self, handle: SnapshotHandle, tick: Tick, seed: u64) -> SimResult<()> {
        let snapshot = self.linker.link(handle, tick, seed)?;
        self.store.save_snapshot(&self.run_id, &snapshot)?;
        let evicted = self.store.evict_oldest_snapshots(&self.run_id, self.capacity)?;
        if evicted > 0 {
            log::trace!("evicted {evicted} snapshot(s) for run {}", self.run_id);
        }
        Ok(())
    }

    fn find(&self, tick: Tick) -> SimResult<Option<StateSnapshot>> {
        self.store.snapshot_at(&self.run_id, tick)
    }

    fn len(&self) -> SimResult<usize> {
        self.store.snapshot_count(&self.run_id)
    }

    fn clear(&mut self) -> SimResult<()> {
        let removed = self.store.delete_snapshots(&self.run_id)?;
        log::debug!("cleared {removed} snapshot(s) for run {}", self.run_id);
        self.linker = SnapshotLinker::default();
        Ok(())
    }
}
