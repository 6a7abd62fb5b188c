//! Tile map state and the map-facing pipeline phases.
//!
//! Provisional (ghost) path elements are placed by the player while
//! previewing construction. They are lifted out of the map before peeps
//! update and put back straight after, so no guest can path onto them.

use crate::{
    error::{SimError, SimResult},
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::{RideId, Tick, TileCoord},
    world::World,
};
use serde::{Deserialize, Serialize};

/// Tiles refreshed per tick by the map tile phase.
pub const TILES_PER_TICK: u32 = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Grass,
    Dirt,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathElement {
    pub provisional: bool,
    pub wide:        bool,
}

impl PathElement {
    pub fn permanent() -> Self {
        Self { provisional: false, wide: false }
    }

    pub fn provisional() -> Self {
        Self { provisional: true, wide: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tile {
    pub surface: Surface,
    pub wetness: u8,
    pub path:    Option<PathElement>,
    pub ride:    Option<RideId>,
}

impl Tile {
    fn grass() -> Self {
        Self { surface: Surface::Grass, wetness: 0, path: None, ride: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileMap {
    pub width:         u16,
    pub height:        u16,
    pub entrance:      TileCoord,
    pub tiles:         Vec<Tile>,
    pub update_cursor: u32,
    /// Provisional elements lifted out for the peep phase. Empty between ticks.
    #[serde(default)]
    stashed:           Vec<(u32, PathElement)>,
}

impl TileMap {
    pub fn new(width: u16, height: u16, entrance: TileCoord) -> Self {
        Self {
            width,
            height,
            entrance,
            tiles: vec![Tile::grass(); width as usize * height as usize],
            update_cursor: 0,
            stashed: Vec::new(),
        }
    }

    pub fn index(&self, coord: TileCoord) -> Option<usize> {
        (coord.x < self.width && coord.y < self.height)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn coord(&self, index: usize) -> TileCoord {
        TileCoord::new(
            (index % self.width as usize) as u16,
            (index / self.width as usize) as u16,
        )
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    /// A tile peeps may stand on: a committed path.
    pub fn is_walkable(&self, coord: TileCoord) -> bool {
        matches!(
            self.tile(coord).and_then(|t| t.path),
            Some(PathElement { provisional: false, .. })
        )
    }

    /// Neighbours in fixed N, E, S, W order, clipped to the map.
    pub fn neighbours(&self, coord: TileCoord) -> Vec<TileCoord> {
        let mut out = Vec::with_capacity(4);
        if coord.y > 0 {
            out.push(TileCoord::new(coord.x, coord.y - 1));
        }
        if coord.x + 1 < self.width {
            out.push(TileCoord::new(coord.x + 1, coord.y));
        }
        if coord.y + 1 < self.height {
            out.push(TileCoord::new(coord.x, coord.y + 1));
        }
        if coord.x > 0 {
            out.push(TileCoord::new(coord.x - 1, coord.y));
        }
        out
    }

    pub fn walkable_neighbours(&self, coord: TileCoord) -> Vec<TileCoord> {
        self.neighbours(coord)
            .into_iter()
            .filter(|c| self.is_walkable(*c))
            .collect()
    }

    pub fn provisional_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t.path, Some(PathElement { provisional: true, .. })))
            .count()
    }

    pub fn has_stashed(&self) -> bool {
        !self.stashed.is_empty()
    }

    fn stash_provisional(&mut self) -> usize {
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            if matches!(tile.path, Some(PathElement { provisional: true, .. })) {
                if let Some(path) = tile.path.take() {
                    self.stashed.push((i as u32, path));
                }
            }
        }
        self.stashed.len()
    }

    fn restore_provisional(&mut self) -> usize {
        let count = self.stashed.len();
        for (i, path) in self.stashed.drain(..) {
            self.tiles[i as usize].path = Some(path);
        }
        count
    }

    fn update_path_wide_flags(&mut self) {
        let wide: Vec<bool> = (0..self.tiles.len())
            .map(|i| {
                let c = self.coord(i);
                self.is_walkable(c)
                    && self.is_walkable(TileCoord::new(c.x + 1, c.y))
                    && self.is_walkable(TileCoord::new(c.x, c.y + 1))
                    && self.is_walkable(TileCoord::new(c.x + 1, c.y + 1))
            })
            .collect();
        for (tile, is_wide) in self.tiles.iter_mut().zip(wide) {
            if let Some(path) = tile.path.as_mut() {
                path.wide = is_wide;
            }
        }
    }
}

/// Weather effects on a rolling window of tiles.
pub struct MapTilesSubsystem;

impl SimSubsystem for MapTilesSubsystem {
    fn name(&self) -> &'static str { "map_tiles" }
    fn phase(&self) -> LogicPhase { LogicPhase::MapTiles }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Map }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let raining = world.climate.weather.is_raining();
        let map = &mut world.map;
        let total = map.tiles.len() as u32;
        if total == 0 {
            return Ok(vec![]);
        }
        for step in 0..TILES_PER_TICK.min(total) {
            let idx = ((map.update_cursor + step) % total) as usize;
            let tile = &mut map.tiles[idx];
            tile.wetness = if raining {
                tile.wetness.saturating_add(8)
            } else {
                tile.wetness.saturating_sub(1)
            };
            if tile.path.is_none() && tile.ride.is_none() {
                tile.surface = if tile.wetness > 200 { Surface::Dirt } else { Surface::Grass };
            }
        }
        map.update_cursor = (map.update_cursor + TILES_PER_TICK) % total;
        Ok(vec![])
    }
}

pub struct StashProvisionalSubsystem;

impl SimSubsystem for StashProvisionalSubsystem {
    fn name(&self) -> &'static str { "map_stash_provisional" }
    fn phase(&self) -> LogicPhase { LogicPhase::MapStashProvisional }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Map }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if world.map.has_stashed() {
            return Err(SimError::invariant(
                tick,
                "provisional elements still stashed from a previous tick",
            ));
        }
        world.map.stash_provisional();
        Ok(vec![])
    }
}

pub struct PathWideFlagsSubsystem;

impl SimSubsystem for PathWideFlagsSubsystem {
    fn name(&self) -> &'static str { "map_path_wide_flags" }
    fn phase(&self) -> LogicPhase { LogicPhase::MapPathWideFlags }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Map }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        world.map.update_path_wide_flags();
        Ok(vec![])
    }
}

pub struct RestoreProvisionalSubsystem;

impl SimSubsystem for RestoreProvisionalSubsystem {
    fn name(&self) -> &'static str { "map_restore_provisional" }
    fn phase(&self) -> LogicPhase { LogicPhase::MapRestoreProvisional }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Map }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        world.map.restore_provisional();
        Ok(vec![])
    }
}

/// Marks animated tiles for redraw. Touches presentation state only.
pub struct MapAnimationSubsystem;

impl SimSubsystem for MapAnimationSubsystem {
    fn name(&self) -> &'static str { "map_animation" }
    fn phase(&self) -> LogicPhase { LogicPhase::MapAnimation }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::Animation }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        world.invalidate_map_animation();
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_of_paths() -> TileMap {
        let mut map = TileMap::new(4, 4, TileCoord::new(0, 0));
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1), (3, 3)] {
            map.tile_mut(TileCoord::new(x, y)).unwrap().path = Some(PathElement::permanent());
        }
        map
    }

    #[test]
    fn two_by_two_block_marks_top_left_wide() {
        let mut map = square_of_paths();
        map.update_path_wide_flags();
        assert!(map.tile(TileCoord::new(0, 0)).unwrap().path.unwrap().wide);
        assert!(!map.tile(TileCoord::new(1, 1)).unwrap().path.unwrap().wide);
        assert!(!map.tile(TileCoord::new(3, 3)).unwrap().path.unwrap().wide);
    }

    #[test]
    fn stash_and_restore_round_trip_provisional_paths() {
        let mut map = square_of_paths();
        let ghost = TileCoord::new(2, 2);
        map.tile_mut(ghost).unwrap().path = Some(PathElement::provisional());

        assert_eq!(map.stash_provisional(), 1);
        assert!(map.tile(ghost).unwrap().path.is_none());
        assert_eq!(map.provisional_count(), 0);

        assert_eq!(map.restore_provisional(), 1);
        assert_eq!(map.tile(ghost).unwrap().path, Some(PathElement::provisional()));
        assert!(!map.has_stashed());
    }

    #[test]
    fn provisional_path_is_not_walkable() {
        let mut map = square_of_paths();
        let ghost = TileCoord::new(2, 0);
        map.tile_mut(ghost).unwrap().path = Some(PathElement::provisional());
        assert!(!map.is_walkable(ghost));
        assert_eq!(
            map.walkable_neighbours(TileCoord::new(1, 0)),
            vec![TileCoord::new(1, 1), TileCoord::new(0, 0)]
        );
    }
}
