//! Static terrain grid: walkability, buildability, and mineral markers.
//!
//! Grounded on `original_source/full/core/world.py::GameMap`/`World.load_map`.
//! No `csv` crate appears anywhere in the retrieval pack, so this follows
//! pack precedent with a hand-rolled line/comma split rather than pulling in
//! one.

use crate::error::ScenarioLoadError;
use bevy_ecs::prelude::Resource;

/// A single terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Grass,
    Rock,
}

/// The static terrain grid a scenario is played on. Held as a world resource
/// once loaded -- nothing mutates it mid-game (spec.md Non-goals rule out
/// dynamic terrain).
#[derive(Resource, Debug, Clone)]
pub struct GameMap {
    pub width: usize,
    pub height: usize,
    tiles: Vec<Tile>,
    /// World-space positions of mineral markers found while parsing, in
    /// row-major scan order (matches `World.load_map`'s `mineral_positions`).
    pub mineral_positions: Vec<(f32, f32)>,
    /// Spawn markers found while parsing (`8` = human, `9` = opponent),
    /// keyed by team number as in spec.md §6. Both markers are rewritten to
    /// plain grass once extracted, same as mineral markers.
    pub spawn_positions: Vec<(u8, f32, f32)>,
}

impl GameMap {
    /// Build a map from an already-parsed row-major tile grid. Every row
    /// must have the same width.
    pub fn new(
        width: usize,
        height: usize,
        tiles: Vec<Tile>,
        mineral_positions: Vec<(f32, f32)>,
        spawn_positions: Vec<(u8, f32, f32)>,
    ) -> Self {
        debug_assert_eq!(tiles.len(), width * height);
        Self {
            width,
            height,
            tiles,
            mineral_positions,
            spawn_positions,
        }
    }

    /// Parse a map from CSV text: one row per line, comma-separated cells.
    /// `'M'`/`'2'` mark a mineral patch (grass underneath, position
    /// recorded), `'8'`/`'9'` mark human/opponent spawns (grass underneath,
    /// position recorded), `'1'` marks unwalkable rock, anything else is
    /// plain grass -- matching spec.md §6's marker table and
    /// `World.load_map`'s rewrite-to-grass behaviour.
    pub fn from_csv(text: &str) -> Result<Self, ScenarioLoadError> {
        let mut tiles = Vec::new();
        let mut mineral_positions = Vec::new();
        let mut spawn_positions = Vec::new();
        let mut width = 0usize;
        let mut height = 0usize;

        for (y, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut row = Vec::new();
            for (x, cell) in line.split(',').enumerate() {
                let cell = cell.trim();
                let tile = match cell {
                    "M" | "2" => {
                        mineral_positions.push((x as f32, y as f32));
                        Tile::Grass
                    }
                    "8" => {
                        spawn_positions.push((1u8, x as f32, y as f32));
                        Tile::Grass
                    }
                    "9" => {
                        spawn_positions.push((2u8, x as f32, y as f32));
                        Tile::Grass
                    }
                    "1" => Tile::Rock,
                    _ => Tile::Grass,
                };
                row.push(tile);
            }
            width = width.max(row.len());
            tiles.push(row);
            height += 1;
        }

        // Pad ragged rows out to the widest row with grass, matching the
        // Python source's implicit per-row list length (there, a short row
        // would raise on indexing; we pad instead so a malformed map never
        // panics downstream).
        let mut flat = Vec::with_capacity(width * height);
        for mut row in tiles {
            row.resize(width, Tile::Grass);
            flat.extend(row);
        }

        Ok(Self::new(width, height, flat, mineral_positions, spawn_positions))
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(idx) => self.tiles[idx] == Tile::Grass,
            None => false,
        }
    }

    /// Whether a `size x size` footprint starting at `(x, y)` is entirely
    /// walkable, matching `GameMap.is_buildable`'s default `size=2`.
    pub fn is_buildable(&self, x: i32, y: i32, size: i32) -> bool {
        for dy in 0..size {
            for dx in 0..size {
                if !self.is_walkable(x + dx, y + dy) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0,0,0,1\n0,M,0,1\n0,0,0,0\n";

    #[test]
    fn test_from_csv_parses_rock_and_minerals() {
        let map = GameMap::from_csv(SAMPLE).unwrap();
        assert_eq!(map.width, 4);
        assert_eq!(map.height, 3);
        assert!(!map.is_walkable(3, 0));
        assert!(map.is_walkable(1, 1));
        assert_eq!(map.mineral_positions, vec![(1.0, 1.0)]);
    }

    #[test]
    fn test_out_of_bounds_is_not_walkable() {
        let map = GameMap::from_csv(SAMPLE).unwrap();
        assert!(!map.is_walkable(-1, 0));
        assert!(!map.is_walkable(100, 0));
    }

    #[test]
    fn test_is_buildable_checks_full_footprint() {
        let map = GameMap::from_csv(SAMPLE).unwrap();
        // (2,0)-(3,1) footprint includes the rock at (3,0).
        assert!(!map.is_buildable(2, 0, 2));
        assert!(map.is_buildable(0, 0, 2));
    }
}
