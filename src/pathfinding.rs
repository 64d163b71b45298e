//! A* pathfinding over the tile grid.
//!
//! Grounded on `original_source/full/core/systems.py::PathFinder` for exact
//! content (8-directional movement, octile heuristic, ring-expansion
//! fallback for unwalkable goals); the `f32`-into-total-order
//! `partial_cmp`/`unwrap_or(Equal)` idiom for the open-set ordering is
//! reused from `spatial.rs::query_radius`'s distance sort.

use crate::map::GameMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

const DIRECTIONS: [((i32, i32), f32); 8] = [
    ((-1, -1), 1.414),
    ((0, -1), 1.0),
    ((1, -1), 1.414),
    ((-1, 0), 1.0),
    ((1, 0), 1.0),
    ((-1, 1), 1.414),
    ((0, 1), 1.0),
    ((1, 1), 1.414),
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f_score: f32,
    counter: u64,
    node: (i32, i32),
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for a min-heap on f_score, tie-broken by insertion order
        // (lower counter first), matching the Python heap's tuple ordering.
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0).abs() as f32;
    let dy = (a.1 - b.1).abs() as f32;
    dx.max(dy) + 0.414 * dx.min(dy)
}

fn find_nearest_walkable(map: &GameMap, pos: (i32, i32)) -> Option<(i32, i32)> {
    for radius in 1..10 {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() == radius || dy.abs() == radius {
                    let (nx, ny) = (pos.0 + dx, pos.1 + dy);
                    if map.is_walkable(nx, ny) {
                        return Some((nx, ny));
                    }
                }
            }
        }
    }
    None
}

fn reconstruct_path(came_from: &HashMap<(i32, i32), (i32, i32)>, goal: (i32, i32)) -> Vec<(i32, i32)> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    // Drop the start tile, matching `_reconstruct_path`'s `path[1:]`.
    if !path.is_empty() {
        path.remove(0);
    }
    path
}

/// Find a tile path from `start` to `goal` on `map` using A* with
/// 8-directional movement. Tile coordinates are truncated to integers, same
/// as the Python source. Returns an empty path if `start` and `goal` are the
/// same tile, or if no path exists. If `goal` itself is unwalkable, the
/// nearest walkable tile within a 9-tile ring search is substituted.
pub fn astar(map: &GameMap, start: (f32, f32), goal: (f32, f32)) -> Vec<(i32, i32)> {
    let start = (start.0 as i32, start.1 as i32);
    let mut goal = (goal.0 as i32, goal.1 as i32);

    if start == goal {
        return Vec::new();
    }

    if !map.is_walkable(goal.0, goal.1) {
        match find_nearest_walkable(map, goal) {
            Some(g) => goal = g,
            None => return Vec::new(),
        }
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    let mut g_score: HashMap<(i32, i32), f32> = HashMap::new();
    g_score.insert(start, 0.0);
    let mut counter = 0u64;

    open_set.push(OpenEntry {
        f_score: 0.0,
        counter,
        node: start,
    });

    while let Some(OpenEntry { node: current, .. }) = open_set.pop() {
        if current == goal {
            return reconstruct_path(&came_from, current);
        }

        let current_g = *g_score.get(&current).unwrap_or(&f32::INFINITY);

        for ((dx, dy), cost) in DIRECTIONS {
            let neighbor = (current.0 + dx, current.1 + dy);
            if !map.is_walkable(neighbor.0, neighbor.1) {
                continue;
            }

            let tentative_g = current_g + cost;
            let better = match g_score.get(&neighbor) {
                Some(&existing) => tentative_g < existing,
                None => true,
            };

            if better {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                let f_score = tentative_g + heuristic(neighbor, goal);
                counter += 1;
                open_set.push(OpenEntry {
                    f_score,
                    counter,
                    node: neighbor,
                });
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Tile;

    fn open_map(width: usize, height: usize) -> GameMap {
        GameMap::new(width, height, vec![Tile::Grass; width * height], Vec::new(), Vec::new())
    }

    #[test]
    fn test_same_tile_returns_empty_path() {
        let map = open_map(10, 10);
        assert!(astar(&map, (2.0, 2.0), (2.4, 2.4)).is_empty());
    }

    #[test]
    fn test_straight_line_on_open_map() {
        let map = open_map(10, 10);
        let path = astar(&map, (0.0, 0.0), (3.0, 0.0));
        assert_eq!(path.last(), Some(&(3, 0)));
        assert!(!path.is_empty());
    }

    #[test]
    fn test_routes_around_a_wall() {
        let mut tiles = vec![Tile::Grass; 5 * 5];
        // Wall column at x=2, rows 0..4 (leave row 4 open as the only gap).
        for y in 0..4 {
            tiles[y * 5 + 2] = Tile::Rock;
        }
        let map = GameMap::new(5, 5, tiles, Vec::new(), Vec::new());
        let path = astar(&map, (0.0, 0.0), (4.0, 0.0));
        assert!(!path.is_empty());
        assert!(path.iter().all(|&(x, y)| map.is_walkable(x, y)));
    }

    #[test]
    fn test_unreachable_goal_returns_empty() {
        let mut tiles = vec![Tile::Grass; 3 * 3];
        for i in 0..9 {
            if i != 4 {
                tiles[i] = Tile::Rock;
            }
        }
        let map = GameMap::new(3, 3, tiles, Vec::new(), Vec::new());
        // Center tile (1,1) is walkable but fully enclosed by rock.
        let path = astar(&map, (1.0, 1.0), (0.0, 0.0));
        assert!(path.is_empty());
    }

    #[test]
    fn test_unwalkable_goal_snaps_to_nearest_walkable() {
        let mut tiles = vec![Tile::Grass; 5 * 5];
        tiles[2 * 5 + 2] = Tile::Rock;
        let map = GameMap::new(5, 5, tiles, Vec::new(), Vec::new());
        let path = astar(&map, (0.0, 0.0), (2.0, 2.0));
        assert!(!path.is_empty());
        assert_ne!(path.last(), Some(&(2, 2)));
    }
}
