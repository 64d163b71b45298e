//! Drag-rectangle selection state and group-destination fan-out.
//!
//! Grounded on `original_source/full/core/selection.py::SelectionManager`
//! and `calculate_group_destinations`/`_generate_spiral_offsets`, retargeted
//! from Python `Set`/`Dict` returns to `HashSet`/`HashMap` and from
//! duck-typed `hasattr(entity, 'speed')` unit detection to the
//! `UnitKindTag` component query the caller performs before invoking this
//! module.

use crate::components::EntityId;
use crate::map::GameMap;
use crate::rng::Rng;
use std::collections::{HashMap, HashSet};

/// Minimum drag distance to count as a drag rather than a click, in world
/// units (`SelectionManager.DRAG_THRESHOLD`).
pub const DRAG_THRESHOLD: f32 = 0.5;

/// Tracks the in-progress drag-select rectangle and the current selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    pub selected_ids: HashSet<u32>,
    drag_start: Option<(f32, f32)>,
    drag_current: Option<(f32, f32)>,
    is_dragging: bool,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_drag(&mut self, wx: f32, wy: f32) {
        self.drag_start = Some((wx, wy));
        self.drag_current = Some((wx, wy));
        self.is_dragging = false;
    }

    pub fn update_drag(&mut self, wx: f32, wy: f32) {
        let Some((sx, sy)) = self.drag_start else {
            return;
        };
        self.drag_current = Some((wx, wy));
        let dx = wx - sx;
        let dy = wy - sy;
        if (dx * dx + dy * dy).sqrt() > DRAG_THRESHOLD {
            self.is_dragging = true;
        }
    }

    /// End the current drag, selecting every entity in `candidates` (already
    /// filtered to the dragging team's own units) that falls inside the
    /// drag rectangle. Returns an empty set, and clears drag state, if the
    /// gesture never crossed [`DRAG_THRESHOLD`] (i.e. it was really a click).
    pub fn end_drag(&mut self, candidates: &[(EntityId, f32, f32)]) -> HashSet<u32> {
        let result = if let (true, Some((x1, y1)), Some((x2, y2))) =
            (self.is_dragging, self.drag_start, self.drag_current)
        {
            let (min_x, max_x) = (x1.min(x2), x1.max(x2));
            let (min_y, max_y) = (y1.min(y2), y1.max(y2));
            candidates
                .iter()
                .filter(|(_, x, y)| *x >= min_x && *x <= max_x && *y >= min_y && *y <= max_y)
                .map(|(id, _, _)| id.0)
                .collect()
        } else {
            HashSet::new()
        };

        self.drag_start = None;
        self.drag_current = None;
        self.is_dragging = false;
        result
    }

    pub fn cancel_drag(&mut self) {
        self.drag_start = None;
        self.drag_current = None;
        self.is_dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Current drag rectangle `(x1, y1, x2, y2)`, or `None` if not
    /// currently past the drag threshold.
    pub fn get_drag_rect(&self) -> Option<(f32, f32, f32, f32)> {
        if self.is_dragging {
            if let (Some((x1, y1)), Some((x2, y2))) = (self.drag_start, self.drag_current) {
                return Some((x1, y1, x2, y2));
            }
        }
        None
    }

    pub fn select_single(&mut self, entity_id: u32) {
        self.selected_ids.clear();
        self.selected_ids.insert(entity_id);
    }

    pub fn add_to_selection(&mut self, entity_id: u32) {
        self.selected_ids.insert(entity_id);
    }

    pub fn clear(&mut self) {
        self.selected_ids.clear();
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_ids.is_empty()
    }
}

/// Assign each unit in `units` a destination tile near `target`, spreading
/// them out in a spiral instead of stacking them all on the same point.
/// Matches `calculate_group_destinations` exactly, including the `+10`
/// slack in the spiral length and the per-tile `+-0.3` jitter.
pub fn calculate_group_destinations(
    units: &[EntityId],
    target: (f32, f32),
    map: Option<&GameMap>,
    rng: &mut Rng,
) -> HashMap<u32, (f32, f32)> {
    if units.is_empty() {
        return HashMap::new();
    }

    let (target_x, target_y) = target;
    let mut destinations = HashMap::new();
    let mut occupied: HashSet<(i32, i32)> = HashSet::new();

    let spiral = generate_spiral_offsets(units.len() + 10);

    for unit in units {
        let mut assigned = false;
        for &(dx, dy) in &spiral {
            let tile_x = (target_x + dx as f32).floor() as i32;
            let tile_y = (target_y + dy as f32).floor() as i32;

            if occupied.contains(&(tile_x, tile_y)) {
                continue;
            }
            if let Some(map) = map {
                if !map.is_walkable(tile_x, tile_y) {
                    continue;
                }
            }

            occupied.insert((tile_x, tile_y));
            let offset_x = rng.gen_range_f32(-0.3, 0.3);
            let offset_y = rng.gen_range_f32(-0.3, 0.3);
            destinations.insert(unit.0, (tile_x as f32 + 0.5 + offset_x, tile_y as f32 + 0.5 + offset_y));
            assigned = true;
            break;
        }
        if !assigned {
            destinations.insert(unit.0, (target_x, target_y));
        }
    }

    destinations
}

/// Ring-by-ring spiral of integer tile offsets from the center, truncated
/// to `count` entries. Matches `_generate_spiral_offsets`'s
/// top/right/bottom/left edge traversal order exactly.
fn generate_spiral_offsets(count: usize) -> Vec<(i32, i32)> {
    let mut offsets = vec![(0, 0)];

    let max_radius = (count as f64).sqrt() as i32 + 3;
    for radius in 1..max_radius {
        for x in -radius..=radius {
            offsets.push((x, -radius));
        }
        for y in (-radius + 1)..=radius {
            offsets.push((radius, y));
        }
        for x in (-radius..radius).rev() {
            offsets.push((x, radius));
        }
        for y in (-radius + 1..radius).rev() {
            offsets.push((-radius, y));
        }
    }

    offsets.truncate(count);
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_movement_is_not_a_drag() {
        let mut sel = SelectionManager::new();
        sel.start_drag(0.0, 0.0);
        sel.update_drag(0.1, 0.1);
        assert!(!sel.is_dragging());
        let result = sel.end_drag(&[(EntityId(1), 0.0, 0.0)]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_large_drag_selects_units_in_rect() {
        let mut sel = SelectionManager::new();
        sel.start_drag(0.0, 0.0);
        sel.update_drag(10.0, 10.0);
        assert!(sel.is_dragging());

        let candidates = vec![
            (EntityId(1), 5.0, 5.0),
            (EntityId(2), 50.0, 50.0),
        ];
        let selected = sel.end_drag(&candidates);
        assert_eq!(selected, HashSet::from([1]));
    }

    #[test]
    fn test_select_single_replaces_previous_selection() {
        let mut sel = SelectionManager::new();
        sel.select_single(1);
        sel.select_single(2);
        assert_eq!(sel.selected_ids, HashSet::from([2]));
    }

    #[test]
    fn test_spiral_offsets_start_at_center() {
        let offsets = generate_spiral_offsets(5);
        assert_eq!(offsets[0], (0, 0));
        assert_eq!(offsets.len(), 5);
    }

    #[test]
    fn test_group_destinations_spread_units_across_tiles() {
        let units = vec![EntityId(1), EntityId(2), EntityId(3)];
        let mut rng = Rng::new(1);
        let dests = calculate_group_destinations(&units, (10.0, 10.0), None, &mut rng);
        assert_eq!(dests.len(), 3);
        let mut tiles: HashSet<(i32, i32)> = HashSet::new();
        for (x, y) in dests.values() {
            tiles.insert((x.floor() as i32, y.floor() as i32));
        }
        assert_eq!(tiles.len(), 3);
    }

    #[test]
    fn test_empty_units_returns_empty_map() {
        let mut rng = Rng::new(1);
        let dests = calculate_group_destinations(&[], (0.0, 0.0), None, &mut rng);
        assert!(dests.is_empty());
    }
}
