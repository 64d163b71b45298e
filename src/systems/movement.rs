//! Unit movement: path-following, arrival, and stuck-unit recovery.
//!
//! Grounded on `original_source/full/core/systems.py::MovementSystem`.
//! The Python version tracks per-unit stuck timers in an external dict
//! keyed by entity id; here that state lives on the entity itself via
//! `StuckWatchdog`, matching this crate's per-entity-timer convention
//! (see `components.rs`'s doc comment on `WorkerState`).

use crate::components::*;
use crate::config::SimConfig;
use crate::map::GameMap;
use crate::pathfinding::astar;
use crate::stats::UnitStatTable;
use bevy_ecs::prelude::*;

/// Seconds elapsed since the previous fixed tick.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);

type UnitQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static UnitKindTag,
        &'static Health,
        &'static mut Position,
        &'static mut Facing,
        &'static mut PathState,
        &'static mut Destination,
        &'static mut StuckWatchdog,
    ),
>;

/// Advance every living unit toward its `Destination`/`PathState`, using
/// A* when a path needs (re)computing, and unstick units that haven't
/// moved far enough in `SimConfig::stuck_threshold` seconds.
pub fn movement_system(
    mut queries: ParamSet<(UnitQuery, Query<(Entity, &Position, &Health)>)>,
    map: Option<Res<GameMap>>,
    config: Res<SimConfig>,
    dt: Res<DeltaTime>,
    stats: Option<Res<UnitStatTable>>,
) {
    let dt = dt.0;
    let others: Vec<(Entity, f32, f32)> = queries
        .p1()
        .iter()
        .filter(|(_, _, health)| health.is_alive())
        .map(|(e, pos, _)| (e, pos.x, pos.y))
        .collect();

    let mut units = queries.p0();
    for (entity, kind, health, mut pos, mut facing, mut path, mut dest, mut stuck) in units.iter_mut() {
        if !health.is_alive() {
            continue;
        }

        // Stuck detection only applies to units that are actually trying
        // to go somewhere, matching `_update_stuck_detection`'s early return.
        if dest.0.is_none() && path.waypoints.is_empty() {
            stuck.tracking = false;
            stuck.timer = 0.0;
        } else {
            update_stuck_detection(&mut stuck, &pos, dt, &config);
            if stuck.timer >= config.stuck_threshold {
                if let Some(map) = map.as_deref() {
                    unstick(entity, &mut pos, &mut path, map, &others, config.unstick_search_radius);
                }
                stuck.tracking = false;
                stuck.timer = 0.0;
            }
        }

        if !path.waypoints.is_empty() {
            let (wx, wy) = path.waypoints[0];
            let dx = wx - pos.x;
            let dy = wy - pos.y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist < config.arrival_threshold {
                path.waypoints.remove(0);
                continue;
            }

            facing.0 = (-dy).atan2(dx).to_degrees();
            let speed = stats.as_deref().map(|t| t.get(*kind).speed).unwrap_or_else(|| kind.stats().speed);
            let move_dist = speed * dt;
            let step = move_dist.min(dist);
            let new_x = pos.x + (dx / dist) * step;
            let new_y = pos.y + (dy / dist) * step;

            let walkable = map
                .as_deref()
                .map(|m| m.is_walkable(new_x as i32, new_y as i32))
                .unwrap_or(true);
            if walkable {
                pos.x = new_x;
                pos.y = new_y;
            } else {
                path.waypoints.clear();
                if let (Some((gx, gy)), Some(map)) = (dest.0, map.as_deref()) {
                    path.waypoints = tile_path(map, (pos.x, pos.y), (gx, gy));
                }
            }
        } else if let Some((gx, gy)) = dest.0 {
            let dx = gx - pos.x;
            let dy = gy - pos.y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist < config.arrival_threshold {
                dest.0 = None;
                continue;
            }

            facing.0 = (-dy).atan2(dx).to_degrees();
            if let Some(map) = map.as_deref() {
                path.waypoints = tile_path(map, (pos.x, pos.y), (gx, gy));
                if path.waypoints.is_empty() {
                    dest.0 = None;
                }
            }
        }
    }
}

fn tile_path(map: &GameMap, start: (f32, f32), goal: (f32, f32)) -> Vec<(f32, f32)> {
    astar(map, start, goal)
        .into_iter()
        .map(|(x, y)| (x as f32 + 0.5, y as f32 + 0.5))
        .collect()
}

fn update_stuck_detection(stuck: &mut StuckWatchdog, pos: &Position, dt: f32, config: &SimConfig) {
    if !stuck.tracking {
        stuck.tracking = true;
        stuck.timer = 0.0;
        stuck.last_x = pos.x;
        stuck.last_y = pos.y;
        return;
    }

    let dx = pos.x - stuck.last_x;
    let dy = pos.y - stuck.last_y;
    let moved = (dx * dx + dy * dy).sqrt();

    if moved > config.stuck_move_distance {
        stuck.timer = 0.0;
        stuck.last_x = pos.x;
        stuck.last_y = pos.y;
    } else {
        stuck.timer += dt;
    }
}

/// Teleport a stuck entity to the nearest walkable, unoccupied tile within
/// `search_radius`, matching `MovementSystem._unstick_unit`'s ring search
/// and `< 1.0` squared-distance occupancy check.
fn unstick(
    entity: Entity,
    pos: &mut Position,
    path: &mut PathState,
    map: &GameMap,
    others: &[(Entity, f32, f32)],
    search_radius: i32,
) {
    let current = (pos.x as i32, pos.y as i32);
    for radius in 1..search_radius {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let (nx, ny) = (current.0 + dx, current.1 + dy);
                if !map.is_walkable(nx, ny) {
                    continue;
                }
                let occupied = others.iter().any(|&(other, ox, oy)| {
                    if other == entity {
                        return false;
                    }
                    let odx = ox - nx as f32;
                    let ody = oy - ny as f32;
                    odx * odx + ody * ody < 1.0
                });
                if !occupied {
                    pos.x = nx as f32 + 0.5;
                    pos.y = ny as f32 + 0.5;
                    path.waypoints.clear();
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Tile;

    fn open_map(size: usize) -> GameMap {
        GameMap::new(size, size, vec![Tile::Grass; size * size], Vec::new(), Vec::new())
    }

    fn build_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule
    }

    #[test]
    fn test_unit_moves_toward_destination() {
        let mut world = World::new();
        world.insert_resource(open_map(20));
        world.insert_resource(SimConfig::default());
        world.insert_resource(DeltaTime(0.1));

        let worker = world.spawn(WorkerBundle::new(1, Team::Player, 5.0, 5.0)).id();
        world.get_mut::<Destination>(worker).unwrap().0 = Some((10.0, 5.0));

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let pos = world.get::<Position>(worker).unwrap();
        assert!(pos.x > 5.0);
    }

    #[test]
    fn test_arrival_clears_destination() {
        let mut world = World::new();
        world.insert_resource(open_map(20));
        world.insert_resource(SimConfig::default());
        world.insert_resource(DeltaTime(0.1));

        let worker = world.spawn(WorkerBundle::new(1, Team::Player, 5.0, 5.0)).id();
        world.get_mut::<Destination>(worker).unwrap().0 = Some((5.2, 5.0));

        let mut schedule = build_schedule();
        schedule.run(&mut world);
        schedule.run(&mut world);

        let dest = world.get::<Destination>(worker).unwrap();
        assert!(dest.0.is_none());
    }

    #[test]
    fn test_facing_updates_toward_destination() {
        let mut world = World::new();
        world.insert_resource(open_map(20));
        world.insert_resource(SimConfig::default());
        world.insert_resource(DeltaTime(0.1));

        let worker = world.spawn(WorkerBundle::new(1, Team::Player, 5.0, 5.0)).id();
        world.get_mut::<Destination>(worker).unwrap().0 = Some((15.0, 5.0));

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let facing = world.get::<Facing>(worker).unwrap();
        assert!((facing.0 - 0.0).abs() < 1.0);
    }
}
