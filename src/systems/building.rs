//! Worker-driven building construction: move to site, pay cost, place.
//!
//! Grounded on `original_source/full/core/systems.py::BuildingPlacementSystem`.
//! Per-worker timers (`WorkerState::build_timer`, `mineral_warning_cooldown`,
//! `construction_started`) replace the Python version's external
//! `_build_timers`/`_mineral_warning_cooldown` dicts, matching this crate's
//! per-entity-timer convention.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventQueue, GameEvent};
use crate::map::GameMap;
use crate::stats::BuildingStatTable;
use crate::systems::movement::DeltaTime;
use crate::world::{NextEntityId, TeamMinerals};
use bevy_ecs::prelude::*;

const BUILD_SITE_SIZE: i32 = 2;

pub fn building_system(world: &mut World) {
    let dt = world.get_resource::<DeltaTime>().map(|d| d.0).unwrap_or(0.0);
    let (move_threshold, occupancy_dist_sq, warning_cooldown) = {
        let config = world.get_resource::<SimConfig>().unwrap();
        (config.build_move_threshold, config.build_occupancy_dist_sq, config.mineral_warning_cooldown)
    };
    let stat_table = world.get_resource::<BuildingStatTable>().cloned();
    let building_stats = |kind: BuildingKindTag| stat_table.as_ref().map(|t| t.get(kind)).unwrap_or_else(|| kind.stats());

    let others: Vec<(Entity, f32, f32)> = {
        let mut q = world.query::<(Entity, &Position, &Health)>();
        q.iter(world).filter(|(_, _, h)| h.is_alive()).map(|(e, p, _)| (e, p.x, p.y)).collect()
    };

    let workers: Vec<Entity> = {
        let mut q = world.query_filtered::<Entity, With<WorkerState>>();
        q.iter(world).collect()
    };

    let mut events = Vec::new();
    let mut placements: Vec<(Team, BuildingKindTag, f32, f32, EntityId)> = Vec::new();

    for worker in workers {
        if let Some(mut state) = world.get_mut::<WorkerState>(worker) {
            if state.mineral_warning_cooldown > 0.0 {
                state.mineral_warning_cooldown -= dt;
            }
        }

        let alive = world.get::<Health>(worker).map(|h| h.is_alive()).unwrap_or(false);
        if !alive {
            continue;
        }

        let build_target = world.get::<WorkerState>(worker).unwrap().build_target;
        let Some((building_type, bx, by)) = build_target else {
            world.get_mut::<WorkerState>(worker).unwrap().waiting_for_minerals = false;
            continue;
        };

        let Some(map) = world.get_resource::<GameMap>() else {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.build_target = None;
            state.waiting_for_minerals = false;
            continue;
        };
        let (bx_i, by_i) = (bx as i32, by as i32);
        let in_bounds = bx_i >= 0 && by_i >= 0 && (bx_i as usize) < map.width && (by_i as usize) < map.height;
        let buildable = in_bounds && map.is_buildable(bx_i, by_i, BUILD_SITE_SIZE);

        if !in_bounds || !buildable {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.build_target = None;
            state.waiting_for_minerals = false;
            continue;
        }

        let worker_id = *world.get::<EntityId>(worker).unwrap();
        let team = *world.get::<Team>(worker).unwrap();
        let pos = *world.get::<Position>(worker).unwrap();
        let dx = bx - pos.x;
        let dy = by - pos.y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist > move_threshold {
            world.get_mut::<Destination>(worker).unwrap().0 = Some((bx, by));
            world.get_mut::<WorkerState>(worker).unwrap().waiting_for_minerals = false;
            continue;
        }
        world.get_mut::<Destination>(worker).unwrap().0 = None;

        let cost = building_stats(building_type).cost;
        let affordable = world.get_resource::<TeamMinerals>().unwrap().get(team) >= cost;
        if !affordable {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.waiting_for_minerals = true;
            let should_warn = team == Team::Player && state.mineral_warning_cooldown <= 0.0;
            if should_warn {
                state.mineral_warning_cooldown = warning_cooldown;
            }
            drop(state);
            if should_warn {
                events.push(GameEvent::WorkerWaitingForMinerals { worker_id, team, building_type, cost });
            }
            continue;
        }
        world.get_mut::<WorkerState>(worker).unwrap().waiting_for_minerals = false;

        let already_started = world.get::<WorkerState>(worker).unwrap().construction_started;
        if !already_started {
            world.get_mut::<WorkerState>(worker).unwrap().construction_started = true;
            events.push(GameEvent::BuildingConstructionStart { worker_id, team, building_type, pos: (bx, by) });
        }

        let occupied = others.iter().any(|&(other, ox, oy)| {
            if other == worker {
                return false;
            }
            let odx = ox - bx;
            let ody = oy - by;
            odx * odx + ody * ody < occupancy_dist_sq
        });
        if occupied {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.build_target = None;
            state.build_timer = 0.0;
            state.construction_started = false;
            continue;
        }

        let build_time = building_stats(building_type).build_time;
        let mut state = world.get_mut::<WorkerState>(worker).unwrap();
        state.build_timer += dt;
        if state.build_timer >= build_time {
            state.build_target = None;
            state.build_timer = 0.0;
            state.construction_started = false;
            drop(state);
            placements.push((team, building_type, bx, by, worker_id));
        }
    }

    for (team, building_type, bx, by, builder_id) in placements {
        let new_stats = building_stats(building_type);
        world.get_resource_mut::<TeamMinerals>().unwrap().spend(team, new_stats.cost);
        let new_id = world.get_resource_mut::<NextEntityId>().unwrap().alloc();
        match building_type {
            BuildingKindTag::Base => {
                world.spawn(BaseBundle::with_stats(new_id, team, bx, by, new_stats));
            }
            BuildingKindTag::Barracks => {
                world.spawn(BarracksBundle::with_stats(new_id, team, bx, by, new_stats));
            }
        }
        events.push(GameEvent::BuildingPlaced {
            building_id: EntityId(new_id),
            building_type,
            team,
            pos: (bx, by),
            builder_id,
        });
    }

    if let Some(mut queue) = world.get_resource_mut::<EventQueue>() {
        for event in events {
            queue.push(event);
        }
    }
}
