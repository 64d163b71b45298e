//! Click/drag command dispatch: translates a world-space click or a
//! completed drag-select into component mutations and `Command` events.
//!
//! Grounded on `original_source/full/main.py::Game.handle_click`,
//! `start_build_mode`, and `request_production`. The Python version reaches
//! into a single `World` object with dict-keyed entities; this version
//! walks `bevy_ecs` queries instead, but every branch and distance
//! threshold below is preserved exactly.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventBus, GameEvent};
use crate::map::GameMap;
use crate::rng::Rng;
use crate::selection::{calculate_group_destinations, SelectionManager};
use crate::stats::UnitStatTable;
use crate::world::TeamMinerals;
use bevy_ecs::prelude::*;

/// Pending building-placement request, armed by [`start_build_mode`] and
/// consumed by the next [`handle_click`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildMode {
    pub active: bool,
    pub building_type: Option<BuildingKindTag>,
}

impl BuildMode {
    pub fn arm(&mut self, kind: BuildingKindTag) {
        self.active = true;
        self.building_type = Some(kind);
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.building_type = None;
    }
}

fn find_entity_by_id(world: &mut World, id: u32) -> Option<Entity> {
    let mut query = world.query::<(Entity, &EntityId)>();
    query.iter(world).find(|(_, e)| e.0 == id).map(|(e, _)| e)
}

/// Nearest living unit or building to `(wx, wy)` within `radius`, matching
/// `World.get_entity_at`'s default `radius=0.5`.
fn entity_at(world: &mut World, wx: f32, wy: f32, radius: f32) -> Option<(u32, Team, f32, f32)> {
    let radius_sq = radius * radius;
    let mut query = world.query::<(&EntityId, &Team, &Position, &Health)>();
    for (id, team, pos, health) in query.iter(world) {
        if !health.is_alive() {
            continue;
        }
        let dx = pos.x - wx;
        let dy = pos.y - wy;
        if dx * dx + dy * dy <= radius_sq {
            return Some((id.0, *team, pos.x, pos.y));
        }
    }
    None
}

/// Enter build mode for `team`'s first selected entity, if it is a living
/// Worker. Matches `Game.start_build_mode`: a non-worker selection, or no
/// selection at all, leaves build mode untouched.
pub fn start_build_mode(
    world: &mut World,
    selection: &SelectionManager,
    build_mode: &mut BuildMode,
    building_type: BuildingKindTag,
) {
    let Some(&first_id) = selection.selected_ids.iter().next() else {
        return;
    };
    let Some(entity) = find_entity_by_id(world, first_id) else {
        return;
    };
    if world.get::<UnitKindTag>(entity) == Some(&UnitKindTag::Worker) {
        build_mode.arm(building_type);
    }
}

/// Queue production on `team`'s first selected building. Unlike a
/// mineral-short click-to-move, insufficient funds do not block queuing --
/// `InsufficientMinerals` merely fires as a warning before the queue push is
/// attempted (attempted push still respects `ProductionQueue::MAX_QUEUE_SIZE`),
/// matching `Game.request_production`'s unconditional `start_production()`
/// call after the event check. The queue push itself never publishes an
/// event -- `ProductionStarted` is only published once, from
/// `systems::production::production_system`, when the queue head actually
/// begins building.
pub fn request_production(
    world: &mut World,
    selection: &SelectionManager,
    minerals: &TeamMinerals,
    bus: &mut EventBus,
) {
    let Some(&first_id) = selection.selected_ids.iter().next() else {
        return;
    };
    let Some(entity) = find_entity_by_id(world, first_id) else {
        return;
    };

    let Some(kind) = world.get::<BuildingKindTag>(entity).copied() else {
        return;
    };
    let team = *world.get::<Team>(entity).unwrap();
    let unit_type = match kind {
        BuildingKindTag::Base => UnitKindTag::Worker,
        BuildingKindTag::Barracks => UnitKindTag::Soldier,
    };
    let cost = world
        .get_resource::<UnitStatTable>()
        .map(|t| t.get(unit_type).cost)
        .unwrap_or_else(|| unit_type.stats().cost);
    let available = minerals.get(team);

    if available < cost {
        bus.publish(GameEvent::InsufficientMinerals {
            team,
            building_id: EntityId(first_id),
            unit_type,
            cost,
            available,
        });
    }

    world.get_mut::<ProductionQueue>(entity).unwrap().push(unit_type);
}

/// Dispatch a left-click at world position `(wx, wy)` for `team`. Handles,
/// in priority order: pending build placement, selecting an own entity,
/// single-worker mineral gathering, attack-all-selected on an enemy, and
/// move (direct for one unit, fan-out for several) -- matching
/// `Game.handle_click`'s branch order exactly.
#[allow(clippy::too_many_arguments)]
pub fn handle_click(
    world: &mut World,
    selection: &mut SelectionManager,
    build_mode: &mut BuildMode,
    team: Team,
    wx: f32,
    wy: f32,
    config: &SimConfig,
    map: Option<&GameMap>,
    rng: &mut Rng,
    bus: &mut EventBus,
) {
    let clicked = entity_at(world, wx, wy, 0.5);
    let first_selected = selection.selected_ids.iter().next().copied();

    // Build mode: place building.
    if build_mode.active {
        if let (Some(kind), Some(first_id)) = (build_mode.building_type, first_selected) {
            if let Some(entity) = find_entity_by_id(world, first_id) {
                if world.get::<UnitKindTag>(entity) == Some(&UnitKindTag::Worker) {
                    if let Some(mut state) = world.get_mut::<WorkerState>(entity) {
                        state.build_target = Some((kind, wx, wy));
                        state.construction_started = false;
                    }
                    build_mode.clear();
                    bus.publish(GameEvent::Command {
                        entity_id: EntityId(first_id),
                        team,
                    });
                }
            }
        }
        return;
    }

    // Click on own entity: select it.
    if let Some((id, clicked_team, _, _)) = clicked {
        if clicked_team == team {
            selection.select_single(id);
            return;
        }
    }

    if !selection.has_selection() {
        return;
    }

    // Collect selected, living units (buildings are never movable/attackable targets here).
    let mut selected_units: Vec<(Entity, EntityId)> = Vec::new();
    for &id in &selection.selected_ids {
        if let Some(entity) = find_entity_by_id(world, id) {
            let alive = world.get::<Health>(entity).map(|h| h.is_alive()).unwrap_or(false);
            let is_unit = world.get::<UnitKindTag>(entity).is_some();
            if alive && is_unit {
                selected_units.push((entity, EntityId(id)));
            }
        }
    }
    if selected_units.is_empty() {
        return;
    }

    // Single selected worker clicking near a mineral patch: gather.
    if selected_units.len() == 1 {
        let (entity, id) = selected_units[0];
        if world.get::<UnitKindTag>(entity) == Some(&UnitKindTag::Worker) {
            let mut best: Option<(EntityId, f32, f32)> = None;
            let mut best_dist_sq = config.click_mineral_dist_sq;
            {
                let mut query = world.query::<(&EntityId, &Position, &MineralPatch)>();
                for (mid, pos, patch) in query.iter(world) {
                    if patch.depleted() {
                        continue;
                    }
                    let dx = pos.x - wx;
                    let dy = pos.y - wy;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq < best_dist_sq {
                        best_dist_sq = dist_sq;
                        best = Some((*mid, pos.x, pos.y));
                    }
                }
            }
            if let Some((mineral_id, mx, my)) = best {
                if let Some(mut state) = world.get_mut::<WorkerState>(entity) {
                    state.gather_target = Some(mineral_id);
                    state.activity = WorkerActivity::MovingToMineral;
                }
                if let Some(mut dest) = world.get_mut::<Destination>(entity) {
                    dest.0 = Some((mx, my));
                }
                if let Some(mut combat) = world.get_mut::<SoldierCombat>(entity) {
                    combat.target = None;
                }
                bus.publish(GameEvent::Command { entity_id: id, team });
                return;
            }
        }
    }

    // Click on an enemy: attack with every selected unit.
    if let Some((enemy_id, enemy_team, ex, ey)) = clicked {
        if enemy_team != team {
            for &(entity, _) in &selected_units {
                if let Some(mut combat) = world.get_mut::<SoldierCombat>(entity) {
                    combat.target = Some(EntityId(enemy_id));
                }
                if let Some(mut dest) = world.get_mut::<Destination>(entity) {
                    dest.0 = Some((ex, ey));
                }
            }
            bus.publish(GameEvent::Command {
                entity_id: selected_units[0].1,
                team,
            });
            return;
        }
    }

    // Click on open terrain: move.
    if selected_units.len() == 1 {
        let (entity, id) = selected_units[0];
        if let Some(mut dest) = world.get_mut::<Destination>(entity) {
            dest.0 = Some((wx, wy));
        }
        if let Some(mut path) = world.get_mut::<PathState>(entity) {
            path.waypoints.clear();
        }
        if let Some(mut combat) = world.get_mut::<SoldierCombat>(entity) {
            combat.target = None;
        }
        if world.get::<UnitKindTag>(entity) == Some(&UnitKindTag::Worker) {
            if let Some(mut state) = world.get_mut::<WorkerState>(entity) {
                state.gather_target = None;
                state.activity = WorkerActivity::Idle;
            }
        }
        bus.publish(GameEvent::Command { entity_id: id, team });
    } else {
        let ids: Vec<EntityId> = selected_units.iter().map(|(_, id)| *id).collect();
        let destinations = calculate_group_destinations(&ids, (wx, wy), map, rng);
        for &(entity, id) in &selected_units {
            let Some(&(dx, dy)) = destinations.get(&id.0) else {
                continue;
            };
            if let Some(mut dest) = world.get_mut::<Destination>(entity) {
                dest.0 = Some((dx, dy));
            }
            if let Some(mut path) = world.get_mut::<PathState>(entity) {
                path.waypoints.clear();
            }
            if let Some(mut combat) = world.get_mut::<SoldierCombat>(entity) {
                combat.target = None;
            }
            if world.get::<UnitKindTag>(entity) == Some(&UnitKindTag::Worker) {
                if let Some(mut state) = world.get_mut::<WorkerState>(entity) {
                    state.gather_target = None;
                    state.activity = WorkerActivity::Idle;
                }
            }
        }
        bus.publish(GameEvent::Command {
            entity_id: selected_units[0].1,
            team,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_worker(world: &mut World, id: u32, team: Team, x: f32, y: f32) -> Entity {
        world.spawn(WorkerBundle::new(id, team, x, y)).id()
    }

    #[test]
    fn test_click_own_unit_selects_it() {
        let mut world = World::new();
        spawn_worker(&mut world, 1, Team::Player, 5.0, 5.0);
        let mut selection = SelectionManager::new();
        let mut build_mode = BuildMode::default();
        let config = SimConfig::default();
        let mut rng = Rng::new(1);
        let mut bus = EventBus::new();

        handle_click(
            &mut world, &mut selection, &mut build_mode, Team::Player, 5.0, 5.0, &config, None,
            &mut rng, &mut bus,
        );

        assert_eq!(selection.selected_ids, std::collections::HashSet::from([1]));
    }

    #[test]
    fn test_click_terrain_moves_single_selected_unit() {
        let mut world = World::new();
        let worker = spawn_worker(&mut world, 1, Team::Player, 0.0, 0.0);
        let mut selection = SelectionManager::new();
        selection.select_single(1);
        let mut build_mode = BuildMode::default();
        let config = SimConfig::default();
        let mut rng = Rng::new(1);
        let mut bus = EventBus::new();

        handle_click(
            &mut world, &mut selection, &mut build_mode, Team::Player, 9.0, 9.0, &config, None,
            &mut rng, &mut bus,
        );

        let dest = world.get::<Destination>(worker).unwrap();
        assert_eq!(dest.0, Some((9.0, 9.0)));
    }

    #[test]
    fn test_build_mode_requires_worker_selected() {
        let mut world = World::new();
        world.spawn(SoldierBundle::new(1, Team::Player, 0.0, 0.0));
        let mut selection = SelectionManager::new();
        selection.select_single(1);
        let mut build_mode = BuildMode::default();

        start_build_mode(&mut world, &selection, &mut build_mode, BuildingKindTag::Barracks);
        assert!(!build_mode.active);
    }

    #[test]
    fn test_build_mode_arms_for_worker_then_click_sets_target() {
        let mut world = World::new();
        let worker = spawn_worker(&mut world, 1, Team::Player, 0.0, 0.0);
        let mut selection = SelectionManager::new();
        selection.select_single(1);
        let mut build_mode = BuildMode::default();
        start_build_mode(&mut world, &selection, &mut build_mode, BuildingKindTag::Barracks);
        assert!(build_mode.active);

        let config = SimConfig::default();
        let mut rng = Rng::new(1);
        let mut bus = EventBus::new();
        handle_click(
            &mut world, &mut selection, &mut build_mode, Team::Player, 4.0, 4.0, &config, None,
            &mut rng, &mut bus,
        );

        let state = world.get::<WorkerState>(worker).unwrap();
        assert_eq!(state.build_target, Some((BuildingKindTag::Barracks, 4.0, 4.0)));
        assert!(!build_mode.active);
    }
}
