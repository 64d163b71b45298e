//! Worker resource gathering: the idle/moving/gathering/returning loop.
//!
//! Grounded on `original_source/full/core/systems.py::ResourceSystem`.
//! Written as an exclusive system because a worker's gather target and its
//! own team's base are two different entities that both need to be read
//! (and the target's `MineralPatch` mutated) per worker, which a single
//! `Query` can't express without aliasing.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventQueue, GameEvent};
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

pub fn resource_system(world: &mut World) {
    let dt = world.get_resource::<DeltaTime>().map(|d| d.0).unwrap_or(0.0);
    let (gather_time, gather_amount, mineral_dist_sq, base_dist_sq) = {
        let config = world.get_resource::<SimConfig>().unwrap();
        (config.gather_time, config.gather_amount, config.mineral_arrival_dist_sq, config.base_arrival_dist_sq)
    };

    let base_by_team: HashMap<u8, (EntityId, Position)> = {
        let mut q = world.query::<(&EntityId, &Team, &Position, &BuildingKindTag, &Health)>();
        q.iter(world)
            .filter(|(_, _, _, kind, health)| **kind == BuildingKindTag::Base && health.is_alive())
            .map(|(id, team, pos, _, _)| (team.as_u8(), (*id, *pos)))
            .collect()
    };

    let id_to_entity: HashMap<u32, Entity> = {
        let mut q = world.query::<(Entity, &EntityId)>();
        q.iter(world).map(|(e, id)| (id.0, e)).collect()
    };

    let workers: Vec<Entity> = {
        let mut q = world.query_filtered::<Entity, With<WorkerState>>();
        q.iter(world).collect()
    };

    let mut events = Vec::new();

    for worker in workers {
        let alive = world.get::<Health>(worker).map(|h| h.is_alive()).unwrap_or(false);
        if !alive {
            continue;
        }
        let worker_id = *world.get::<EntityId>(worker).unwrap();
        let team = *world.get::<Team>(worker).unwrap();
        let Some(&(_base_id, base_pos)) = base_by_team.get(&team.as_u8()) else {
            continue;
        };
        let pos = *world.get::<Position>(worker).unwrap();

        let activity = world.get::<WorkerState>(worker).unwrap().activity;
        match activity {
            WorkerActivity::Idle => {
                let state = world.get::<WorkerState>(worker).unwrap();
                let has_target = state.gather_target.is_some();
                let carrying = state.carrying;
                if has_target {
                    let target_pos = state
                        .gather_target
                        .and_then(|id| id_to_entity.get(&id.0))
                        .and_then(|&e| world.get::<Position>(e))
                        .copied();
                    if let Some(target_pos) = target_pos {
                        let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                        state.activity = WorkerActivity::MovingToMineral;
                        drop(state);
                        world.get_mut::<Destination>(worker).unwrap().0 = Some((target_pos.x, target_pos.y));
                    }
                } else if carrying > 0 {
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.activity = WorkerActivity::Returning;
                    drop(state);
                    world.get_mut::<Destination>(worker).unwrap().0 = Some((base_pos.x, base_pos.y));
                }
            }

            WorkerActivity::MovingToMineral => {
                let gather_target = world.get::<WorkerState>(worker).unwrap().gather_target;
                let Some(target_id) = gather_target else {
                    world.get_mut::<WorkerState>(worker).unwrap().activity = WorkerActivity::Idle;
                    continue;
                };
                let Some(&target_entity) = id_to_entity.get(&target_id.0) else {
                    world.get_mut::<WorkerState>(worker).unwrap().activity = WorkerActivity::Idle;
                    continue;
                };
                let patch = world.get::<MineralPatch>(target_entity).copied();
                let Some(patch) = patch else {
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.gather_target = None;
                    state.activity = WorkerActivity::Idle;
                    continue;
                };
                if patch.depleted() {
                    let mine_pos = *world.get::<Position>(target_entity).unwrap();
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.gather_target = None;
                    state.activity = WorkerActivity::Idle;
                    drop(state);
                    world.get_mut::<Destination>(worker).unwrap().0 = None;
                    events.push(GameEvent::MineDepleted {
                        worker_id,
                        team,
                        mine_pos: (mine_pos.x, mine_pos.y),
                    });
                    continue;
                }

                let target_pos = *world.get::<Position>(target_entity).unwrap();
                let dx = target_pos.x - pos.x;
                let dy = target_pos.y - pos.y;
                if dx * dx + dy * dy < mineral_dist_sq {
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.activity = WorkerActivity::Gathering;
                    state.gather_timer = 0.0;
                    drop(state);
                    world.get_mut::<Destination>(worker).unwrap().0 = None;
                    events.push(GameEvent::GatheringStarted { worker_id, team });
                }
            }

            WorkerActivity::Gathering => {
                let gather_target = world.get::<WorkerState>(worker).unwrap().gather_target;
                let Some(target_id) = gather_target else {
                    world.get_mut::<WorkerState>(worker).unwrap().activity = WorkerActivity::Idle;
                    continue;
                };
                let Some(&target_entity) = id_to_entity.get(&target_id.0) else {
                    world.get_mut::<WorkerState>(worker).unwrap().activity = WorkerActivity::Idle;
                    continue;
                };
                let patch = world.get::<MineralPatch>(target_entity).copied();
                let Some(patch) = patch else {
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.gather_target = None;
                    state.activity = WorkerActivity::Idle;
                    continue;
                };
                if patch.depleted() {
                    let mine_pos = *world.get::<Position>(target_entity).unwrap();
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.gather_target = None;
                    state.activity = WorkerActivity::Idle;
                    events.push(GameEvent::MineDepleted {
                        worker_id,
                        team,
                        mine_pos: (mine_pos.x, mine_pos.y),
                    });
                    continue;
                }

                let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                state.gather_timer += dt;
                if state.gather_timer >= gather_time {
                    drop(state);
                    let amount = gather_amount.min(patch.minerals);
                    {
                        let mut patch_mut = world.get_mut::<MineralPatch>(target_entity).unwrap();
                        patch_mut.minerals -= amount;
                    }
                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.carrying = amount;
                    state.activity = WorkerActivity::Returning;
                    drop(state);
                    world.get_mut::<Destination>(worker).unwrap().0 = Some((base_pos.x, base_pos.y));
                }
            }

            WorkerActivity::Returning => {
                let dx = base_pos.x - pos.x;
                let dy = base_pos.y - pos.y;
                if dx * dx + dy * dy < base_dist_sq {
                    let carrying = world.get::<WorkerState>(worker).unwrap().carrying;
                    let team_total = {
                        let mut minerals = world.get_resource_mut::<crate::world::TeamMinerals>().unwrap();
                        minerals.add(team, carrying);
                        minerals.get(team)
                    };

                    events.push(GameEvent::ResourceCollected {
                        worker_id,
                        team,
                        amount: carrying,
                        team_total,
                    });

                    let gather_target = world.get::<WorkerState>(worker).unwrap().gather_target;
                    let still_valid = gather_target
                        .and_then(|id| id_to_entity.get(&id.0))
                        .and_then(|&e| world.get::<MineralPatch>(e))
                        .map(|p| !p.depleted())
                        .unwrap_or(false);

                    let mut state = world.get_mut::<WorkerState>(worker).unwrap();
                    state.carrying = 0;
                    if still_valid {
                        state.activity = WorkerActivity::MovingToMineral;
                        let target_id = state.gather_target.unwrap();
                        drop(state);
                        if let Some(&target_entity) = id_to_entity.get(&target_id.0) {
                            let target_pos = *world.get::<Position>(target_entity).unwrap();
                            world.get_mut::<Destination>(worker).unwrap().0 = Some((target_pos.x, target_pos.y));
                        }
                    } else {
                        let had_target = state.gather_target.take();
                        state.activity = WorkerActivity::Idle;
                        drop(state);
                        if let Some(target_id) = had_target {
                            if let Some(&target_entity) = id_to_entity.get(&target_id.0) {
                                let mine_pos = *world.get::<Position>(target_entity).unwrap();
                                events.push(GameEvent::MineDepleted {
                                    worker_id,
                                    team,
                                    mine_pos: (mine_pos.x, mine_pos.y),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    if let Some(mut queue) = world.get_resource_mut::<EventQueue>() {
        for event in events {
            queue.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::TeamMinerals;

    fn build_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(resource_system);
        schedule
    }

    #[test]
    fn test_idle_worker_with_target_moves_to_mineral() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(TeamMinerals::default());

        world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0));
        let mineral = world.spawn(MineralPatchBundle::new(2, 5.0, 0.0, 1500)).id();
        let worker = world.spawn(WorkerBundle::new(3, Team::Player, 1.0, 0.0)).id();
        world.get_mut::<WorkerState>(worker).unwrap().gather_target = Some(*world.get::<EntityId>(mineral).unwrap());

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let state = world.get::<WorkerState>(worker).unwrap();
        assert_eq!(state.activity, WorkerActivity::MovingToMineral);
        assert_eq!(world.get::<Destination>(worker).unwrap().0, Some((5.0, 0.0)));
    }

    #[test]
    fn test_worker_starts_gathering_near_mineral() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(TeamMinerals::default());

        world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0));
        let mineral = world.spawn(MineralPatchBundle::new(2, 1.2, 0.0, 1500)).id();
        let worker = world.spawn(WorkerBundle::new(3, Team::Player, 1.0, 0.0)).id();
        let mid = *world.get::<EntityId>(mineral).unwrap();
        {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.gather_target = Some(mid);
            state.activity = WorkerActivity::MovingToMineral;
        }

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        assert_eq!(world.get::<WorkerState>(worker).unwrap().activity, WorkerActivity::Gathering);
    }

    #[test]
    fn test_gathering_completes_and_delivers_minerals() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(2.5));
        world.insert_resource(SimConfig::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(TeamMinerals::default());

        world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0));
        let mineral = world.spawn(MineralPatchBundle::new(2, 0.5, 0.0, 1500)).id();
        let worker = world.spawn(WorkerBundle::new(3, Team::Player, 0.5, 0.0)).id();
        let mid = *world.get::<EntityId>(mineral).unwrap();
        {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.gather_target = Some(mid);
            state.activity = WorkerActivity::Gathering;
        }

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let state = world.get::<WorkerState>(worker).unwrap();
        assert_eq!(state.activity, WorkerActivity::Returning);
        assert_eq!(state.carrying, 8);
    }

    #[test]
    fn test_depleted_mineral_fires_event_and_returns_to_idle() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(TeamMinerals::default());

        world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0));
        let mineral = world.spawn(MineralPatchBundle::new(2, 1.2, 0.0, 0)).id();
        let worker = world.spawn(WorkerBundle::new(3, Team::Player, 1.0, 0.0)).id();
        let mid = *world.get::<EntityId>(mineral).unwrap();
        {
            let mut state = world.get_mut::<WorkerState>(worker).unwrap();
            state.gather_target = Some(mid);
            state.activity = WorkerActivity::MovingToMineral;
        }

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let state = world.get::<WorkerState>(worker).unwrap();
        assert_eq!(state.activity, WorkerActivity::Idle);
        assert!(state.gather_target.is_none());
    }
}
