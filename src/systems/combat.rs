//! Soldier combat: target acquisition, attack-or-chase, and death reporting.
//!
//! Grounded on `original_source/full/core/systems.py::CombatSystem`. Written
//! as an exclusive system (`fn(&mut World)`) rather than a typed `Query`
//! tuple because a soldier's target can be any other living entity
//! (worker, soldier, or building), which a single non-conflicting `Query`
//! can't express when the attacker itself must also be read mutably.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EntityKind, EventQueue, GameEvent};
use crate::spatial::SpatialGrid;
use crate::systems::movement::DeltaTime;
use crate::world::GameTime;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

pub fn combat_system(world: &mut World) {
    let dt = world.get_resource::<DeltaTime>().map(|d| d.0).unwrap_or(0.0);
    let game_time = world.get_resource::<GameTime>().map(|t| t.0).unwrap_or(0.0);
    let base_cooldown = world
        .get_resource::<SimConfig>()
        .map(|c| c.base_under_attack_cooldown)
        .unwrap_or(10.0);

    let id_to_entity: HashMap<u32, Entity> = {
        let mut q = world.query::<(Entity, &EntityId)>();
        q.iter(world).map(|(e, id)| (id.0, e)).collect()
    };

    let attackers: Vec<Entity> = {
        let mut q = world.query_filtered::<Entity, With<SoldierCombat>>();
        q.iter(world).collect()
    };

    let mut attack_events = Vec::new();
    let mut base_alerts = Vec::new();
    let mut deaths = Vec::new();

    for attacker in attackers {
        let alive = world.get::<Health>(attacker).map(|h| h.is_alive()).unwrap_or(false);
        if !alive {
            continue;
        }
        let attacker_id = *world.get::<EntityId>(attacker).unwrap();
        let team = *world.get::<Team>(attacker).unwrap();
        let pos = *world.get::<Position>(attacker).unwrap();

        if let Some(mut combat) = world.get_mut::<SoldierCombat>(attacker) {
            if combat.cooldown_remaining > 0.0 {
                combat.cooldown_remaining -= dt;
            }
        }

        let (attack_range, attack_cooldown, mut target) = {
            let combat = world.get::<SoldierCombat>(attacker).unwrap();
            (combat.attack_range, combat.attack_cooldown, combat.target)
        };

        if target.is_none() {
            if let Some(grid) = world.get_resource::<SpatialGrid>() {
                if let Some(nearest) = grid.nearest_enemy(pos.x, pos.y, attack_range * 2.0, team.as_u8()) {
                    if let Some(nearest_id) = world.get::<EntityId>(nearest.entity) {
                        target = Some(*nearest_id);
                        if let Some(mut combat) = world.get_mut::<SoldierCombat>(attacker) {
                            combat.target = target;
                        }
                    }
                }
            }
        }

        let Some(target_id) = target else { continue };
        let Some(&target_entity) = id_to_entity.get(&target_id.0) else {
            if let Some(mut combat) = world.get_mut::<SoldierCombat>(attacker) {
                combat.target = None;
            }
            continue;
        };
        let target_alive = world.get::<Health>(target_entity).map(|h| h.is_alive()).unwrap_or(false);
        if !target_alive {
            if let Some(mut combat) = world.get_mut::<SoldierCombat>(attacker) {
                combat.target = None;
            }
            continue;
        }

        let target_pos = *world.get::<Position>(target_entity).unwrap();
        let dx = target_pos.x - pos.x;
        let dy = target_pos.y - pos.y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist <= attack_range {
            if let Some(mut dest) = world.get_mut::<Destination>(attacker) {
                dest.0 = None;
            }
            if let Some(mut path) = world.get_mut::<PathState>(attacker) {
                path.waypoints.clear();
            }

            let cooldown_ready = world.get::<SoldierCombat>(attacker).unwrap().cooldown_remaining <= 0.0;
            if cooldown_ready {
                let damage = world.get::<SoldierCombat>(attacker).unwrap().damage;
                let hp_after = {
                    let mut health = world.get_mut::<Health>(target_entity).unwrap();
                    health.damage(damage);
                    health.current
                };
                if let Some(mut combat) = world.get_mut::<SoldierCombat>(attacker) {
                    combat.cooldown_remaining = attack_cooldown;
                }

                attack_events.push(GameEvent::Attack {
                    attacker_id,
                    target_id,
                    damage,
                    target_hp_remaining: hp_after,
                });

                if world.get::<BuildingKindTag>(target_entity) == Some(&BuildingKindTag::Base) {
                    let target_team = *world.get::<Team>(target_entity).unwrap();
                    if let Some(mut cooldown) = world.get_mut::<UnderAttackCooldown>(target_entity) {
                        if game_time - cooldown.0 >= base_cooldown {
                            cooldown.0 = game_time;
                            base_alerts.push(GameEvent::BaseUnderAttack {
                                base_id: target_id,
                                team: target_team,
                                attacker_id,
                            });
                        }
                    }
                }

                if hp_after <= 0.0 {
                    let target_team = *world.get::<Team>(target_entity).unwrap();
                    let kind = if let Some(u) = world.get::<UnitKindTag>(target_entity) {
                        EntityKind::Unit(*u)
                    } else if let Some(b) = world.get::<BuildingKindTag>(target_entity) {
                        EntityKind::Building(*b)
                    } else {
                        continue;
                    };
                    deaths.push((target_id, kind, target_team, (target_pos.x, target_pos.y), Some(attacker_id)));
                }
            }
        } else if let Some(mut dest) = world.get_mut::<Destination>(attacker) {
            dest.0 = Some((target_pos.x, target_pos.y));
        }
    }

    if let Some(mut queue) = world.get_resource_mut::<EventQueue>() {
        for event in attack_events {
            queue.push(event);
        }
        for event in base_alerts {
            queue.push(event);
        }
        for (entity_id, kind, team, pos, killer_id) in deaths {
            queue.push(GameEvent::Death { entity_id, kind, team, pos, killer_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameEvent;
    use crate::spatial::spatial_grid_update_system;

    fn build_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems((spatial_grid_update_system, combat_system).chain());
        schedule
    }

    #[test]
    fn test_soldier_attacks_enemy_in_range() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(GameTime(0.0));
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialGrid::new(5.0));
        world.insert_resource(EventQueue::default());

        let attacker = world.spawn(SoldierBundle::new(1, Team::Player, 0.0, 0.0)).id();
        let _defender = world.spawn(SoldierBundle::new(2, Team::Ai, 1.0, 0.0)).id();

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let combat = world.get::<SoldierCombat>(attacker).unwrap();
        assert_eq!(combat.target, Some(EntityId(2)));
        assert!(combat.cooldown_remaining > 0.0);
    }

    #[test]
    fn test_out_of_range_soldier_moves_toward_target() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(GameTime(0.0));
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialGrid::new(5.0));
        world.insert_resource(EventQueue::default());

        let attacker = world.spawn(SoldierBundle::new(1, Team::Player, 0.0, 0.0)).id();
        world.spawn(SoldierBundle::new(2, Team::Ai, 9.0, 0.0));

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let dest = world.get::<Destination>(attacker).unwrap();
        assert_eq!(dest.0, Some((9.0, 0.0)));
    }

    #[test]
    fn test_lethal_hit_queues_death_event() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(GameTime(0.0));
        world.insert_resource(SimConfig::default());
        world.insert_resource(SpatialGrid::new(5.0));
        world.insert_resource(EventQueue::default());

        world.spawn(SoldierBundle::new(1, Team::Player, 0.0, 0.0));
        let defender = world.spawn(SoldierBundle::new(2, Team::Ai, 1.0, 0.0)).id();
        world.get_mut::<Health>(defender).unwrap().current = 1.0;

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let mut queue = world.remove_resource::<EventQueue>().unwrap();
        let mut bus = crate::events::EventBus::new();
        let death_count = std::sync::Arc::new(std::sync::Mutex::new(0));
        let counter = death_count.clone();
        bus.subscribe(move |e| {
            if matches!(e, GameEvent::Death { .. }) {
                *counter.lock().unwrap() += 1;
            }
        });
        queue.drain_into(&mut bus);
        assert_eq!(*death_count.lock().unwrap(), 1);
    }
}
