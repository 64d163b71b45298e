//! Building production queues: spend-on-start, progress-to-completion, spawn.
//!
//! Grounded on `original_source/full/core/systems.py::ProductionSystem`.
//! Name/rank flavor text is ported from `effects.py::WORKER_NAMES` verbatim;
//! `SOLDIER_RANKS` there is a German-military rank ladder that reads as
//! scenario flavor rather than a mechanic, so it's replaced with a generic
//! rank ladder here instead of carried over untranslated.
//!
//! An unaffordable queue head only ever sets `waiting_for_minerals`; it does
//! not publish `InsufficientMinerals` itself -- that event is published once,
//! per request, from `command::request_production` (spec.md §4.6 step 2
//! says only "set `waiting_for_minerals` := true and skip").

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{EventQueue, GameEvent};
use crate::rng::Rng;
use crate::stats::UnitStatTable;
use crate::systems::movement::DeltaTime;
use crate::world::{NextEntityId, TeamMinerals};
use bevy_ecs::prelude::*;

const WORKER_NAMES: &[&str] = &[
    "Max", "Tom", "Ben", "Sam", "Joe", "Dan", "Jim", "Bob", "Tim", "Leo", "Jack", "Mike", "Nick",
    "Paul", "Rick", "Zack", "Finn", "Cole", "Luke", "Ryan", "Emma", "Anna", "Lisa", "Sara", "Kate",
    "Jane", "Amy", "Meg", "Eve", "Lily",
];

const SOLDIER_RANKS: &[&str] =
    &["Recruit", "Private", "Corporal", "Sergeant", "Lieutenant", "Captain", "Major", "Colonel"];

/// Flavor lines drawn alongside a rank for a newly trained soldier, ported
/// from `effects.py::SOLDIER_PHRASES` -- cosmetic only, never read back by
/// the simulation.
const SOLDIER_PHRASES: &[&str] = &[
    "Reporting for duty.",
    "Ready to fight.",
    "Orders, sir?",
    "Let's move out.",
    "At your command.",
    "Standing by.",
];

pub fn production_system(world: &mut World) {
    let dt = world.get_resource::<DeltaTime>().map(|d| d.0).unwrap_or(0.0);
    let stat_table = world.get_resource::<UnitStatTable>().cloned();

    let buildings: Vec<Entity> = {
        let mut q = world.query_filtered::<Entity, With<ProductionQueue>>();
        q.iter(world).collect()
    };

    let mut events = Vec::new();
    let mut spawned: Vec<(Entity, Team, f32, f32, UnitKindTag)> = Vec::new();

    for building in buildings {
        let alive = world.get::<Health>(building).map(|h| h.is_alive()).unwrap_or(false);
        if !alive {
            continue;
        }

        let has_work = !world.get::<ProductionQueue>(building).unwrap().queue.is_empty();
        if !has_work {
            world.get_mut::<ProductionQueue>(building).unwrap().waiting_for_minerals = false;
            continue;
        }

        let building_id = *world.get::<EntityId>(building).unwrap();
        let team = *world.get::<Team>(building).unwrap();
        let unit_type = world.get::<ProductionQueue>(building).unwrap().current().unwrap();
        let stats = stat_table.as_ref().map(|t| t.get(unit_type)).unwrap_or_else(|| unit_type.stats());

        let progress = world.get::<ProductionQueue>(building).unwrap().progress;
        if progress == 0.0 {
            let affordable = {
                let minerals = world.get_resource::<TeamMinerals>().unwrap();
                minerals.get(team) >= stats.cost
            };
            if !affordable {
                world.get_mut::<ProductionQueue>(building).unwrap().waiting_for_minerals = true;
                continue;
            }
            world.get_mut::<ProductionQueue>(building).unwrap().waiting_for_minerals = false;
            world.get_resource_mut::<TeamMinerals>().unwrap().spend(team, stats.cost);

            let queue_position = world.get::<ProductionQueue>(building).unwrap().queue.len();
            events.push(GameEvent::ProductionStarted { building_id, unit_type, team, queue_position });
        } else {
            world.get_mut::<ProductionQueue>(building).unwrap().waiting_for_minerals = false;
        }

        let mut queue = world.get_mut::<ProductionQueue>(building).unwrap();
        queue.progress += dt / stats.build_time;
        let complete = queue.progress >= 1.0;
        if complete {
            queue.queue.remove(0);
            queue.progress = 0.0;
        }
        drop(queue);

        if complete {
            let pos = *world.get::<Position>(building).unwrap();
            let offset_x = world.get_resource_mut::<Rng>().unwrap().gen_range_f32(-1.0, 1.0);
            spawned.push((building, team, pos.x + offset_x, pos.y + 2.0, unit_type));
        }
    }

    for (building, team, spawn_x, spawn_y, unit_type) in spawned {
        let new_id = world.get_resource_mut::<NextEntityId>().unwrap().alloc();
        let building_id = *world.get::<EntityId>(building).unwrap();
        let rally = world.get::<RallyPoint>(building).copied().unwrap_or_default();

        let new_stats = stat_table.as_ref().map(|t| t.get(unit_type)).unwrap_or_else(|| unit_type.stats());
        let new_entity = match unit_type {
            UnitKindTag::Worker => world.spawn(WorkerBundle::with_stats(new_id, team, spawn_x, spawn_y, new_stats)).id(),
            UnitKindTag::Soldier => world.spawn(SoldierBundle::with_stats(new_id, team, spawn_x, spawn_y, new_stats)).id(),
        };

        events.push(GameEvent::ProductionCompleted {
            building_id,
            unit_type,
            unit_id: EntityId(new_id),
            team,
            pos: (spawn_x, spawn_y),
        });

        let name = world.get_resource_mut::<Rng>().unwrap().choose(WORKER_NAMES).copied().unwrap_or("Unit").to_string();
        let (rank, phrase) = match unit_type {
            UnitKindTag::Soldier => {
                let rank = world.get_resource_mut::<Rng>().unwrap().choose(SOLDIER_RANKS).copied().map(|s| s.to_string());
                let phrase = world.get_resource_mut::<Rng>().unwrap().choose(SOLDIER_PHRASES).copied().map(|s| s.to_string());
                (rank, phrase)
            }
            UnitKindTag::Worker => (None, None),
        };
        events.push(GameEvent::UnitReady { unit_id: EntityId(new_id), unit_type, team, name, rank, phrase });

        if let Some(dest) = rally.0 {
            world.get_mut::<Destination>(new_entity).unwrap().0 = Some(dest);
        }

        if unit_type == UnitKindTag::Worker {
            let nearest = nearest_mineral(world, spawn_x, spawn_y);
            if let Some((mineral_id, mineral_pos)) = nearest {
                let mut state = world.get_mut::<WorkerState>(new_entity).unwrap();
                state.gather_target = Some(mineral_id);
                state.activity = WorkerActivity::MovingToMineral;
                drop(state);
                world.get_mut::<Destination>(new_entity).unwrap().0 = Some(mineral_pos);
            }
        }
    }

    if let Some(mut queue) = world.get_resource_mut::<EventQueue>() {
        for event in events {
            queue.push(event);
        }
    }
}

pub(crate) fn nearest_mineral(world: &mut World, x: f32, y: f32) -> Option<(EntityId, (f32, f32))> {
    let mut q = world.query::<(&EntityId, &Position, &MineralPatch)>();
    q.iter(world)
        .filter(|(_, _, patch)| !patch.depleted())
        .min_by(|(_, a, _), (_, b, _)| {
            let da = (a.x - x).powi(2) + (a.y - y).powi(2);
            let db = (b.x - x).powi(2) + (b.y - y).powi(2);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(id, pos, _)| (*id, (pos.x, pos.y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(production_system);
        schedule
    }

    fn setup() -> World {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(TeamMinerals { player: 1000, ai: 1000 });
        world.insert_resource(NextEntityId::default());
        world.insert_resource(Rng::new(7));
        world
    }

    #[test]
    fn test_insufficient_minerals_sets_waiting_flag() {
        let mut world = setup();
        world.insert_resource(TeamMinerals { player: 0, ai: 0 });
        let base = world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0)).id();
        world.get_mut::<ProductionQueue>(base).unwrap().push(UnitKindTag::Worker);

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        assert!(world.get::<ProductionQueue>(base).unwrap().waiting_for_minerals);
    }

    #[test]
    fn test_production_spends_minerals_on_start() {
        let mut world = setup();
        let base = world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0)).id();
        world.get_mut::<ProductionQueue>(base).unwrap().push(UnitKindTag::Worker);

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        let minerals = world.get_resource::<TeamMinerals>().unwrap();
        assert_eq!(minerals.player, 1000 - UnitKindTag::Worker.stats().cost);
    }

    #[test]
    fn test_completed_production_spawns_unit_and_drains_queue() {
        let mut world = setup();
        world.insert_resource(DeltaTime(100.0));
        let base = world.spawn(BaseBundle::new(1, Team::Player, 0.0, 0.0)).id();
        world.get_mut::<ProductionQueue>(base).unwrap().push(UnitKindTag::Worker);

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        assert!(world.get::<ProductionQueue>(base).unwrap().queue.is_empty());

        let mut q = world.query::<&UnitKindTag>();
        let unit_count = q.iter(&world).count();
        assert_eq!(unit_count, 1);
    }
}
