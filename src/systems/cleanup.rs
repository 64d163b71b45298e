//! End-of-tick entity removal.
//!
//! Grounded on spec.md §3's entity lifetime note ("removed when `alive`
//! becomes false and the tick in which the removal is observed completes")
//! and `original_source/full/core/world.py::World.update`, which filters
//! `self.entities` down to living ones at the end of its own tick method.
//! Every other system in this pipeline reads `Health::is_alive` rather than
//! entity presence, so dead entities are inert long before this system runs
//! -- this just reclaims them so the ECS tables (and any snapshot taken
//! between ticks) don't accumulate corpses forever.

use crate::components::Health;
use bevy_ecs::prelude::*;

pub fn despawn_dead_system(mut commands: Commands, dead: Query<(Entity, &Health)>) {
    for (entity, health) in dead.iter() {
        if !health.is_alive() {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::*;

    fn build_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(despawn_dead_system);
        schedule
    }

    #[test]
    fn test_dead_entity_is_despawned() {
        let mut world = World::new();
        let alive = world.spawn(SoldierBundle::new(1, Team::Player, 0.0, 0.0)).id();
        let dead = world.spawn(SoldierBundle::new(2, Team::Ai, 1.0, 0.0)).id();
        world.get_mut::<Health>(dead).unwrap().current = 0.0;

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        assert!(world.get_entity(alive).is_ok());
        assert!(world.get_entity(dead).is_err());
    }

    #[test]
    fn test_living_entities_are_left_alone() {
        let mut world = World::new();
        let a = world.spawn(WorkerBundle::new(1, Team::Player, 0.0, 0.0)).id();
        let b = world.spawn(MineralPatchBundle::new(2, 5.0, 5.0, 1500)).id();

        let mut schedule = build_schedule();
        schedule.run(&mut world);

        assert!(world.get_entity(a).is_ok());
        assert!(world.get_entity(b).is_ok());
    }
}
