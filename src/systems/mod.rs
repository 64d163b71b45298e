//! ECS Systems for the skirmish simulation.
//!
//! Systems contain the game logic that operates on components. Unlike the
//! teacher's parallel-group scheduling, this simulation's systems form one
//! fixed sequential pipeline per tick -- each stage reads state the
//! previous stage just wrote, so there is nothing to parallelize without
//! breaking determinism (spec.md §2, §9):
//!
//! 1. `spatial::spatial_grid_update_system` -- rebuild the neighbor grid
//!    from this tick's starting positions.
//! 2. `movement::movement_system` -- path-following, arrival, unstick.
//! 3. `combat::combat_system` -- target acquisition, attack, death.
//! 4. `resources::resource_system` -- worker gather/deliver state machine.
//! 5. `production::production_system` -- queue progress and unit spawn.
//! 6. `building::building_system` -- worker-driven construction.
//! 7. `fog::fog_system` -- per-team visibility grid update.
//! 8. `ai::ai_system` -- opponent FSM decisions.
//! 9. `victory::victory_system` -- base-destruction win check.
//! 10. `cleanup::despawn_dead_system` -- reclaim entities killed this tick
//!     (spec.md §3: removal completes once the tick that observed it does).
//!
//! `SimWorld::with_config` (in `api.rs`) assembles this chain into a single
//! `Schedule` in exactly this order.

pub mod ai;
pub mod building;
pub mod cleanup;
pub mod combat;
pub mod movement;
pub mod production;
pub mod resources;
pub mod victory;

pub use ai::*;
pub use building::*;
pub use cleanup::*;
pub use combat::*;
pub use movement::*;
pub use production::*;
pub use resources::*;
pub use victory::*;
