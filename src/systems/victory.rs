//! Base-destruction victory check.
//!
//! Grounded on `original_source/full/core/world.py::World.check_victory`:
//! a team loses the moment its `Base` is gone or dead, and the result
//! latches -- `game_over_time` (here `GameOverState::time`) is only ever
//! set on the tick victory first triggers.

use crate::components::{BuildingKindTag, Health, Team};
use crate::world::{GameOverState, GameTime};
use bevy_ecs::prelude::*;

pub fn victory_system(
    mut state: ResMut<GameOverState>,
    time: Res<GameTime>,
    buildings: Query<(&Team, &BuildingKindTag, &Health)>,
) {
    let team1_base_alive = buildings
        .iter()
        .any(|(team, kind, health)| *team == Team::Player && *kind == BuildingKindTag::Base && health.is_alive());
    let team2_base_alive = buildings
        .iter()
        .any(|(team, kind, health)| *team == Team::Ai && *kind == BuildingKindTag::Base && health.is_alive());

    let winner = if !team1_base_alive {
        Some(Team::Ai)
    } else if !team2_base_alive {
        Some(Team::Player)
    } else {
        None
    };

    if let Some(winner) = winner {
        if !state.over {
            state.time = Some(time.0);
        }
        state.over = true;
        state.winner = Some(winner);
    }
}
