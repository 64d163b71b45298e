//! World-level resources and the serializable external snapshot.
//!
//! Grounded on `original_source/full/core/world.py::World` for the
//! resources a match needs beyond the ECS component tables (next-id
//! counter, per-team mineral totals, accumulated game time, victory
//! flags), retargeted from squads/destructibles to this crate's
//! units/buildings/minerals.

use crate::components::*;
use crate::fog::FogOfWar;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Monotonically increasing entity-id allocator (generalized from
/// `World.next_id`). IDs are never reused within a game.
#[derive(Resource)]
pub struct NextEntityId(u32);

impl NextEntityId {
    pub fn alloc(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

impl Default for NextEntityId {
    fn default() -> Self {
        Self(1)
    }
}

/// Per-team mineral stockpile (generalized from `World.team_minerals`).
#[derive(Resource, Debug, Clone, Copy)]
pub struct TeamMinerals {
    pub player: u32,
    pub ai: u32,
}

impl TeamMinerals {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Player => self.player,
            Team::Ai => self.ai,
        }
    }

    pub fn add(&mut self, team: Team, amount: u32) {
        match team {
            Team::Player => self.player += amount,
            Team::Ai => self.ai += amount,
        }
    }

    /// Spend `amount` from `team`'s stockpile. Returns `false` (no state
    /// change) if the stockpile is insufficient, matching
    /// `World.spend_minerals`.
    pub fn spend(&mut self, team: Team, amount: u32) -> bool {
        if self.get(team) < amount {
            return false;
        }
        match team {
            Team::Player => self.player -= amount,
            Team::Ai => self.ai -= amount,
        }
        true
    }
}

impl Default for TeamMinerals {
    fn default() -> Self {
        Self {
            player: crate::config::WORLD_DEFAULT_STARTING_MINERALS,
            ai: crate::config::WORLD_DEFAULT_STARTING_MINERALS,
        }
    }
}

/// Accumulated game time in seconds, advanced once per fixed tick.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct GameTime(pub f32);

/// Victory state (generalized from `World.game_over`/`winner`/`game_over_time`).
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct GameOverState {
    pub over: bool,
    pub winner: Option<Team>,
    pub time: Option<f32>,
}

/// Serializable view of a single unit for external consumers (renderer,
/// tests, scripted opponents) -- enough to act on without further world
/// queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub team: u8,
    pub kind: &'static str,
    pub x: f32,
    pub y: f32,
    pub facing: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub carrying: u32,
    pub carry_capacity: u32,
    pub worker_state: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: u32,
    pub team: u8,
    pub kind: &'static str,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub queue_len: usize,
    pub progress: f32,
    pub waiting_for_minerals: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub minerals: u32,
}

/// Complete simulation state snapshot for external consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f32,
    pub team_minerals: (u32, u32),
    pub units: Vec<UnitSnapshot>,
    pub buildings: Vec<BuildingSnapshot>,
    pub minerals: Vec<MineralSnapshot>,
    pub game_over: bool,
    pub winner: Option<u8>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let team_minerals = world
            .get_resource::<TeamMinerals>()
            .map(|m| (m.player, m.ai))
            .unwrap_or((0, 0));
        let over_state = world.get_resource::<GameOverState>().copied().unwrap_or_default();

        let mut units = Vec::new();
        {
            let mut query = world.query::<(
                &EntityId,
                &Team,
                &Position,
                &Facing,
                &Health,
                &UnitKindTag,
                Option<&WorkerState>,
            )>();
            for (id, team, pos, facing, health, kind, worker) in query.iter(world) {
                units.push(UnitSnapshot {
                    id: id.0,
                    team: team.as_u8(),
                    kind: match kind {
                        UnitKindTag::Worker => "Worker",
                        UnitKindTag::Soldier => "Soldier",
                    },
                    x: pos.x,
                    y: pos.y,
                    facing: facing.0,
                    hp: health.current,
                    hp_max: health.max,
                    carrying: worker.map(|w| w.carrying).unwrap_or(0),
                    carry_capacity: worker.map(|w| w.carry_capacity).unwrap_or(0),
                    worker_state: worker.map(|w| match w.activity {
                        WorkerActivity::Idle => "idle",
                        WorkerActivity::MovingToMineral => "moving_to_mineral",
                        WorkerActivity::Gathering => "gathering",
                        WorkerActivity::Returning => "returning",
                    }),
                });
            }
        }
        units.sort_by_key(|u| u.id);

        let mut buildings = Vec::new();
        {
            let mut query = world.query::<(
                &EntityId,
                &Team,
                &Position,
                &Health,
                &BuildingKindTag,
                &ProductionQueue,
            )>();
            for (id, team, pos, health, kind, queue) in query.iter(world) {
                buildings.push(BuildingSnapshot {
                    id: id.0,
                    team: team.as_u8(),
                    kind: match kind {
                        BuildingKindTag::Base => "Base",
                        BuildingKindTag::Barracks => "Barracks",
                    },
                    x: pos.x,
                    y: pos.y,
                    hp: health.current,
                    hp_max: health.max,
                    queue_len: queue.queue.len(),
                    progress: queue.progress,
                    waiting_for_minerals: queue.waiting_for_minerals,
                });
            }
        }
        buildings.sort_by_key(|b| b.id);

        let mut minerals = Vec::new();
        {
            let mut query = world.query::<(&EntityId, &Position, &MineralPatch)>();
            for (id, pos, patch) in query.iter(world) {
                minerals.push(MineralSnapshot {
                    id: id.0,
                    x: pos.x,
                    y: pos.y,
                    minerals: patch.minerals,
                });
            }
        }
        minerals.sort_by_key(|m| m.id);

        Self {
            tick,
            time,
            team_minerals,
            units,
            buildings,
            minerals,
            game_over: over_state.over,
            winner: over_state.winner.map(|w| w.as_u8()),
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Whether `team`'s living base is visible in its own fog -- a team always
/// sees its own base, so this should hold after every tick.
pub fn base_is_visible_to_own_team(world: &mut World, fog: &FogOfWar, team: Team) -> bool {
    let mut query = world.query::<(&Team, &Position, &BuildingKindTag, &Health)>();
    for (e_team, pos, kind, health) in query.iter(world) {
        if *e_team == team && *kind == BuildingKindTag::Base && health.is_alive() {
            return fog.is_visible_to(team, pos.x, pos.y);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_entity_id_starts_at_one_and_increments() {
        let mut alloc = NextEntityId::default();
        assert_eq!(alloc.alloc(), 1);
        assert_eq!(alloc.alloc(), 2);
        assert_eq!(alloc.alloc(), 3);
    }

    #[test]
    fn test_team_minerals_spend_insufficient_is_noop() {
        let mut minerals = TeamMinerals { player: 40, ai: 0 };
        assert!(!minerals.spend(Team::Player, 50));
        assert_eq!(minerals.player, 40);
        assert!(minerals.spend(Team::Player, 40));
        assert_eq!(minerals.player, 0);
    }

    #[test]
    fn test_snapshot_from_empty_world() {
        let mut world = World::new();
        world.insert_resource(TeamMinerals::default());
        world.insert_resource(GameOverState::default());
        let snapshot = Snapshot::from_world(&mut world, 0, 0.0);
        assert!(snapshot.units.is_empty());
        assert!(snapshot.buildings.is_empty());
        assert!(!snapshot.game_over);
    }
}
