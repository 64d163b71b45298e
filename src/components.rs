//! ECS components for the skirmish simulation.
//!
//! Components are pure data; all logic lives in `systems`. Entity kinds are
//! modeled as tagged variants (a `Position`/`Health`/team on every entity,
//! plus a `UnitKindTag`/`BuildingKindTag` enum and kind-specific data
//! components) rather than an OOP class hierarchy -- see spec.md §9 and
//! `original_source/full/core/entities.py` for the shapes being generalized.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS (kept near-verbatim from the teacher)
// ============================================================================

/// 2D position on the battlefield (x = east/west, y = north/south).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_sq_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// 2D velocity vector, derived each tick from movement for snapshot purposes.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Facing angle in degrees (0 = east, 90 = north), updated as units move.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Facing(pub f32);

/// Vision radius in tiles, used by fog-of-war reveal and AI sighting checks.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vision(pub f32);

impl Default for Vision {
    fn default() -> Self {
        Self(5.0)
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable entity identifier, assigned once by the world's incrementing
/// counter (generalized from `SquadId`; also used to key minerals and
/// command targets, matching `world.py`'s single `next_id` counter).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Team/side identifier. Team 1 is the human player, team 2 is the AI
/// opponent, matching `world.py`'s integer team convention.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Player,
    Ai,
}

impl Team {
    pub fn as_u8(self) -> u8 {
        match self {
            Team::Player => 1,
            Team::Ai => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Team::Player),
            2 => Some(Team::Ai),
            _ => None,
        }
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Player => Team::Ai,
            Team::Ai => Team::Player,
        }
    }
}

impl Default for Team {
    fn default() -> Self {
        Team::Player
    }
}

// ============================================================================
// COMBAT / HEALTH (kept near-verbatim from the teacher)
// ============================================================================

/// Health of a unit or building.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

// ============================================================================
// UNIT COMPONENTS
// ============================================================================

/// Which kind of unit this entity is.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKindTag {
    Worker,
    Soldier,
}

/// Worker gather/build state machine (generalized from
/// `entities.py::Worker`). Per-entity timers replace the Python systems'
/// external `dict[entity_id, float]` bookkeeping -- storing them on the
/// entity itself is the more idiomatic `bevy_ecs` shape.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    pub activity: WorkerActivity,
    pub carrying: u32,
    pub carry_capacity: u32,
    /// Mineral patch this worker is gathering from.
    pub gather_target: Option<EntityId>,
    /// Building kind + world position of a pending construction order.
    pub build_target: Option<(BuildingKindTag, f32, f32)>,
    pub build_timer: f32,
    pub gather_timer: f32,
    pub waiting_for_minerals: bool,
    /// Rate limit for `WorkerWaitingForMineralsEvent` (10s per worker).
    pub mineral_warning_cooldown: f32,
    /// Set once `BuildingConstructionStartEvent` has fired for the current
    /// `build_target`, so it fires exactly once per construction attempt.
    pub construction_started: bool,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            activity: WorkerActivity::Idle,
            carrying: 0,
            carry_capacity: 10,
            gather_target: None,
            build_target: None,
            build_timer: 0.0,
            gather_timer: 0.0,
            waiting_for_minerals: false,
            mineral_warning_cooldown: 0.0,
            construction_started: false,
        }
    }
}

/// Worker gathering/building state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerActivity {
    Idle,
    MovingToMineral,
    Gathering,
    Returning,
}

/// Soldier combat state (generalized from `entities.py::Soldier`).
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct SoldierCombat {
    pub damage: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub cooldown_remaining: f32,
    pub target: Option<EntityId>,
}

/// Path-following waypoint queue, populated by the pathfinder.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathState {
    pub waypoints: Vec<(f32, f32)>,
}

/// Movement goal. `None` means no pending order.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Destination(pub Option<(f32, f32)>);

/// Stuck-detection watchdog (generalized from `MovementSystem`'s external
/// `_stuck_timers` dict).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StuckWatchdog {
    pub timer: f32,
    pub last_x: f32,
    pub last_y: f32,
    pub tracking: bool,
}

// ============================================================================
// BUILDING COMPONENTS
// ============================================================================

/// Which kind of building this entity is.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKindTag {
    Base,
    Barracks,
}

/// Bounded production queue (generalized from `entities.py::Building`,
/// `MAX_QUEUE_SIZE = 5`).
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    pub queue: Vec<UnitKindTag>,
    pub progress: f32,
    pub waiting_for_minerals: bool,
}

impl ProductionQueue {
    pub const MAX_QUEUE_SIZE: usize = 5;

    pub fn push(&mut self, kind: UnitKindTag) -> bool {
        if self.queue.len() >= Self::MAX_QUEUE_SIZE {
            return false;
        }
        self.queue.push(kind);
        true
    }

    pub fn current(&self) -> Option<UnitKindTag> {
        self.queue.first().copied()
    }
}

/// Optional rally point new units move to on spawn.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RallyPoint(pub Option<(f32, f32)>);

/// Per-base rate limit for `BaseUnderAttackEvent` (10s cooldown).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UnderAttackCooldown(pub f32);

// ============================================================================
// RESOURCE / WORLD ENTITIES
// ============================================================================

/// A mineral patch. Entities with this component are never units or
/// buildings; `World::get_entity_at` and friends treat them as a third kind.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MineralPatch {
    pub minerals: u32,
}

impl MineralPatch {
    pub fn depleted(&self) -> bool {
        self.minerals == 0
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a Worker entity.
#[derive(Bundle)]
pub struct WorkerBundle {
    pub id: EntityId,
    pub team: Team,
    pub position: Position,
    pub velocity: Velocity,
    pub facing: Facing,
    pub health: Health,
    pub vision: Vision,
    pub kind: UnitKindTag,
    pub state: WorkerState,
    pub path: PathState,
    pub destination: Destination,
    pub stuck: StuckWatchdog,
}

impl WorkerBundle {
    /// Spawn with the built-in default stats (`UnitKindTag::Worker.stats()`).
    pub fn new(id: u32, team: Team, x: f32, y: f32) -> Self {
        Self::with_stats(id, team, x, y, UnitKindTag::Worker.stats())
    }

    /// Spawn with explicit stats, e.g. from a loaded `crate::stats::UnitStatTable`.
    pub fn with_stats(id: u32, team: Team, x: f32, y: f32, stats: crate::config::UnitStats) -> Self {
        Self {
            id: EntityId(id),
            team,
            position: Position::new(x, y),
            velocity: Velocity::default(),
            facing: Facing::default(),
            health: Health::new(stats.hp),
            vision: Vision(stats.vision),
            kind: UnitKindTag::Worker,
            state: WorkerState {
                carry_capacity: stats.carry_capacity,
                ..Default::default()
            },
            path: PathState::default(),
            destination: Destination::default(),
            stuck: StuckWatchdog::default(),
        }
    }
}

/// Bundle for spawning a Soldier entity.
#[derive(Bundle)]
pub struct SoldierBundle {
    pub id: EntityId,
    pub team: Team,
    pub position: Position,
    pub velocity: Velocity,
    pub facing: Facing,
    pub health: Health,
    pub vision: Vision,
    pub kind: UnitKindTag,
    pub combat: SoldierCombat,
    pub path: PathState,
    pub destination: Destination,
    pub stuck: StuckWatchdog,
}

impl SoldierBundle {
    /// Spawn with the built-in default stats (`UnitKindTag::Soldier.stats()`).
    pub fn new(id: u32, team: Team, x: f32, y: f32) -> Self {
        Self::with_stats(id, team, x, y, UnitKindTag::Soldier.stats())
    }

    /// Spawn with explicit stats, e.g. from a loaded `crate::stats::UnitStatTable`.
    pub fn with_stats(id: u32, team: Team, x: f32, y: f32, stats: crate::config::UnitStats) -> Self {
        Self {
            id: EntityId(id),
            team,
            position: Position::new(x, y),
            velocity: Velocity::default(),
            facing: Facing::default(),
            health: Health::new(stats.hp),
            vision: Vision(stats.vision),
            kind: UnitKindTag::Soldier,
            combat: SoldierCombat {
                damage: stats.damage,
                attack_range: stats.attack_range,
                attack_cooldown: stats.attack_cooldown,
                cooldown_remaining: 0.0,
                target: None,
            },
            path: PathState::default(),
            destination: Destination::default(),
            stuck: StuckWatchdog::default(),
        }
    }
}

/// Bundle for spawning a Base entity.
#[derive(Bundle)]
pub struct BaseBundle {
    pub id: EntityId,
    pub team: Team,
    pub position: Position,
    pub health: Health,
    pub vision: Vision,
    pub kind: BuildingKindTag,
    pub queue: ProductionQueue,
    pub rally: RallyPoint,
    pub under_attack_cooldown: UnderAttackCooldown,
}

impl BaseBundle {
    /// Spawn with the built-in default stats (`BuildingKindTag::Base.stats()`).
    pub fn new(id: u32, team: Team, x: f32, y: f32) -> Self {
        Self::with_stats(id, team, x, y, BuildingKindTag::Base.stats())
    }

    /// Spawn with explicit stats, e.g. from a loaded `crate::stats::BuildingStatTable`.
    pub fn with_stats(id: u32, team: Team, x: f32, y: f32, stats: crate::config::BuildingStats) -> Self {
        Self {
            id: EntityId(id),
            team,
            position: Position::new(x, y),
            health: Health::new(stats.hp),
            vision: Vision(stats.vision),
            kind: BuildingKindTag::Base,
            queue: ProductionQueue::default(),
            rally: RallyPoint::default(),
            under_attack_cooldown: UnderAttackCooldown::default(),
        }
    }
}

/// Bundle for spawning a Barracks entity.
#[derive(Bundle)]
pub struct BarracksBundle {
    pub id: EntityId,
    pub team: Team,
    pub position: Position,
    pub health: Health,
    pub vision: Vision,
    pub kind: BuildingKindTag,
    pub queue: ProductionQueue,
    pub rally: RallyPoint,
    pub under_attack_cooldown: UnderAttackCooldown,
}

impl BarracksBundle {
    /// Spawn with the built-in default stats (`BuildingKindTag::Barracks.stats()`).
    pub fn new(id: u32, team: Team, x: f32, y: f32) -> Self {
        Self::with_stats(id, team, x, y, BuildingKindTag::Barracks.stats())
    }

    /// Spawn with explicit stats, e.g. from a loaded `crate::stats::BuildingStatTable`.
    pub fn with_stats(id: u32, team: Team, x: f32, y: f32, stats: crate::config::BuildingStats) -> Self {
        Self {
            id: EntityId(id),
            team,
            position: Position::new(x, y),
            health: Health::new(stats.hp),
            vision: Vision(stats.vision),
            kind: BuildingKindTag::Barracks,
            queue: ProductionQueue::default(),
            rally: RallyPoint::default(),
            under_attack_cooldown: UnderAttackCooldown::default(),
        }
    }
}

/// Bundle for spawning a mineral patch.
#[derive(Bundle)]
pub struct MineralPatchBundle {
    pub id: EntityId,
    pub position: Position,
    pub patch: MineralPatch,
}

impl MineralPatchBundle {
    pub fn new(id: u32, x: f32, y: f32, minerals: u32) -> Self {
        Self {
            id: EntityId(id),
            position: Position::new(x, y),
            patch: MineralPatch { minerals },
        }
    }
}
