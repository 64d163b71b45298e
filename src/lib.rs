//! Skirmish Sim - Deterministic RTS Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of a small two-team
//! real-time-strategy skirmish: workers gathering minerals, buildings
//! producing units, soldiers fighting, and a scripted opponent AI. Uses
//! `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod command;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod fog;
pub mod map;
pub mod pathfinding;
pub mod rng;
pub mod scenario;
pub mod selection;
pub mod spatial;
pub mod stats;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::SimConfig;
pub use error::ScenarioLoadError;
pub use events::{EventBus, EventQueue, GameEvent};
pub use fog::{FogOfWar, TeamFog, Visibility};
pub use map::{GameMap, Tile};
pub use rng::Rng;
pub use scenario::ScenarioFile;
pub use spatial::{SpatialEntry, SpatialGrid};
pub use stats::{BuildingStatTable, BuildingStatsFile, UnitStatTable, UnitStatsFile};
pub use systems::*;
pub use world::{GameOverState, GameTime, Snapshot, TeamMinerals};
