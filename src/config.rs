//! Centralized simulation tuning constants.
//!
//! Generalized from `systems/performance.rs::SimConfig`: one `Resource` with
//! named fields instead of magic numbers scattered through system bodies.
//! `UnitKindTag::stats()`/`BuildingKindTag::stats()` below are the built-in
//! defaults for the original's `UNIT_STATS`/`BUILDING_STATS` JSON lookups;
//! `stats.rs` loads the real `units.json`/`buildings.json` equivalents and
//! seeds its tables from these same defaults, so a simulation that never
//! loads a stat file behaves exactly as if the numbers below were the only
//! ones that existed.

use crate::components::{BuildingKindTag, UnitKindTag};
use bevy_ecs::prelude::*;

/// Stats for a single unit kind.
#[derive(Debug, Clone, Copy)]
pub struct UnitStats {
    pub cost: u32,
    pub build_time: f32,
    pub hp: f32,
    pub speed: f32,
    pub vision: f32,
    pub carry_capacity: u32,
    pub damage: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
}

/// Stats for a single building kind.
#[derive(Debug, Clone, Copy)]
pub struct BuildingStats {
    pub cost: u32,
    pub build_time: f32,
    pub hp: f32,
    pub vision: f32,
}

impl UnitKindTag {
    pub fn stats(self) -> UnitStats {
        match self {
            UnitKindTag::Worker => UnitStats {
                cost: 50,
                build_time: 8.0,
                hp: 30.0,
                speed: 3.0,
                vision: 6.0,
                carry_capacity: 10,
                damage: 0.0,
                attack_range: 0.0,
                attack_cooldown: 0.0,
            },
            UnitKindTag::Soldier => UnitStats {
                cost: 75,
                build_time: 10.0,
                hp: 50.0,
                speed: 2.5,
                vision: 8.0,
                carry_capacity: 0,
                damage: 10.0,
                attack_range: 5.0,
                attack_cooldown: 1.0,
            },
        }
    }
}

impl BuildingKindTag {
    pub fn stats(self) -> BuildingStats {
        match self {
            // Bases are placed directly by scenario loading, never queued for
            // construction, so cost/build_time are unused but kept at 0.
            BuildingKindTag::Base => BuildingStats {
                cost: 0,
                build_time: 0.0,
                hp: 500.0,
                vision: 10.0,
            },
            BuildingKindTag::Barracks => BuildingStats {
                cost: 150,
                build_time: 15.0,
                hp: 300.0,
                vision: 6.0,
            },
        }
    }
}

/// Global simulation tuning.
#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Fixed timestep in seconds (30 Hz per spec.md §2).
    pub fixed_timestep: f32,

    // --- Movement / pathfinding (systems.py::MovementSystem) ---
    pub stuck_threshold: f32,
    pub stuck_move_distance: f32,
    pub arrival_threshold: f32,
    pub unstick_search_radius: i32,

    // --- Resources (systems.py::ResourceSystem) ---
    pub gather_time: f32,
    pub gather_amount: u32,
    /// Squared-distance threshold for "close enough to mineral patch to
    /// start gathering". spec.md §4.5 states this as "within 1.5 tiles"
    /// literally (linear), which is 1.5² = 2.25 squared -- the Python
    /// source actually compares squared distance against the literal value
    /// 1.5 (i.e. ~1.22 tiles linear). spec.md is authoritative where it
    /// is explicit, so this crate follows the prose: 2.25.
    pub mineral_arrival_dist_sq: f32,
    /// Squared-distance threshold for "close enough to base to deliver",
    /// matching spec.md's "within √2 tiles of own base" exactly.
    pub base_arrival_dist_sq: f32,

    // --- Production (systems.py::ProductionSystem) ---
    pub production_queue_cap: usize,

    // --- Building placement (systems.py::BuildingPlacementSystem) ---
    pub build_move_threshold: f32,
    pub build_occupancy_dist_sq: f32,
    pub mineral_warning_cooldown: f32,

    // --- Combat (systems.py::CombatSystem) ---
    pub base_under_attack_cooldown: f32,

    // --- Fog of war (world.py::FogOfWar) ---
    pub default_vision: f32,

    // --- Selection (selection.py::SelectionManager) ---
    pub drag_threshold: f32,
    /// Squared-distance threshold for "click landed near enough to a
    /// mineral patch to gather it" (main.py::Game.handle_click, 1.5²).
    pub click_mineral_dist_sq: f32,

    // --- AI (systems.py::AISystem) ---
    pub ai_action_cooldown: f32,
    pub ai_min_workers: usize,
    pub ai_target_workers: usize,
    pub ai_military_minerals_threshold: u32,
    pub ai_target_army_size: usize,
    /// Recorded in `entities.py`'s counterpart but not actually read by any
    /// `_do_*` state handler in the source; kept for parity, unused here too.
    pub ai_attack_army_size: usize,
    pub ai_barracks_build_attempts: u32,
    pub ai_barracks_build_radius: f32,
    pub ai_barracks_occupancy_dist_sq: f32,
    pub ai_barracks_production_cap_army_build: usize,
    pub ai_barracks_production_cap_scouting: usize,
    pub ai_scout_waypoint_count: u32,
    pub ai_reassignment_interval: f32,
    pub ai_reassignment_vision_multiplier: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0,

            stuck_threshold: 16.0,
            stuck_move_distance: 0.3,
            arrival_threshold: 0.5,
            unstick_search_radius: 5,

            gather_time: 2.0,
            gather_amount: 8,
            mineral_arrival_dist_sq: 2.25,
            base_arrival_dist_sq: 2.0,

            production_queue_cap: 5,

            build_move_threshold: 2.0,
            build_occupancy_dist_sq: 2.0,
            mineral_warning_cooldown: 10.0,

            base_under_attack_cooldown: 10.0,

            default_vision: 5.0,

            drag_threshold: 0.5,
            click_mineral_dist_sq: 2.25,

            ai_action_cooldown: 2.0,
            ai_min_workers: 4,
            ai_target_workers: 12,
            ai_military_minerals_threshold: 150,
            ai_target_army_size: 3,
            ai_attack_army_size: 5,
            ai_barracks_build_attempts: 20,
            ai_barracks_build_radius: 6.0,
            ai_barracks_occupancy_dist_sq: 4.0,
            ai_barracks_production_cap_army_build: 3,
            ai_barracks_production_cap_scouting: 2,
            ai_scout_waypoint_count: 12,
            ai_reassignment_interval: 16.0,
            ai_reassignment_vision_multiplier: 3.0,
        }
    }
}

/// Starting mineral stockpile per team, absent an explicit scenario value.
/// `world.py::World.__init__` defaults to 100; `load_scenario` then
/// overwrites it with the scenario's own `starting_minerals` (itself
/// defaulting to 50 when the scenario JSON omits the field). Both numbers
/// are real defaults at different layers, so both are kept here.
pub const WORLD_DEFAULT_STARTING_MINERALS: u32 = 100;
pub const SCENARIO_DEFAULT_STARTING_MINERALS: u32 = 50;
