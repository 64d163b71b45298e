//! Public API: ties the ECS schedule, event bus, selection manager, and
//! command intake into a single `SimWorld` handle for an embedding host.
//!
//! Grounded on `api.rs::SimWorld::new`/`with_config`/`step`/`fixed_update` in
//! the teacher crate for the accumulator-with-`while`-loop shape; the
//! teacher's five parallelism-flavored system groups collapse here into the
//! spec's single strictly-sequential pipeline (spatial grid refresh →
//! movement → combat → resources → production → building placement → fog →
//! AI → victory check), since §5 rules out any "these groups can run in
//! parallel" framing for this simulation. See `systems/mod.rs` for the
//! per-stage breakdown.

use crate::command::{self, BuildMode};
use crate::components::*;
use crate::config::SimConfig;
use crate::error::ScenarioLoadError;
use crate::events::{EventBus, EventQueue, GameEvent};
use crate::fog::{fog_system, FogOfWar};
use crate::map::{GameMap, Tile};
use crate::rng::Rng;
use crate::scenario::{apply_scenario, ScenarioFile};
use crate::selection::SelectionManager;
use crate::spatial::{spatial_grid_update_system, SpatialGrid};
use crate::stats::{BuildingStatTable, BuildingStatsFile, UnitStatTable, UnitStatsFile};
use crate::systems::*;
use crate::world::{GameOverState, GameTime, NextEntityId, Snapshot, TeamMinerals};
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// Seed used when a caller doesn't supply one. A fixed constant rather than
/// a time-derived value, so `SimWorld::new()` alone already reproduces a
/// game given the same command stream (spec.md §5).
const DEFAULT_SEED: u64 = 0;

/// Default terrain used before a real map is loaded: large enough for a
/// scenario's bases and patches to fit, entirely walkable.
const DEFAULT_MAP_SIZE: usize = 80;

/// The simulation's world container: ECS `World` + fixed-step `Schedule`,
/// plus the command-layer state (`SelectionManager`, `BuildMode`) and the
/// event bus that decouple rule effects from the systems that produce them.
///
/// This is the crate's single entry point (spec.md §1: "the core exposes a
/// frame-advance interface and a command intake; the renderer and audio
/// attach as event subscribers").
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    bus: EventBus,
    selection: SelectionManager,
    build_mode: BuildMode,
    tick: u64,
    time: f32,
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a new simulation with default tuning and the default seed.
    pub fn new() -> Self {
        Self::with_config_and_seed(SimConfig::default(), DEFAULT_SEED)
    }

    /// Create a new simulation with custom tuning, default seed.
    pub fn with_config(config: SimConfig) -> Self {
        Self::with_config_and_seed(config, DEFAULT_SEED)
    }

    /// Create a new simulation with default tuning and an explicit seed, so
    /// a replay of the same command stream against the same seed reproduces
    /// a game (spec.md §5).
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config_and_seed(SimConfig::default(), seed)
    }

    /// Create a new simulation with custom tuning and an explicit seed.
    pub fn with_config_and_seed(config: SimConfig, seed: u64) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(GameTime::default());
        world.insert_resource(GameOverState::default());
        world.insert_resource(EventQueue::default());
        world.insert_resource(NextEntityId::default());
        world.insert_resource(TeamMinerals::default());
        world.insert_resource(Rng::new(seed));
        world.insert_resource(AiController::default());
        world.insert_resource(SpatialGrid::default());
        world.insert_resource(UnitStatTable::default());
        world.insert_resource(BuildingStatTable::default());

        let open_map = GameMap::new(
            DEFAULT_MAP_SIZE,
            DEFAULT_MAP_SIZE,
            vec![Tile::Grass; DEFAULT_MAP_SIZE * DEFAULT_MAP_SIZE],
            Vec::new(),
            Vec::new(),
        );
        world.insert_resource(FogOfWar::init(open_map.width, open_map.height));
        world.insert_resource(open_map);
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                spatial_grid_update_system,
                movement_system,
                combat_system,
                resource_system,
                production_system,
                building_system,
                fog_system,
                ai_system,
                victory_system,
                despawn_dead_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            bus: EventBus::new(),
            selection: SelectionManager::new(),
            build_mode: BuildMode::default(),
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    /// Replace the terrain grid, resizing both teams' fog to match. Any
    /// entity positions already in the world are left as-is; the caller is
    /// expected to load a map before a scenario, matching
    /// `World.load_map`/`load_scenario`'s call order.
    pub fn load_map(&mut self, csv_text: &str) -> Result<(), ScenarioLoadError> {
        let map = GameMap::from_csv(csv_text)?;
        self.world.insert_resource(FogOfWar::init(map.width, map.height));
        self.world.insert_resource(map);
        Ok(())
    }

    /// Spawn mineral patches, per-team bases, and starting workers from a
    /// scenario file, and set each team's starting mineral stockpile
    /// (overwriting, not adding to, whatever is currently banked --
    /// matches `World.load_scenario`'s plain assignment).
    pub fn load_scenario(&mut self, json_text: &str) -> Result<(), ScenarioLoadError> {
        let scenario = ScenarioFile::from_json(json_text)?;
        self.world.insert_resource(TeamMinerals { player: 0, ai: 0 });
        apply_scenario(&mut self.world, &scenario)
    }

    /// Overlay unit stats from a `units.json`-equivalent file onto the
    /// built-in defaults, by kind name (spec.md §6 "Unit/building data").
    /// Unknown kind names in the file are ignored.
    pub fn load_unit_stats(&mut self, json_text: &str) -> Result<(), ScenarioLoadError> {
        let file = UnitStatsFile::from_json(json_text)?;
        self.world.get_resource_mut::<UnitStatTable>().unwrap().apply(&file);
        Ok(())
    }

    /// Overlay building stats from a `buildings.json`-equivalent file onto
    /// the built-in defaults, by kind name.
    pub fn load_building_stats(&mut self, json_text: &str) -> Result<(), ScenarioLoadError> {
        let file = BuildingStatsFile::from_json(json_text)?;
        self.world.get_resource_mut::<BuildingStatTable>().unwrap().apply(&file);
        Ok(())
    }

    /// Advance simulated time by `dt` real seconds, running as many fixed
    /// `1 / fixed_timestep` ticks as the accumulator allows (spec.md §4.12).
    /// This is the crate's `advance_time(dt)` entry point (spec.md §6).
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self
            .world
            .get_resource::<SimConfig>()
            .map(|c| c.fixed_timestep)
            .unwrap_or(1.0 / 30.0);

        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Alias for [`Self::step`], named to match spec.md §6's command
    /// vocabulary (`advance_time(dt)`).
    pub fn advance_time(&mut self, dt: f32) {
        self.step(dt);
    }

    /// Run a single fixed tick: increment game time, and -- unless the game
    /// has already ended -- run the system pipeline, then drain this tick's
    /// events to the bus (spec.md §4.12).
    fn fixed_update(&mut self, dt: f32) {
        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }
        if let Some(mut time_res) = self.world.get_resource_mut::<GameTime>() {
            time_res.0 += dt;
        }
        self.time += dt;
        self.tick += 1;

        let over = self.world.get_resource::<GameOverState>().map(|s| s.over).unwrap_or(false);
        if over {
            return;
        }

        self.schedule.run(&mut self.world);

        let mut queue = self.world.remove_resource::<EventQueue>().unwrap_or_default();
        queue.drain_into(&mut self.bus);
        self.world.insert_resource(queue);
    }

    // ------------------------------------------------------------------
    // Command intake (spec.md §6, §4.9, §4.10)
    // ------------------------------------------------------------------

    /// Begin a drag-select gesture at world position `(wx, wy)`.
    pub fn drag_start(&mut self, wx: f32, wy: f32) {
        self.selection.start_drag(wx, wy);
    }

    /// Update the in-progress drag-select gesture's current pointer
    /// position.
    pub fn drag_update(&mut self, wx: f32, wy: f32) {
        self.selection.update_drag(wx, wy);
    }

    /// Whether the current pointer gesture has crossed the drag threshold
    /// (spec.md §4.9) -- callers use this to decide whether a mouse-up
    /// should become [`Self::drag_end`] (rectangle select) or
    /// [`Self::click`] (single click / command).
    pub fn is_dragging(&self) -> bool {
        self.selection.is_dragging()
    }

    /// End a drag-select gesture for `team`: select every living `team`
    /// unit (never buildings) inside the drag rectangle, replacing the
    /// current selection. Returns an empty set and clears drag state if the
    /// gesture never crossed the drag threshold.
    pub fn drag_end(&mut self, team: Team) -> HashSet<u32> {
        if !self.selection.is_dragging() {
            self.selection.cancel_drag();
            return HashSet::new();
        }

        let candidates: Vec<(EntityId, f32, f32)> = {
            let mut query = self
                .world
                .query::<(&EntityId, &Team, &Position, &Health, &UnitKindTag)>();
            query
                .iter(&self.world)
                .filter(|(_, t, _, health, _)| **t == team && health.is_alive())
                .map(|(id, _, pos, _, _)| (*id, pos.x, pos.y))
                .collect()
        };

        let result = self.selection.end_drag(&candidates);
        self.selection.selected_ids = result.clone();
        result
    }

    /// Dispatch a left-click at world position `(wx, wy)` on `team`'s
    /// behalf -- see `command::handle_click` for the full branch order.
    pub fn click(&mut self, team: Team, wx: f32, wy: f32) {
        let config = self.world.get_resource::<SimConfig>().cloned().unwrap_or_default();
        let map = self.world.get_resource::<GameMap>().cloned();
        let mut rng = self.world.remove_resource::<Rng>().unwrap_or_default();

        command::handle_click(
            &mut self.world,
            &mut self.selection,
            &mut self.build_mode,
            team,
            wx,
            wy,
            &config,
            map.as_ref(),
            &mut rng,
            &mut self.bus,
        );

        self.world.insert_resource(rng);
    }

    /// Arm build-placement mode for `kind`, targeting the first currently
    /// selected entity if (and only if) it is a living worker.
    pub fn start_build_mode(&mut self, kind: BuildingKindTag) {
        command::start_build_mode(&mut self.world, &self.selection, &mut self.build_mode, kind);
    }

    /// Whether build-placement mode is currently armed.
    pub fn is_build_mode_active(&self) -> bool {
        self.build_mode.active
    }

    /// Queue production on the first currently selected building.
    pub fn request_production(&mut self) {
        let minerals = self.world.get_resource::<TeamMinerals>().copied().unwrap_or_default();
        command::request_production(&mut self.world, &self.selection, &minerals, &mut self.bus);
    }

    /// The entity IDs currently selected.
    pub fn selected_ids(&self) -> &HashSet<u32> {
        &self.selection.selected_ids
    }

    /// The in-progress drag rectangle, if any (for UI drag-box rendering).
    pub fn drag_rect(&self) -> Option<(f32, f32, f32, f32)> {
        self.selection.get_drag_rect()
    }

    // ------------------------------------------------------------------
    // Events (spec.md §4.1, §6)
    // ------------------------------------------------------------------

    /// Register `handler` to run, synchronously and in registration order,
    /// on every event published from here on (spec.md §4.1). The renderer
    /// and audio subsystems attach this way rather than coupling to system
    /// internals.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.bus.subscribe(handler);
    }

    // ------------------------------------------------------------------
    // Read-only state (spec.md §6 snapshot / query surface)
    // ------------------------------------------------------------------

    /// A serializable snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// The current snapshot, serialized to a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn is_game_over(&self) -> bool {
        self.world.get_resource::<GameOverState>().map(|s| s.over).unwrap_or(false)
    }

    pub fn winner(&self) -> Option<Team> {
        self.world.get_resource::<GameOverState>().and_then(|s| s.winner)
    }

    pub fn team_minerals(&self, team: Team) -> u32 {
        self.world.get_resource::<TeamMinerals>().map(|m| m.get(team)).unwrap_or(0)
    }

    pub fn fog(&self) -> Option<&FogOfWar> {
        self.world.get_resource::<FogOfWar>()
    }

    pub fn map(&self) -> Option<&GameMap> {
        self.world.get_resource::<GameMap>()
    }

    pub fn ai_phase(&self) -> Option<AiPhase> {
        self.world.get_resource::<AiController>().map(|ai| ai.phase)
    }

    /// Direct access to the ECS world, for advanced queries not otherwise
    /// exposed (tests, diagnostic tooling).
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SCENARIO: &str = r#"{
        "starting_minerals": 80,
        "starting_workers": 2,
        "mineral_patches": [{"pos": [10.0, 5.0], "amount": 1500}],
        "teams": {
            "1": {"base_pos": [5.0, 5.0], "name": "Human"},
            "2": {"base_pos": [40.0, 40.0], "name": "Opponent"}
        }
    }"#;

    #[test]
    fn test_new_world_starts_at_tick_zero() {
        let sim = SimWorld::new();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.current_time(), 0.0);
        assert!(!sim.is_game_over());
    }

    #[test]
    fn test_step_advances_tick_at_fixed_rate() {
        let mut sim = SimWorld::new();
        sim.step(1.0 / 30.0);
        assert_eq!(sim.current_tick(), 1);
        sim.step(2.0 / 30.0);
        assert_eq!(sim.current_tick(), 3);
    }

    #[test]
    fn test_load_scenario_spawns_bases_and_workers_with_exact_minerals() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.buildings.len(), 2);
        assert_eq!(snapshot.units.len(), 4); // 2 workers per team
        assert_eq!(sim.team_minerals(Team::Player), 80);
        assert_eq!(sim.team_minerals(Team::Ai), 80);
    }

    #[test]
    fn test_click_on_own_worker_then_click_terrain_moves_it() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        sim.click(Team::Player, 6.0, 6.0); // near a player worker
        assert_eq!(sim.selected_ids().len(), 1);

        sim.click(Team::Player, 20.0, 20.0); // open terrain: move order
        for _ in 0..60 {
            sim.step(1.0 / 30.0);
        }

        let snapshot = sim.snapshot();
        let worker = snapshot.units.iter().find(|u| u.team == 1).unwrap();
        // The worker should have moved away from its spawn point toward (20, 20).
        assert!(worker.x > 7.0 || worker.y > 7.0);
    }

    #[test]
    fn test_request_production_queues_unit_on_selected_base() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        let base_id = sim.snapshot().buildings.iter().find(|b| b.team == 1).unwrap().id;
        sim.click(Team::Player, 5.0, 5.0);
        assert_eq!(sim.selected_ids(), &HashSet::from([base_id]));

        sim.request_production();

        let queue_len = sim.snapshot().buildings.iter().find(|b| b.id == base_id).unwrap().queue_len;
        assert_eq!(queue_len, 1);
    }

    #[test]
    fn test_drag_select_replaces_selection_with_units_in_rect() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        sim.drag_start(0.0, 0.0);
        sim.drag_update(10.0, 10.0);
        assert!(sim.is_dragging());

        let selected = sim.drag_end(Team::Player);
        // Both player workers spawn within (6, 6)-(7, 6), inside the rect.
        assert_eq!(selected.len(), 2);
        assert_eq!(sim.selected_ids(), &selected);
    }

    #[test]
    fn test_subscribe_receives_command_event() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        let received = std::sync::Arc::new(std::sync::Mutex::new(false));
        let received_clone = received.clone();
        sim.subscribe(move |event| {
            if matches!(event, GameEvent::Command { .. }) {
                *received_clone.lock().unwrap() = true;
            }
        });

        sim.click(Team::Player, 6.0, 6.0);
        sim.click(Team::Player, 20.0, 20.0);

        assert!(*received.lock().unwrap());
    }

    #[test]
    fn test_ai_starts_in_opening_phase() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();
        assert_eq!(sim.ai_phase(), Some(AiPhase::Opening));
    }

    #[test]
    fn test_game_over_halts_the_system_pipeline() {
        let mut sim = SimWorld::new();
        sim.load_scenario(SAMPLE_SCENARIO).unwrap();

        // Destroy the player's base directly to trigger victory next tick.
        let player_base = {
            let mut query = sim.world_mut().query::<(Entity, &Team, &BuildingKindTag)>();
            query
                .iter(sim.world())
                .find(|(_, t, k)| **t == Team::Player && **k == BuildingKindTag::Base)
                .map(|(e, _, _)| e)
                .unwrap()
        };
        sim.world_mut().get_mut::<Health>(player_base).unwrap().current = 0.0;

        sim.step(1.0 / 30.0);
        assert!(sim.is_game_over());
        assert_eq!(sim.winner(), Some(Team::Ai));

        let tick_before = sim.current_tick();
        sim.step(1.0 / 30.0);
        // Time still advances, but the tick count is the only externally
        // visible effect once the game has ended (spec.md §4.12).
        assert_eq!(sim.current_tick(), tick_before + 1);
    }
}
