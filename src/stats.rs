//! Unit/building stat tables, loadable from JSON by kind name.
//!
//! Grounded on `scenario.rs`'s `from_json` pattern (a serde-derived file
//! shape plus an `apply` step that feeds it into the running simulation)
//! and on `original_source/full/core/entities.py`'s `UNIT_STATS`/
//! `BUILDING_STATS` module-level dicts (spec.md §6: "two mappings by kind
//! name, each entry carrying `hp`, `speed` (units only), `vision`, `cost`,
//! `build_time`, and for soldiers `damage`, `range`, `cooldown`, and for
//! workers `carry_capacity`"). The built-in numbers in `config.rs` seed
//! these tables' `Default` impls so a simulation that never calls
//! `SimWorld::load_unit_stats`/`load_building_stats` behaves exactly as
//! before; loading a file overrides only the kinds it names.

use crate::components::{BuildingKindTag, UnitKindTag};
use crate::config::{BuildingStats, UnitStats};
use crate::error::ScenarioLoadError;
use bevy_ecs::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

/// One `units.json` entry (spec.md §6). Worker-only and soldier-only
/// fields default to zero so either kind can be named without the other's
/// fields present.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitStatsEntry {
    pub hp: f32,
    pub speed: f32,
    pub vision: f32,
    pub cost: u32,
    pub build_time: f32,
    #[serde(default)]
    pub carry_capacity: u32,
    #[serde(default)]
    pub damage: f32,
    #[serde(default)]
    pub range: f32,
    #[serde(default)]
    pub cooldown: f32,
}

/// One `buildings.json` entry (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingStatsEntry {
    pub hp: f32,
    pub vision: f32,
    pub cost: u32,
    pub build_time: f32,
}

/// Deserialized shape of a unit stat file: a mapping from kind name
/// (`"Worker"`, `"Soldier"`) to its stat entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitStatsFile(pub HashMap<String, UnitStatsEntry>);

/// Deserialized shape of a building stat file: a mapping from kind name
/// (`"Base"`, `"Barracks"`) to its stat entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingStatsFile(pub HashMap<String, BuildingStatsEntry>);

impl UnitStatsFile {
    pub fn from_json(text: &str) -> Result<Self, ScenarioLoadError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl BuildingStatsFile {
    pub fn from_json(text: &str) -> Result<Self, ScenarioLoadError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn unit_kind_from_name(name: &str) -> Option<UnitKindTag> {
    match name {
        "Worker" => Some(UnitKindTag::Worker),
        "Soldier" => Some(UnitKindTag::Soldier),
        _ => None,
    }
}

fn building_kind_from_name(name: &str) -> Option<BuildingKindTag> {
    match name {
        "Base" => Some(BuildingKindTag::Base),
        "Barracks" => Some(BuildingKindTag::Barracks),
        _ => None,
    }
}

/// The unit stat table currently in effect, seeded from `UnitKindTag::stats`
/// and overridable by name via [`UnitStatsFile`]. Every system that needs a
/// unit's stats (production, movement, command) reads this resource instead
/// of calling `UnitKindTag::stats()` directly, so a loaded override takes
/// effect immediately for both existing queries and newly spawned units.
#[derive(Resource, Debug, Clone)]
pub struct UnitStatTable(HashMap<UnitKindTag, UnitStats>);

impl Default for UnitStatTable {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(UnitKindTag::Worker, UnitKindTag::Worker.stats());
        map.insert(UnitKindTag::Soldier, UnitKindTag::Soldier.stats());
        Self(map)
    }
}

impl UnitStatTable {
    pub fn get(&self, kind: UnitKindTag) -> UnitStats {
        self.0.get(&kind).copied().unwrap_or_else(|| kind.stats())
    }

    /// Overwrite every kind named in `file`, leaving unnamed kinds at
    /// whatever they currently hold. Unrecognized names are ignored.
    pub fn apply(&mut self, file: &UnitStatsFile) {
        for (name, entry) in &file.0 {
            let Some(kind) = unit_kind_from_name(name) else { continue };
            self.0.insert(
                kind,
                UnitStats {
                    cost: entry.cost,
                    build_time: entry.build_time,
                    hp: entry.hp,
                    speed: entry.speed,
                    vision: entry.vision,
                    carry_capacity: entry.carry_capacity,
                    damage: entry.damage,
                    attack_range: entry.range,
                    attack_cooldown: entry.cooldown,
                },
            );
        }
    }
}

/// The building stat table currently in effect; see [`UnitStatTable`].
#[derive(Resource, Debug, Clone)]
pub struct BuildingStatTable(HashMap<BuildingKindTag, BuildingStats>);

impl Default for BuildingStatTable {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(BuildingKindTag::Base, BuildingKindTag::Base.stats());
        map.insert(BuildingKindTag::Barracks, BuildingKindTag::Barracks.stats());
        Self(map)
    }
}

impl BuildingStatTable {
    pub fn get(&self, kind: BuildingKindTag) -> BuildingStats {
        self.0.get(&kind).copied().unwrap_or_else(|| kind.stats())
    }

    pub fn apply(&mut self, file: &BuildingStatsFile) {
        for (name, entry) in &file.0 {
            let Some(kind) = building_kind_from_name(name) else { continue };
            self.0.insert(
                kind,
                BuildingStats {
                    cost: entry.cost,
                    build_time: entry.build_time,
                    hp: entry.hp,
                    vision: entry.vision,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS_JSON: &str = r#"{
        "Worker": {"hp": 40.0, "speed": 3.5, "vision": 6.0, "cost": 60, "build_time": 8.0, "carry_capacity": 10},
        "Soldier": {"hp": 55.0, "speed": 2.5, "vision": 8.0, "cost": 80, "build_time": 10.0, "damage": 12.0, "range": 5.0, "cooldown": 1.0}
    }"#;

    const BUILDINGS_JSON: &str = r#"{
        "Barracks": {"hp": 350.0, "vision": 6.0, "cost": 175, "build_time": 18.0}
    }"#;

    #[test]
    fn test_default_table_matches_builtin_stats() {
        let table = UnitStatTable::default();
        assert_eq!(table.get(UnitKindTag::Worker).cost, UnitKindTag::Worker.stats().cost);
        assert_eq!(table.get(UnitKindTag::Soldier).hp, UnitKindTag::Soldier.stats().hp);
    }

    #[test]
    fn test_apply_overrides_named_kind_only() {
        let mut table = UnitStatTable::default();
        let builtin_soldier_cost = table.get(UnitKindTag::Soldier).cost;

        let file = UnitStatsFile::from_json(
            r#"{"Worker": {"hp": 40.0, "speed": 3.5, "vision": 6.0, "cost": 60, "build_time": 8.0, "carry_capacity": 10}}"#,
        )
        .unwrap();
        table.apply(&file);

        assert_eq!(table.get(UnitKindTag::Worker).cost, 60);
        assert_eq!(table.get(UnitKindTag::Worker).hp, 40.0);
        // Soldier wasn't named in the file, so it's untouched.
        assert_eq!(table.get(UnitKindTag::Soldier).cost, builtin_soldier_cost);
    }

    #[test]
    fn test_unit_stats_file_parses_both_kinds() {
        let file = UnitStatsFile::from_json(UNITS_JSON).unwrap();
        let mut table = UnitStatTable::default();
        table.apply(&file);

        assert_eq!(table.get(UnitKindTag::Worker).cost, 60);
        assert_eq!(table.get(UnitKindTag::Soldier).damage, 12.0);
    }

    #[test]
    fn test_building_stats_file_overrides_named_kind() {
        let file = BuildingStatsFile::from_json(BUILDINGS_JSON).unwrap();
        let mut table = BuildingStatTable::default();
        let builtin_base_cost = table.get(BuildingKindTag::Base).cost;
        table.apply(&file);

        assert_eq!(table.get(BuildingKindTag::Barracks).cost, 175);
        assert_eq!(table.get(BuildingKindTag::Base).cost, builtin_base_cost);
    }

    #[test]
    fn test_unknown_kind_name_is_ignored() {
        let mut table = UnitStatTable::default();
        let file = UnitStatsFile::from_json(
            r#"{"Siegebreaker": {"hp": 1.0, "speed": 1.0, "vision": 1.0, "cost": 1, "build_time": 1.0}}"#,
        )
        .unwrap();
        table.apply(&file);
        assert_eq!(table.get(UnitKindTag::Worker).cost, UnitKindTag::Worker.stats().cost);
    }
}
