//! Error types for scenario and map loading.
//!
//! The simulation itself never fails at runtime (bad orders are clamped or
//! ignored, matching spec.md §7); the only fallible entry points are loading
//! a map/scenario from disk or JSON.

use std::fmt;

/// Errors that can occur while loading a map or scenario.
#[derive(Debug)]
pub enum ScenarioLoadError {
    /// Failed to read a file from disk.
    Io(std::io::Error),
    /// Failed to parse scenario JSON.
    Json(serde_json::Error),
    /// A map CSV cell held a character with no known tile/marker mapping.
    BadMapCell(char),
    /// The scenario referenced a team with no matching base/spawn entry.
    MissingTeam(u8),
}

impl fmt::Display for ScenarioLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioLoadError::Io(e) => write!(f, "failed to read scenario file: {e}"),
            ScenarioLoadError::Json(e) => write!(f, "failed to parse scenario JSON: {e}"),
            ScenarioLoadError::BadMapCell(c) => write!(f, "unrecognized map cell marker: {c:?}"),
            ScenarioLoadError::MissingTeam(team) => {
                write!(f, "scenario has no base/spawn entry for team {team}")
            }
        }
    }
}

impl std::error::Error for ScenarioLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioLoadError::Io(e) => Some(e),
            ScenarioLoadError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScenarioLoadError {
    fn from(e: std::io::Error) -> Self {
        ScenarioLoadError::Io(e)
    }
}

impl From<serde_json::Error> for ScenarioLoadError {
    fn from(e: serde_json::Error) -> Self {
        ScenarioLoadError::Json(e)
    }
}
