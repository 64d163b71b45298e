//! Per-team fog of war.
//!
//! Grounded on `original_source/full/core/world.py::FogOfWar` for content
//! (three-valued grid, demote-then-reveal update order, circular vision via
//! squared distance) and on `spatial.rs`'s `Resource`-held-grid pattern for
//! style (a dense `Vec` here rather than a sparse hash grid, since fog needs
//! every tile addressable).

use crate::components::{Position, Team, Vision};
use bevy_ecs::prelude::*;

/// Visibility state of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Hidden,
    Explored,
    Visible,
}

/// Fog-of-war grid for one team.
#[derive(Debug, Clone)]
pub struct TeamFog {
    width: usize,
    height: usize,
    grid: Vec<Visibility>,
}

impl TeamFog {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            grid: vec![Visibility::Hidden; width * height],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn is_visible(&self, x: i32, y: i32) -> bool {
        matches!(self.index(x, y).map(|i| self.grid[i]), Some(Visibility::Visible))
    }

    pub fn is_explored(&self, x: i32, y: i32) -> bool {
        matches!(
            self.index(x, y).map(|i| self.grid[i]),
            Some(Visibility::Explored) | Some(Visibility::Visible)
        )
    }

    /// Demote every currently-visible tile to explored, then reveal every
    /// tile within `vision` tiles (inclusive, circular) of each `(x, y,
    /// vision)` entry. Returns the set of tiles that went from hidden to
    /// visible this call, matching `FogOfWar.update_visibility`'s return
    /// value.
    pub fn update(&mut self, entities: &[(f32, f32, f32)]) -> Vec<(i32, i32)> {
        for cell in self.grid.iter_mut() {
            if *cell == Visibility::Visible {
                *cell = Visibility::Explored;
            }
        }

        let mut newly_visible = Vec::new();
        for &(ex, ey, vision) in entities {
            let cx = ex as i32;
            let cy = ey as i32;
            let vision_i = vision as i32;
            let vision_sq = vision * vision;

            for dy in -vision_i..=vision_i {
                for dx in -vision_i..=vision_i {
                    if (dx * dx + dy * dy) as f32 > vision_sq {
                        continue;
                    }
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if let Some(idx) = self.index(nx, ny) {
                        if self.grid[idx] != Visibility::Visible {
                            if self.grid[idx] == Visibility::Hidden {
                                newly_visible.push((nx, ny));
                            }
                            self.grid[idx] = Visibility::Visible;
                        }
                    }
                }
            }
        }

        newly_visible
    }
}

/// Per-team fog grids, held as a single resource keyed by team.
#[derive(Resource, Default)]
pub struct FogOfWar {
    pub player: Option<TeamFog>,
    pub ai: Option<TeamFog>,
}

impl FogOfWar {
    pub fn init(width: usize, height: usize) -> Self {
        Self {
            player: Some(TeamFog::new(width, height)),
            ai: Some(TeamFog::new(width, height)),
        }
    }

    pub fn team(&self, team: Team) -> Option<&TeamFog> {
        match team {
            Team::Player => self.player.as_ref(),
            Team::Ai => self.ai.as_ref(),
        }
    }

    fn team_mut(&mut self, team: Team) -> Option<&mut TeamFog> {
        match team {
            Team::Player => self.player.as_mut(),
            Team::Ai => self.ai.as_mut(),
        }
    }

    pub fn is_visible_to(&self, team: Team, x: f32, y: f32) -> bool {
        match self.team(team) {
            Some(fog) => fog.is_visible(x as i32, y as i32),
            None => true,
        }
    }
}

/// Update both teams' fog from the current entity set. Default vision
/// (`SimConfig::default_vision`) is applied to any entity without an
/// explicit `Vision` component, matching `getattr(entity, 'vision', 5)`.
pub fn fog_system(
    mut fog: ResMut<FogOfWar>,
    config: Res<crate::config::SimConfig>,
    query: Query<(&Position, &Team, Option<&Vision>)>,
) {
    let mut player_entities = Vec::new();
    let mut ai_entities = Vec::new();

    for (pos, team, vision) in query.iter() {
        let vision = vision.map(|v| v.0).unwrap_or(config.default_vision);
        match team {
            Team::Player => player_entities.push((pos.x, pos.y, vision)),
            Team::Ai => ai_entities.push((pos.x, pos.y, vision)),
        }
    }

    if let Some(f) = fog.team_mut(Team::Player) {
        f.update(&player_entities);
    }
    if let Some(f) = fog.team_mut(Team::Ai) {
        f.update(&ai_entities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_tiles_demote_to_explored() {
        let mut fog = TeamFog::new(10, 10);
        fog.update(&[(5.0, 5.0, 2.0)]);
        assert!(fog.is_visible(5, 5));

        fog.update(&[]);
        assert!(!fog.is_visible(5, 5));
        assert!(fog.is_explored(5, 5));
    }

    #[test]
    fn test_newly_visible_only_reports_previously_hidden() {
        let mut fog = TeamFog::new(10, 10);
        let first = fog.update(&[(5.0, 5.0, 1.0)]);
        assert!(first.contains(&(5, 5)));

        let second = fog.update(&[(5.0, 5.0, 1.0)]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_vision_is_circular_not_square() {
        let mut fog = TeamFog::new(20, 20);
        fog.update(&[(10.0, 10.0, 3.0)]);
        // (10,13) is exactly on the boundary (dist 3), (13,13) is outside
        // the circle despite being within the bounding square.
        assert!(fog.is_visible(10, 13));
        assert!(!fog.is_visible(13, 13));
    }
}
