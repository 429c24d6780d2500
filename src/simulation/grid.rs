//! Tile grid: terrain and the authoritative ownership map.

use std::collections::{HashSet, VecDeque};

use bevy_ecs::prelude::Resource;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::simulation::NationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Grassland,
    Sand,
    ShallowWater,
    MediumWater,
    DeepWater,
    Mountains,
    Forest,
    Jungle,
    Marsh,
    Snow,
    Savanna,
    Hills,
    Coral,
}

impl Terrain {
    pub fn is_water(&self) -> bool {
        matches!(
            self,
            Terrain::ShallowWater | Terrain::MediumWater | Terrain::DeepWater
        )
    }

    /// Tiles that count as "the sea" for harbor checks. Coral shelves are
    /// claimable land but still give the adjacent coast sea access.
    pub fn is_sea_edge(&self) -> bool {
        matches!(self, Terrain::ShallowWater | Terrain::Coral)
    }
}

/// Authoritative ownership map. A nation's territory is exactly the set of
/// tiles here that carry its id; nothing else stores tile membership.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct TerritoryGrid {
    pub width: u16,
    pub height: u16,
    pub terrain: Vec<Terrain>,
    pub owner: Vec<Option<NationId>>,
}

impl TerritoryGrid {
    pub fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            terrain: vec![Terrain::Grassland; len],
            owner: vec![None; len],
        }
    }

    #[inline]
    pub fn idx(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn coord(&self, idx: usize) -> (u16, u16) {
        (
            (idx % self.width as usize) as u16,
            (idx / self.width as usize) as u16,
        )
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32
    }

    pub fn terrain_at(&self, x: u16, y: u16) -> Terrain {
        self.terrain[self.idx(x, y)]
    }

    pub fn owner_at(&self, x: u16, y: u16) -> Option<NationId> {
        self.owner[self.idx(x, y)]
    }

    pub fn set_owner(&mut self, x: u16, y: u16, owner: Option<NationId>) {
        let idx = self.idx(x, y);
        self.owner[idx] = owner;
    }

    pub fn neighbors4(&self, x: u16, y: u16) -> Vec<(u16, u16)> {
        let mut out = Vec::with_capacity(4);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if self.in_bounds(nx, ny) {
                out.push((nx as u16, ny as u16));
            }
        }
        out
    }

    pub fn neighbors8(&self, x: u16, y: u16) -> Vec<(u16, u16)> {
        let mut out = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                if self.in_bounds(nx, ny) {
                    out.push((nx as u16, ny as u16));
                }
            }
        }
        out
    }

    pub fn territory_of(&self, id: NationId) -> Vec<(u16, u16)> {
        self.owner
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == Some(id))
            .map(|(idx, _)| self.coord(idx))
            .collect()
    }

    pub fn territory_count(&self, id: NationId) -> usize {
        self.owner.iter().filter(|owner| **owner == Some(id)).count()
    }

    /// Own tiles that touch at least one land tile not held by `id`. With
    /// `against`, only tiles touching that particular nation qualify.
    pub fn border_tiles(&self, id: NationId, against: Option<NationId>) -> Vec<(u16, u16)> {
        self.territory_of(id)
            .into_iter()
            .filter(|&(x, y)| {
                self.neighbors4(x, y).into_iter().any(|(nx, ny)| {
                    if self.terrain_at(nx, ny).is_water() {
                        return false;
                    }
                    match against {
                        Some(enemy) => self.owner_at(nx, ny) == Some(enemy),
                        None => self.owner_at(nx, ny) != Some(id),
                    }
                })
            })
            .collect()
    }

    /// Land neighbors of a tile that `id` does not already hold.
    pub fn expandable_neighbors(&self, x: u16, y: u16, id: NationId) -> Vec<(u16, u16)> {
        self.neighbors4(x, y)
            .into_iter()
            .filter(|&(nx, ny)| {
                !self.terrain_at(nx, ny).is_water() && self.owner_at(nx, ny) != Some(id)
            })
            .collect()
    }

    pub fn unclaimed_land_tiles(&self) -> Vec<(u16, u16)> {
        self.owner
            .iter()
            .enumerate()
            .filter(|(idx, owner)| owner.is_none() && !self.terrain[*idx].is_water())
            .map(|(idx, _)| self.coord(idx))
            .collect()
    }

    /// Breadth-first collection from `seed`, 4-connected, limited to `limit`
    /// tiles, visiting only tiles where `pred` holds. The seed itself must
    /// satisfy `pred` to be included.
    pub fn flood_collect(
        &self,
        seed: (u16, u16),
        limit: usize,
        pred: impl Fn(&TerritoryGrid, u16, u16) -> bool,
    ) -> Vec<(u16, u16)> {
        let mut out = Vec::new();
        if limit == 0 || !pred(self, seed.0, seed.1) {
            return out;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(seed);
        queue.push_back(seed);
        while let Some((x, y)) = queue.pop_front() {
            out.push((x, y));
            if out.len() >= limit {
                break;
            }
            for (nx, ny) in self.neighbors4(x, y) {
                if pred(self, nx, ny) && visited.insert((nx, ny)) {
                    queue.push_back((nx, ny));
                }
            }
        }
        out
    }

    pub fn has_sea_access(&self, id: NationId) -> bool {
        self.territory_of(id).into_iter().any(|(x, y)| {
            self.neighbors4(x, y)
                .into_iter()
                .any(|(nx, ny)| self.terrain_at(nx, ny).is_sea_edge())
        })
    }

    /// Owned land tiles with at least one water neighbor.
    pub fn coastal_tiles(&self, id: NationId) -> Vec<(u16, u16)> {
        self.territory_of(id)
            .into_iter()
            .filter(|&(x, y)| {
                self.neighbors4(x, y)
                    .into_iter()
                    .any(|(nx, ny)| self.terrain_at(nx, ny).is_water())
            })
            .collect()
    }

    /// Nations sharing a land border with `id`, in first-contact order.
    pub fn neighboring_nations(&self, id: NationId) -> Vec<NationId> {
        let mut seen = Vec::new();
        for (x, y) in self.territory_of(id) {
            for (nx, ny) in self.neighbors4(x, y) {
                if let Some(other) = self.owner_at(nx, ny) {
                    if other != id && !seen.contains(&other) {
                        seen.push(other);
                    }
                }
            }
        }
        seen
    }

    pub fn scrub_owner(&mut self, id: NationId) {
        for owner in self.owner.iter_mut() {
            if *owner == Some(id) {
                *owner = None;
            }
        }
    }
}

/// Continent-blob terrain generation: deep ocean base, a few flood-grown
/// landmasses, a shallow fringe, then biome sprinkling.
pub fn generate_terrain(width: u16, height: u16, rng: &mut SmallRng) -> TerritoryGrid {
    let mut grid = TerritoryGrid::new(width, height);
    let len = grid.terrain.len();
    grid.terrain = vec![Terrain::DeepWater; len];

    let target_land = len * 2 / 5;
    let continents = rng.gen_range(3..6);
    let mut placed = 0usize;
    for _ in 0..continents {
        let seed = (
            rng.gen_range(width / 8..width - width / 8),
            rng.gen_range(height / 8..height - height / 8),
        );
        let budget = (target_land / continents).max(16);
        let mut frontier = vec![seed];
        let mut claimed = HashSet::new();
        claimed.insert(seed);
        while placed < len && !frontier.is_empty() && claimed.len() < budget {
            let pick = rng.gen_range(0..frontier.len());
            let (x, y) = frontier.swap_remove(pick);
            let idx = grid.idx(x, y);
            if grid.terrain[idx] == Terrain::DeepWater {
                grid.terrain[idx] = Terrain::Grassland;
                placed += 1;
            }
            for (nx, ny) in grid.neighbors4(x, y) {
                // Keep a water margin at the map edge.
                if nx == 0 || ny == 0 || nx == width - 1 || ny == height - 1 {
                    continue;
                }
                if claimed.insert((nx, ny)) {
                    frontier.push((nx, ny));
                }
            }
        }
    }

    // Shallow fringe around land, then a medium-depth band around that.
    for depth_pass in [Terrain::ShallowWater, Terrain::MediumWater] {
        let mut fringe = Vec::new();
        for idx in 0..len {
            if grid.terrain[idx] != Terrain::DeepWater {
                continue;
            }
            let (x, y) = grid.coord(idx);
            let touches = grid.neighbors4(x, y).into_iter().any(|(nx, ny)| {
                let t = grid.terrain_at(nx, ny);
                match depth_pass {
                    Terrain::ShallowWater => !t.is_water(),
                    _ => t == Terrain::ShallowWater,
                }
            });
            if touches {
                fringe.push(idx);
            }
        }
        for idx in fringe {
            grid.terrain[idx] = depth_pass;
        }
    }

    for idx in 0..len {
        match grid.terrain[idx] {
            Terrain::Grassland => {
                let roll: f32 = rng.gen_range(0.0..1.0);
                grid.terrain[idx] = if roll < 0.10 {
                    Terrain::Forest
                } else if roll < 0.16 {
                    Terrain::Hills
                } else if roll < 0.21 {
                    Terrain::Mountains
                } else if roll < 0.25 {
                    Terrain::Savanna
                } else if roll < 0.28 {
                    Terrain::Sand
                } else if roll < 0.30 {
                    Terrain::Jungle
                } else if roll < 0.32 {
                    Terrain::Marsh
                } else if roll < 0.33 {
                    Terrain::Snow
                } else {
                    Terrain::Grassland
                };
            }
            Terrain::ShallowWater => {
                if rng.gen_bool(0.02) {
                    grid.terrain[idx] = Terrain::Coral;
                }
            }
            _ => {}
        }
    }

    grid
}

/// Pick a BFS-contiguous patch of unclaimed land for a new nation. Returns
/// the claimed tiles, empty when no seed with enough room exists.
pub fn claim_starting_patch(
    grid: &mut TerritoryGrid,
    id: NationId,
    tiles: usize,
    rng: &mut SmallRng,
) -> Vec<(u16, u16)> {
    let mut seeds = grid.unclaimed_land_tiles();
    seeds.shuffle(rng);
    for seed in seeds.into_iter().take(12) {
        let patch = grid.flood_collect(seed, tiles, |g, x, y| {
            !g.terrain_at(x, y).is_water() && g.owner_at(x, y).is_none()
        });
        if patch.len() >= tiles.min(8) {
            for &(x, y) in &patch {
                grid.set_owner(x, y, Some(id));
            }
            return patch;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn land_strip() -> TerritoryGrid {
        let mut grid = TerritoryGrid::new(8, 4);
        for y in 0..4 {
            let idx = grid.idx(7, y);
            grid.terrain[idx] = Terrain::ShallowWater;
        }
        grid
    }

    #[test]
    fn water_tiles_are_never_expandable() {
        let mut grid = land_strip();
        let id = NationId(1);
        grid.set_owner(6, 1, Some(id));
        let targets = grid.expandable_neighbors(6, 1, id);
        assert!(targets.iter().all(|&(x, _)| x != 7));
    }

    #[test]
    fn border_tiles_respect_enemy_filter() {
        let mut grid = land_strip();
        let a = NationId(1);
        let b = NationId(2);
        grid.set_owner(2, 1, Some(a));
        grid.set_owner(3, 1, Some(a));
        grid.set_owner(4, 1, Some(b));

        let against_b = grid.border_tiles(a, Some(b));
        assert_eq!(against_b, vec![(3, 1)]);
        // Without a filter, every frontier tile counts.
        let open = grid.border_tiles(a, None);
        assert!(open.contains(&(2, 1)) && open.contains(&(3, 1)));
    }

    #[test]
    fn flood_collect_stays_within_limit_and_ownership() {
        let mut grid = land_strip();
        let a = NationId(1);
        for x in 0..6 {
            grid.set_owner(x, 1, Some(a));
            grid.set_owner(x, 2, Some(a));
        }
        let patch = grid.flood_collect((0, 1), 5, |g, x, y| g.owner_at(x, y) == Some(a));
        assert_eq!(patch.len(), 5);
        assert!(patch.iter().all(|&(x, y)| grid.owner_at(x, y) == Some(a)));
    }

    #[test]
    fn generated_terrain_keeps_water_margin() {
        let mut rng = SmallRng::seed_from_u64(7);
        let grid = generate_terrain(48, 32, &mut rng);
        for x in 0..48u16 {
            assert!(grid.terrain_at(x, 0).is_water());
            assert!(grid.terrain_at(x, 31).is_water());
        }
        let land = grid.terrain.iter().filter(|t| !t.is_water()).count();
        assert!(land > 0, "expected at least one landmass");
    }

    #[test]
    fn starting_patch_is_contiguous_unclaimed_land() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut grid = generate_terrain(48, 32, &mut rng);
        let id = NationId(1);
        let patch = claim_starting_patch(&mut grid, id, 20, &mut rng);
        assert!(!patch.is_empty());
        assert_eq!(grid.territory_count(id), patch.len());
        for &(x, y) in &patch {
            assert!(!grid.terrain_at(x, y).is_water());
        }
    }
}
