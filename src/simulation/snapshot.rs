//! Save-game persistence: JSON snapshots with validation on load.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::{
    ActiveWars, NationId, Nations, TerritoryGrid, TradeNetwork, WorldTime, WorldWarState,
    nation::Nation,
};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("grid shape mismatch: {width}x{height} with {terrain} terrain / {owner} owner tiles")]
    GridShape {
        width: u16,
        height: u16,
        terrain: usize,
        owner: usize,
    },
    #[error("duplicate nation id {0}")]
    DuplicateNationId(u32),
    #[error("next_nation_id {next} not above live id {live}")]
    StaleNextId { next: u32, live: u32 },
    #[error("reference to unknown nation id {0}")]
    UnknownNation(u32),
    #[error("water tile at ({0}, {1}) has an owner")]
    OwnedWater(u16, u16),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub year: u32,
    pub next_nation_id: u32,
    pub nations: Vec<Nation>,
    pub grid: TerritoryGrid,
    pub wars: ActiveWars,
    pub world_war: WorldWarState,
    pub trade: TradeNetwork,
}

impl SaveGame {
    pub fn capture(
        time: &WorldTime,
        nations: &Nations,
        grid: &TerritoryGrid,
        wars: &ActiveWars,
        world_war: &WorldWarState,
        trade: &TradeNetwork,
    ) -> Self {
        Self {
            year: time.year,
            next_nation_id: nations.next_id(),
            nations: nations.iter().cloned().collect(),
            grid: grid.clone(),
            wars: wars.clone(),
            world_war: world_war.clone(),
            trade: trade.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        let expected = self.grid.width as usize * self.grid.height as usize;
        if self.grid.terrain.len() != expected || self.grid.owner.len() != expected {
            return Err(SnapshotError::GridShape {
                width: self.grid.width,
                height: self.grid.height,
                terrain: self.grid.terrain.len(),
                owner: self.grid.owner.len(),
            });
        }

        let mut live: HashSet<NationId> = HashSet::new();
        for nation in &self.nations {
            if !live.insert(nation.id) {
                return Err(SnapshotError::DuplicateNationId(nation.id.0));
            }
            if nation.id.0 >= self.next_nation_id {
                return Err(SnapshotError::StaleNextId {
                    next: self.next_nation_id,
                    live: nation.id.0,
                });
            }
        }

        let check = |id: NationId| -> Result<(), SnapshotError> {
            if live.contains(&id) {
                Ok(())
            } else {
                Err(SnapshotError::UnknownNation(id.0))
            }
        };

        for (idx, owner) in self.grid.owner.iter().enumerate() {
            if let Some(id) = owner {
                check(*id)?;
                if self.grid.terrain[idx].is_water() {
                    let (x, y) = self.grid.coord(idx);
                    return Err(SnapshotError::OwnedWater(x, y));
                }
            }
        }

        for nation in &self.nations {
            for id in nation
                .allies
                .iter()
                .chain(&nation.vassals)
                .chain(&nation.at_war_with)
                .chain(nation.overlord.iter())
            {
                check(*id)?;
            }
        }

        for war in &self.wars.list {
            check(war.attacker)?;
            check(war.defender)?;
        }
        for route in &self.trade.routes {
            check(route.a)?;
            check(route.b)?;
        }

        Ok(())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        let save: SaveGame = serde_json::from_str(&json)?;
        save.validate()?;
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::grid::Terrain;
    use std::collections::HashMap;

    fn stub_nation(id: u32) -> Nation {
        Nation {
            id: NationId(id),
            name: format!("Nation {id}"),
            color: (50, 100, 150),
            government: crate::simulation::nation::Government::Monarchy,
            stability: 80.0,
            gdp: 900.0,
            population: 2_000_000.0,
            army_strength: 3,
            allies: Vec::new(),
            vassals: Vec::new(),
            overlord: None,
            at_war_with: Vec::new(),
            war_start_years: HashMap::new(),
            trade_resources: vec!["salt".into()],
            cities: Vec::new(),
            navies: Vec::new(),
            is_rebel: false,
            last_revolt_year: 0,
        }
    }

    fn stub_save() -> SaveGame {
        let mut grid = TerritoryGrid::new(4, 4);
        grid.set_owner(1, 1, Some(NationId(0)));
        SaveGame {
            year: 10,
            next_nation_id: 2,
            nations: vec![stub_nation(0), stub_nation(1)],
            grid,
            wars: ActiveWars::default(),
            world_war: WorldWarState::default(),
            trade: TradeNetwork::default(),
        }
    }

    #[test]
    fn valid_save_round_trips_identically() {
        let save = stub_save();
        save.validate().unwrap();
        let json = serde_json::to_string(&save).unwrap();
        let back: SaveGame = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut save = stub_save();
        save.nations.push(stub_nation(0));
        assert!(matches!(
            save.validate(),
            Err(SnapshotError::DuplicateNationId(0))
        ));
    }

    #[test]
    fn stale_next_id_is_rejected() {
        let mut save = stub_save();
        save.next_nation_id = 1;
        assert!(matches!(
            save.validate(),
            Err(SnapshotError::StaleNextId { .. })
        ));
    }

    #[test]
    fn owned_water_is_rejected() {
        let mut save = stub_save();
        let idx = save.grid.idx(1, 1);
        save.grid.terrain[idx] = Terrain::DeepWater;
        assert!(matches!(
            save.validate(),
            Err(SnapshotError::OwnedWater(1, 1))
        ));
    }

    #[test]
    fn unknown_grid_owner_is_rejected() {
        let mut save = stub_save();
        save.grid.set_owner(2, 2, Some(NationId(9)));
        save.next_nation_id = 10;
        assert!(matches!(
            save.validate(),
            Err(SnapshotError::UnknownNation(9))
        ));
    }
}
