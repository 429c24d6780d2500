//! Active war bookkeeping.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::NationId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveWar {
    pub attacker: NationId,
    pub defender: NationId,
    pub start_year: u32,
    /// Ticks until the next battle. 0 means a battle fires this tick.
    pub battle_cooldown: u8,
    /// Rolled once at declaration; the war cannot outlive this year.
    pub auto_end_year: u32,
    pub is_world_war: bool,
}

impl ActiveWar {
    pub fn pairs(&self, a: NationId, b: NationId) -> bool {
        (self.attacker == a && self.defender == b) || (self.attacker == b && self.defender == a)
    }
}

#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct ActiveWars {
    pub list: Vec<ActiveWar>,
}

impl ActiveWars {
    pub fn between(&self, a: NationId, b: NationId) -> Option<&ActiveWar> {
        self.list.iter().find(|w| w.pairs(a, b))
    }

    pub fn remove_between(&mut self, a: NationId, b: NationId) {
        self.list.retain(|w| !w.pairs(a, b));
    }
}

/// Tiles that saw combat this tick. Cleared at the start of war processing;
/// the UI flashes them.
#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct BattleFlashes(pub Vec<(u16, u16)>);

/// A running world war between two alliance blocs.
#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct WorldWarState {
    pub active: bool,
    pub end_year: u32,
    pub sides: (Vec<NationId>, Vec<NationId>),
}

impl WorldWarState {
    pub fn reset(&mut self) {
        *self = WorldWarState::default();
    }
}
