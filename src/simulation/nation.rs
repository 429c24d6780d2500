//! Nation data model and the ordered registry that fixes turn order.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::simulation::economy::TradeNetwork;
use crate::simulation::grid::TerritoryGrid;
use crate::simulation::navy::Navy;
use crate::simulation::wars::ActiveWars;

/// Monotonic nation identifier. Ids are never reused, so references held in
/// events or snapshots stay unambiguous after a nation dies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NationId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Government {
    Monarchy,
    Republic,
    Empire,
    Theocracy,
    Tribal,
}

impl Government {
    pub fn label(&self) -> &'static str {
        match self {
            Government::Monarchy => "Monarchy",
            Government::Republic => "Republic",
            Government::Empire => "Empire",
            Government::Theocracy => "Theocracy",
            Government::Tribal => "Tribal Confederation",
        }
    }

    pub fn random(rng: &mut SmallRng) -> Self {
        *[
            Government::Monarchy,
            Government::Republic,
            Government::Empire,
            Government::Theocracy,
            Government::Tribal,
        ]
        .choose(rng)
        .unwrap_or(&Government::Monarchy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub x: u16,
    pub y: u16,
    pub name: String,
    pub size: u8,
    pub is_capital: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nation {
    pub id: NationId,
    pub name: String,
    pub color: (u8, u8, u8),
    pub government: Government,

    pub stability: f32,
    pub gdp: f32,
    pub population: f64,
    pub army_strength: u8,

    pub allies: Vec<NationId>,
    pub vassals: Vec<NationId>,
    pub overlord: Option<NationId>,
    pub at_war_with: Vec<NationId>,
    pub war_start_years: HashMap<NationId, u32>,

    pub trade_resources: Vec<String>,
    pub cities: Vec<City>,
    pub navies: Vec<Navy>,

    pub is_rebel: bool,
    pub last_revolt_year: u32,
}

impl Nation {
    pub fn is_at_war(&self) -> bool {
        !self.at_war_with.is_empty()
    }

    pub fn largest_city(&self) -> Option<&City> {
        self.cities.iter().max_by_key(|c| c.size)
    }
}

/// Living nations, in creation order. Registry order is the turn order and
/// never changes except by insertion at the back or removal.
#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct Nations {
    list: Vec<Nation>,
    next_id: u32,
}

impl Nations {
    pub fn allocate_id(&mut self) -> NationId {
        let id = NationId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn insert(&mut self, nation: Nation) {
        debug_assert!(self.get(nation.id).is_none());
        self.list.push(nation);
    }

    pub fn get(&self, id: NationId) -> Option<&Nation> {
        self.list.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NationId) -> Option<&mut Nation> {
        self.list.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NationId) -> bool {
        self.get(id).is_some()
    }

    /// Distinct mutable borrows of two nations at once.
    pub fn get_pair_mut(
        &mut self,
        a: NationId,
        b: NationId,
    ) -> Option<(&mut Nation, &mut Nation)> {
        if a == b {
            return None;
        }
        let pos_a = self.list.iter().position(|n| n.id == a)?;
        let pos_b = self.list.iter().position(|n| n.id == b)?;
        let (lo, hi) = (pos_a.min(pos_b), pos_a.max(pos_b));
        let (left, right) = self.list.split_at_mut(hi);
        let (first, second) = (&mut left[lo], &mut right[0]);
        if pos_a < pos_b {
            Some((first, second))
        } else {
            Some((second, first))
        }
    }

    pub fn ids(&self) -> Vec<NationId> {
        self.list.iter().map(|n| n.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nation> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Nation> {
        self.list.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Restore a saved registry. Used by snapshot loading only.
    pub fn from_parts(list: Vec<Nation>, next_id: u32) -> Self {
        Self { list, next_id }
    }

    fn remove_from_registry(&mut self, id: NationId) -> Option<Nation> {
        let pos = self.list.iter().position(|n| n.id == id)?;
        Some(self.list.remove(pos))
    }
}

/// Remove a nation and scrub every reference to it: registry entry, tile
/// ownership, diplomatic links, active wars, and trade routes.
pub fn remove_nation(
    id: NationId,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    wars: &mut ActiveWars,
    trade: &mut TradeNetwork,
) -> Option<Nation> {
    let removed = nations.remove_from_registry(id)?;
    grid.scrub_owner(id);
    for other in nations.iter_mut() {
        other.allies.retain(|a| *a != id);
        other.vassals.retain(|v| *v != id);
        other.at_war_with.retain(|e| *e != id);
        other.war_start_years.remove(&id);
        if other.overlord == Some(id) {
            other.overlord = None;
        }
    }
    wars.list.retain(|w| w.attacker != id && w.defender != id);
    trade.routes.retain(|r| r.a != id && r.b != id);
    Some(removed)
}

const NAME_ROOTS: [&str; 16] = [
    "Vel", "Ash", "Kor", "Thal", "Mar", "Ser", "Dra", "Ost", "Bel", "Cal", "Nor", "Ira", "Lum",
    "Sol", "Tyr", "Quin",
];

const NAME_ENDINGS: [&str; 12] = [
    "ania", "mark", "onia", "heim", "stan", "ora", "avia", "land", "veth", "una", "ara", "ium",
];

const CITY_ENDINGS: [&str; 8] = ["burg", "haven", "port", "holm", "gate", "ford", "dal", "keep"];

pub fn random_nation_name(rng: &mut SmallRng) -> String {
    let root = NAME_ROOTS.choose(rng).copied().unwrap_or("Vel");
    let ending = NAME_ENDINGS.choose(rng).copied().unwrap_or("ania");
    format!("{root}{ending}")
}

pub fn random_city_name(rng: &mut SmallRng) -> String {
    let root = NAME_ROOTS.choose(rng).copied().unwrap_or("Kor");
    let ending = CITY_ENDINGS.choose(rng).copied().unwrap_or("haven");
    format!("{root}{ending}")
}

const RESOURCE_POOL: [&str; 10] = [
    "grain", "timber", "iron", "salt", "wool", "spices", "gems", "fish", "copper", "wine",
];

pub fn random_trade_resources(rng: &mut SmallRng) -> Vec<String> {
    let count = rng.gen_range(1..=3);
    let mut pool: Vec<&str> = RESOURCE_POOL.to_vec();
    pool.shuffle(rng);
    pool.into_iter().take(count).map(String::from).collect()
}

pub fn new_trade_resource(rng: &mut SmallRng, existing: &[String]) -> Option<String> {
    let mut pool: Vec<&str> = RESOURCE_POOL
        .iter()
        .copied()
        .filter(|r| !existing.iter().any(|e| e == r))
        .collect();
    pool.shuffle(rng);
    pool.first().map(|r| r.to_string())
}

pub fn random_color(rng: &mut SmallRng) -> (u8, u8, u8) {
    hsl_to_rgb(rng.gen_range(0.0..360.0), 0.65, 0.5)
}

/// Rebel colors are the parent's hue rotated a quarter to three quarters of
/// the wheel, so splinter states read as related on the map.
pub fn hue_shifted(color: (u8, u8, u8), rng: &mut SmallRng) -> (u8, u8, u8) {
    let (h, s, l) = rgb_to_hsl(color);
    let shift = rng.gen_range(90.0..270.0);
    hsl_to_rgb((h + shift) % 360.0, s.max(0.5), l.clamp(0.35, 0.6))
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

fn rgb_to_hsl((r, g, b): (u8, u8, u8)) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f32::EPSILON {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if (max - r).abs() < f32::EPSILON {
        ((g - b) / d).rem_euclid(6.0)
    } else if (max - g).abs() < f32::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h * 60.0, s, l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::wars::ActiveWar;
    use rand::SeedableRng;

    fn bare_nation(id: NationId) -> Nation {
        Nation {
            id,
            name: format!("Nation {}", id.0),
            color: (120, 60, 200),
            government: Government::Republic,
            stability: 80.0,
            gdp: 1_000.0,
            population: 1_000_000.0,
            army_strength: 3,
            allies: Vec::new(),
            vassals: Vec::new(),
            overlord: None,
            at_war_with: Vec::new(),
            war_start_years: HashMap::new(),
            trade_resources: Vec::new(),
            cities: Vec::new(),
            navies: Vec::new(),
            is_rebel: false,
            last_revolt_year: 0,
        }
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        nations.insert(bare_nation(a));
        nations.insert(bare_nation(b));
        let mut grid = TerritoryGrid::new(4, 4);
        let mut wars = ActiveWars::default();
        let mut trade = TradeNetwork::default();
        remove_nation(a, &mut nations, &mut grid, &mut wars, &mut trade);
        let c = nations.allocate_id();
        assert!(c > b);
    }

    #[test]
    fn removal_scrubs_all_references() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        let c = nations.allocate_id();
        nations.insert(bare_nation(a));
        nations.insert(bare_nation(b));
        nations.insert(bare_nation(c));
        {
            let n = nations.get_mut(b).unwrap();
            n.allies.push(a);
            n.at_war_with.push(a);
            n.war_start_years.insert(a, 3);
        }
        nations.get_mut(c).unwrap().overlord = Some(a);

        let mut grid = TerritoryGrid::new(4, 4);
        grid.set_owner(1, 1, Some(a));
        let mut wars = ActiveWars::default();
        wars.list.push(ActiveWar {
            attacker: a,
            defender: b,
            start_year: 3,
            battle_cooldown: 0,
            auto_end_year: 28,
            is_world_war: false,
        });
        let mut trade = TradeNetwork::default();

        remove_nation(a, &mut nations, &mut grid, &mut wars, &mut trade);

        assert!(nations.get(a).is_none());
        assert_eq!(grid.territory_count(a), 0);
        assert!(wars.list.is_empty());
        let b_ref = nations.get(b).unwrap();
        assert!(b_ref.allies.is_empty() && b_ref.at_war_with.is_empty());
        assert!(b_ref.war_start_years.is_empty());
        assert_eq!(nations.get(c).unwrap().overlord, None);
    }

    #[test]
    fn pair_borrow_preserves_argument_order() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        nations.insert(bare_nation(a));
        nations.insert(bare_nation(b));
        let (first, second) = nations.get_pair_mut(b, a).unwrap();
        assert_eq!(first.id, b);
        assert_eq!(second.id, a);
        assert!(nations.get_pair_mut(a, a).is_none());
    }

    #[test]
    fn rebel_color_differs_from_parent() {
        let mut rng = SmallRng::seed_from_u64(5);
        let parent = random_color(&mut rng);
        let rebel = hue_shifted(parent, &mut rng);
        assert_ne!(parent, rebel);
    }
}
