//! Observer-facing snapshot structures shared with the TUI.

use serde::Serialize;

use crate::simulation::{NationId, Terrain, WorldEvent};

#[derive(Debug, Clone, Serialize)]
pub struct NationSummary {
    pub id: NationId,
    pub name: String,
    pub color: (u8, u8, u8),
    pub government: &'static str,
    pub territory: usize,
    pub stability: f32,
    pub gdp: f32,
    pub population: f64,
    pub army_strength: u8,
    pub cities: usize,
    pub navies: usize,
    pub allies: usize,
    pub at_war: bool,
    pub is_rebel: bool,
    pub overlord: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarSummary {
    pub attacker: String,
    pub attacker_color: (u8, u8, u8),
    pub defender: String,
    pub defender_color: (u8, u8, u8),
    pub start_year: u32,
    pub is_world_war: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GridSnapshot {
    pub width: u16,
    pub height: u16,
    pub terrain: Vec<Terrain>,
    pub owner_color: Vec<Option<(u8, u8, u8)>>,
}

impl GridSnapshot {
    pub fn at(&self, x: u16, y: u16) -> (Terrain, Option<(u8, u8, u8)>) {
        let idx = y as usize * self.width as usize + x as usize;
        (self.terrain[idx], self.owner_color[idx])
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct EconomySnapshot {
    pub world_gdp: f64,
    pub global_trade_volume: f32,
    pub route_count: usize,
    pub economic_centers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ObserverSnapshot {
    pub year: u32,
    pub nations: Vec<NationSummary>,
    pub grid: GridSnapshot,
    pub wars: Vec<WarSummary>,
    pub battles: Vec<(u16, u16)>,
    pub world_war_active: bool,
    pub economy: EconomySnapshot,
    pub events: Vec<WorldEvent>,
}
