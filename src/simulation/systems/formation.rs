//! Spontaneous nation formation on unclaimed land.

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::simulation::{
    NationRef, Nations, SimRng, TerritoryGrid, WorldEvent, WorldEventKind, WorldEventLog,
    WorldTime,
    grid::claim_starting_patch,
    nation::{
        City, Government, Nation, random_city_name, random_color, random_nation_name,
        random_trade_resources,
    },
};

/// Each year there is a small chance a new nation coalesces out of
/// unclaimed land, as long as enough of it remains.
pub fn formation_system(
    mut nations: ResMut<Nations>,
    mut grid: ResMut<TerritoryGrid>,
    mut events: ResMut<WorldEventLog>,
    time: Res<WorldTime>,
    mut rng: ResMut<SimRng>,
) {
    let rng = &mut rng.0;
    if !rng.gen_bool(0.05) {
        return;
    }
    if grid.unclaimed_land_tiles().len() <= 15 {
        return;
    }

    let id = nations.allocate_id();
    let tiles = rng.gen_range(12..=20);
    let patch = claim_starting_patch(&mut grid, id, tiles, rng);
    if patch.is_empty() {
        return;
    }

    let (cx, cy) = patch[0];
    let nation = Nation {
        id,
        name: random_nation_name(rng),
        color: random_color(rng),
        government: Government::random(rng),
        stability: 100.0,
        gdp: rng.gen_range(500.0..1500.0),
        population: rng.gen_range(500_000.0..5_500_000.0),
        army_strength: rng.gen_range(1..=6),
        allies: Vec::new(),
        vassals: Vec::new(),
        overlord: None,
        at_war_with: Vec::new(),
        war_start_years: Default::default(),
        trade_resources: random_trade_resources(rng),
        cities: vec![City {
            x: cx,
            y: cy,
            name: random_city_name(rng),
            size: 1,
            is_capital: true,
        }],
        navies: Vec::new(),
        is_rebel: false,
        last_revolt_year: 0,
    };
    events.push(WorldEvent::new(
        time.year,
        WorldEventKind::NationFormed {
            nation: NationRef::of(&nation),
            tiles: patch.len(),
        },
    ));
    nations.insert(nation);
}
