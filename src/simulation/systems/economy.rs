//! Per-nation economics and the global trade pass.

use bevy_ecs::prelude::*;
use rand::Rng;
use rand::rngs::SmallRng;

use crate::simulation::{
    ActiveWars, DisasterKind, NationId, NationRef, Nations, SimRng, TradeNetwork, WorldEconomy,
    WorldEvent, WorldEventKind, WorldEventLog, WorldTime, nation::new_trade_resource,
};

const GDP_FLOOR: f32 = 100.0;

/// Advance one nation's GDP, population, and war weariness for a year.
/// Growth rates are small and clamped, so figures drift rather than swing.
pub fn update_nation_economy(
    actor: NationId,
    nations: &mut Nations,
    trade: &TradeNetwork,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let route_count = trade.routes_of(actor);
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };

    let war_count = nation.at_war_with.len();
    let city_sizes: u32 = nation.cities.iter().map(|c| c.size as u32).sum();
    let long_wars: Vec<u32> = nation
        .war_start_years
        .values()
        .map(|start| year.saturating_sub(*start))
        .collect();

    let mut gdp_growth = 0.005 + 0.002 * route_count as f32 + 0.001 * city_sizes as f32
        - 0.01 * war_count as f32;
    for duration in &long_wars {
        if *duration > 10 {
            gdp_growth -= 0.005 * (duration - 10).min(20) as f32;
        }
    }
    if nation.stability < 50.0 {
        gdp_growth -= (50.0 - nation.stability) / 500.0;
    }
    if nation.stability < 25.0 {
        gdp_growth -= 0.01;
    }
    gdp_growth = gdp_growth.clamp(-0.02, 0.01);
    nation.gdp = (nation.gdp * (1.0 + gdp_growth)).max(GDP_FLOOR);

    let mut pop_growth = 0.001 + gdp_growth / 10.0 - 0.005 * war_count as f32;
    for duration in &long_wars {
        if *duration > 5 {
            pop_growth -= 0.002 * (duration - 5).min(15) as f32;
        }
    }
    pop_growth = pop_growth.clamp(-0.01, 0.003);
    nation.population = (nation.population * (1.0 + pop_growth as f64)).max(1_000.0);

    // A decade of war risks an internal crisis each year it drags on.
    if long_wars.iter().any(|d| *d > 10) && rng.gen_bool(0.10) {
        nation.gdp = (nation.gdp * 0.95).max(GDP_FLOOR);
        nation.population *= 0.98;
    }

    // Rare disasters.
    if rng.gen_bool(0.001) {
        let roll: f32 = rng.gen_range(0.0..1.0);
        let kind = if roll < 0.3 {
            nation.population *= 0.85;
            nation.stability = (nation.stability - 20.0).max(10.0);
            DisasterKind::Plague
        } else if roll < 0.6 {
            nation.gdp = (nation.gdp * 0.7).max(GDP_FLOOR);
            nation.stability = (nation.stability - 15.0).max(10.0);
            DisasterKind::EconomicCollapse
        } else {
            nation.population *= 0.95;
            nation.gdp = (nation.gdp * 0.9).max(GDP_FLOOR);
            nation.stability = (nation.stability - 10.0).max(10.0);
            DisasterKind::NaturalDisaster
        };
        events.push(WorldEvent::new(
            year,
            WorldEventKind::Disaster {
                nation: NationRef::of(nation),
                kind,
            },
        ));
    }
}

/// Yearly global pass: routes decay under war and mature in peace, pay out
/// to both ends, and the world aggregates are refreshed.
pub fn global_economy_system(
    mut nations: ResMut<Nations>,
    mut trade: ResMut<TradeNetwork>,
    mut economy: ResMut<WorldEconomy>,
    wars: Res<ActiveWars>,
    time: Res<WorldTime>,
    mut rng: ResMut<SimRng>,
) {
    let nations = &mut *nations;
    let trade = &mut *trade;
    let rng = &mut rng.0;
    let year = time.year;

    trade
        .routes
        .retain(|r| nations.contains(r.a) && nations.contains(r.b));

    let mut volume = 0.0f32;
    for route in trade.routes.iter_mut() {
        if wars.between(route.a, route.b).is_some() {
            route.value = (route.value - 1.0).max(0.0);
            continue;
        }
        if route.value < 10.0 && rng.gen_bool(0.10) {
            route.value += 1.0;
        }
        // Mature routes can grow past the usual ceiling.
        if route.value < 15.0
            && year.saturating_sub(route.established_year) > 20
            && rng.gen_bool(0.10)
        {
            route.value += 1.0;
        }
        if route.value > 0.0 {
            let payout = (route.value * 0.1).floor();
            if let Some((a, b)) = nations.get_pair_mut(route.a, route.b) {
                a.gdp += payout;
                b.gdp += payout;
            }
            volume += route.value;
        }
    }
    trade.global_trade_volume = volume;

    // Trade exposure occasionally teaches a nation a new export.
    for nation in nations.iter_mut() {
        if trade.routes.iter().any(|r| r.a == nation.id || r.b == nation.id)
            && rng.gen_bool(0.05)
        {
            if let Some(resource) = new_trade_resource(rng, &nation.trade_resources) {
                nation.trade_resources.push(resource);
            }
        }
    }

    economy.world_gdp = nations.iter().map(|n| n.gdp as f64).sum();
    economy.global_resources.clear();
    for nation in nations.iter() {
        for resource in &nation.trade_resources {
            *economy.global_resources.entry(resource.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<&crate::simulation::nation::Nation> = nations.iter().collect();
    ranked.sort_by(|a, b| b.gdp.partial_cmp(&a.gdp).unwrap_or(std::cmp::Ordering::Equal));
    economy.economic_centers = ranked
        .into_iter()
        .take(3)
        .map(|n| {
            let city = n
                .largest_city()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| n.name.clone());
            (n.id, city)
        })
        .collect();
}
