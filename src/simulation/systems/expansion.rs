//! Territorial expansion and settlement founding.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::simulation::{
    NationId, NationRef, Nations, TerritoryGrid, WorldEvent, WorldEventKind, WorldEventLog,
    nation::{City, random_city_name},
};

/// Push the frontier outward. Stronger armies press more tiles per turn;
/// enemy land can be taken directly while at war, with an 85% success roll.
pub fn expand_nation(
    actor: NationId,
    nations: &Nations,
    grid: &mut TerritoryGrid,
    rng: &mut SmallRng,
) {
    let Some(nation) = nations.get(actor) else {
        return;
    };
    let attempts = (7 * nation.army_strength as usize) / 3;
    let mut pool = grid.border_tiles(actor, None);

    for _ in 0..attempts {
        if pool.is_empty() {
            break;
        }
        let pick = rng.gen_range(0..pool.len());
        let (x, y) = pool.swap_remove(pick);
        let targets = grid.expandable_neighbors(x, y, actor);
        let Some(&(tx, ty)) = targets.choose(rng) else {
            continue;
        };
        match grid.owner_at(tx, ty) {
            None => grid.set_owner(tx, ty, Some(actor)),
            Some(other) => {
                if nation.at_war_with.contains(&other) && rng.gen_bool(0.85) {
                    grid.set_owner(tx, ty, Some(actor));
                }
            }
        }
    }
}

/// Found a city on a random owned tile that has none. The first city of a
/// nation becomes its capital.
pub fn found_city(
    actor: NationId,
    nations: &mut Nations,
    grid: &TerritoryGrid,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let territory = grid.territory_of(actor);
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    let candidates: Vec<(u16, u16)> = territory
        .into_iter()
        .filter(|&(x, y)| !nation.cities.iter().any(|c| c.x == x && c.y == y))
        .collect();
    let Some(&(x, y)) = candidates.choose(rng) else {
        return;
    };
    let name = random_city_name(rng);
    let is_capital = nation.cities.is_empty();
    nation.cities.push(City {
        x,
        y,
        name: name.clone(),
        size: rng.gen_range(1..=3),
        is_capital,
    });
    events.push(WorldEvent::new(
        year,
        WorldEventKind::CityFounded {
            nation: NationRef::of(nation),
            name,
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::grid::Terrain;
    use crate::simulation::nation::{Government, Nation};
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn nation(id: u32, army: u8) -> Nation {
        Nation {
            id: NationId(id),
            name: format!("Nation {id}"),
            color: (90, 90, 90),
            government: Government::Tribal,
            stability: 70.0,
            gdp: 800.0,
            population: 900_000.0,
            army_strength: army,
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
    fn expansion_claims_only_reachable_land() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        nations.insert(nation(a.0, 6));
        let mut grid = TerritoryGrid::new(8, 8);
        for y in 0..8 {
            let idx = grid.idx(4, y);
            grid.terrain[idx] = Terrain::DeepWater;
        }
        grid.set_owner(1, 1, Some(a));

        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..40 {
            expand_nation(a, &nations, &mut grid, &mut rng);
        }

        // The water column blocks the east half entirely.
        for y in 0..8u16 {
            for x in 4..8u16 {
                assert_ne!(grid.owner_at(x, y), Some(a));
            }
        }
        assert!(grid.territory_count(a) > 1);
    }

    #[test]
    fn enemy_land_needs_an_active_war() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        nations.insert(nation(a.0, 6));
        nations.insert(nation(b.0, 3));
        let mut grid = TerritoryGrid::new(6, 3);
        for y in 0..3 {
            for x in 0..3 {
                grid.set_owner(x, y, Some(a));
            }
            for x in 3..6 {
                grid.set_owner(x, y, Some(b));
            }
        }
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..30 {
            expand_nation(a, &nations, &mut grid, &mut rng);
        }
        assert_eq!(grid.territory_count(b), 9, "no capture while at peace");
    }

    #[test]
    fn first_city_is_the_capital() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        nations.insert(nation(a.0, 3));
        let mut grid = TerritoryGrid::new(4, 4);
        grid.set_owner(1, 1, Some(a));
        grid.set_owner(2, 1, Some(a));
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(1);

        found_city(a, &mut nations, &grid, &mut events, 3, &mut rng);
        found_city(a, &mut nations, &grid, &mut events, 4, &mut rng);

        let n = nations.get(a).unwrap();
        assert_eq!(n.cities.len(), 2);
        assert_eq!(n.cities.iter().filter(|c| c.is_capital).count(), 1);
        assert!(n.cities[0].is_capital);
    }
}
