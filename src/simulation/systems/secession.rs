//! Secession: unstable sprawling nations splinter into rebel states that
//! immediately fight their parent for independence.

use std::collections::VecDeque;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::simulation::{
    ActiveWars, NationId, NationRef, Nations, RebellionFrequency, TerritoryGrid, WorldEvent,
    WorldEventKind, WorldEventLog,
    nation::{Nation, hue_shifted},
    systems::warfare::declare_war,
};

const MIN_TERRITORY: usize = 50;
const COOLDOWN_YEARS: u32 = 50;
const STABILITY_CEILING: f32 = 55.0;

/// Weigh a revolt inside `parent`. Returns the new rebel's id when one
/// breaks away. A revolt needs a large, unstable parent, an off-cooldown
/// unrest clock, and a provincial city to rally around.
pub fn attempt_secession(
    parent_id: NationId,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    wars: &mut ActiveWars,
    events: &mut WorldEventLog,
    frequency: RebellionFrequency,
    year: u32,
    rng: &mut SmallRng,
) -> Option<NationId> {
    let multiplier = frequency.multiplier()?;

    let parent_tiles = grid.territory_count(parent_id);
    if parent_tiles < MIN_TERRITORY {
        return None;
    }
    let seed_city = {
        let parent = nations.get_mut(parent_id)?;
        if parent.last_revolt_year != 0 && year.saturating_sub(parent.last_revolt_year) <= COOLDOWN_YEARS
        {
            return None;
        }
        // The unrest clock resets every time a large nation is weighed,
        // revolt or not.
        parent.last_revolt_year = year;
        if parent.stability >= STABILITY_CEILING {
            return None;
        }
        let chance = (STABILITY_CEILING - parent.stability) / 300.0 * multiplier;
        if rng.gen_range(0.0..1.0f32) >= chance {
            return None;
        }
        // Rally point: any provincial city, or a sizable one as fallback.
        let provincial: Vec<usize> = parent
            .cities
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_capital)
            .map(|(i, _)| i)
            .collect();
        let pick = provincial.choose(rng).copied().or_else(|| {
            parent
                .cities
                .iter()
                .position(|c| c.size >= 2)
        })?;
        pick
    };

    let rebel_id = nations.allocate_id();
    let (mut seed_city, rebel) = {
        let parent = nations.get_mut(parent_id)?;
        let city = parent.cities.remove(seed_city);
        let rebel = Nation {
            id: rebel_id,
            name: format!("Free {}", city.name),
            color: hue_shifted(parent.color, rng),
            government: parent.government,
            stability: 70.0,
            gdp: parent.gdp * 0.3,
            population: parent.population * rng.gen_range(0.10..0.30),
            army_strength: 2,
            allies: Vec::new(),
            vassals: Vec::new(),
            overlord: None,
            at_war_with: Vec::new(),
            war_start_years: Default::default(),
            trade_resources: parent.trade_resources.clone(),
            cities: Vec::new(),
            navies: Vec::new(),
            is_rebel: true,
            last_revolt_year: year,
        };
        (city, rebel)
    };

    let share = rng.gen_range(0.10..0.25);
    let budget = ((parent_tiles as f32 * share) as usize).max(4);
    // The heartland is a radius-3 disc around the rally city; the rest of
    // the breakaway grows outward from it through parent land.
    let mut claimed: Vec<(u16, u16)> = Vec::new();
    for dy in -3i32..=3 {
        for dx in -3i32..=3 {
            if dx * dx + dy * dy > 9 {
                continue;
            }
            let (x, y) = (seed_city.x as i32 + dx, seed_city.y as i32 + dy);
            if grid.in_bounds(x, y) {
                let (x, y) = (x as u16, y as u16);
                if grid.owner_at(x, y) == Some(parent_id) {
                    claimed.push((x, y));
                }
            }
        }
    }
    let mut frontier: VecDeque<(u16, u16)> = claimed.iter().copied().collect();
    while claimed.len() < budget {
        let Some((x, y)) = frontier.pop_front() else {
            break;
        };
        for (nx, ny) in grid.neighbors4(x, y) {
            if claimed.len() >= budget {
                break;
            }
            if grid.owner_at(nx, ny) == Some(parent_id) && !claimed.contains(&(nx, ny)) {
                claimed.push((nx, ny));
                frontier.push_back((nx, ny));
            }
        }
    }
    if claimed.is_empty() {
        // The rally city sat on lost ground; put it back and call off the
        // revolt.
        if let Some(parent) = nations.get_mut(parent_id) {
            parent.cities.push(seed_city);
        }
        return None;
    }
    for &(x, y) in &claimed {
        grid.set_owner(x, y, Some(rebel_id));
    }
    seed_city.is_capital = true;
    let mut rebel = rebel;
    rebel.cities.push(seed_city);

    let parent_ref = nations.get(parent_id).map(NationRef::of)?;
    let rebel_ref = NationRef::of(&rebel);
    nations.insert(rebel);

    // The rebellion opens with a war the rebel starts, fought alone.
    declare_war(rebel_id, parent_id, nations, wars, events, year, rng, false);
    events.push(WorldEvent::new(
        year,
        WorldEventKind::Rebellion {
            parent: parent_ref,
            rebel: rebel_ref,
        },
    ));
    Some(rebel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::nation::{City, Government};
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn sprawling_parent(stability: f32) -> (Nations, TerritoryGrid) {
        let mut nations = Nations::default();
        let id = nations.allocate_id();
        let mut grid = TerritoryGrid::new(12, 8);
        for y in 0..8 {
            for x in 0..12 {
                grid.set_owner(x, y, Some(id));
            }
        }
        nations.insert(Nation {
            id,
            name: "Velmark".into(),
            color: (200, 60, 40),
            government: Government::Empire,
            stability,
            gdp: 2_000.0,
            population: 4_000_000.0,
            army_strength: 4,
            allies: Vec::new(),
            vassals: Vec::new(),
            overlord: None,
            at_war_with: Vec::new(),
            war_start_years: HashMap::new(),
            trade_resources: vec!["iron".into()],
            cities: vec![
                City { x: 1, y: 1, name: "Korhaven".into(), size: 3, is_capital: true },
                City { x: 9, y: 6, name: "Ostford".into(), size: 2, is_capital: false },
            ],
            navies: Vec::new(),
            is_rebel: false,
            last_revolt_year: 0,
        });
        (nations, grid)
    }

    fn force_revolt(
        nations: &mut Nations,
        grid: &mut TerritoryGrid,
        wars: &mut ActiveWars,
        events: &mut WorldEventLog,
        rng: &mut SmallRng,
    ) -> Option<NationId> {
        // The trigger roll is random; retry past the cooldown until it lands.
        for attempt in 0..200u32 {
            let year = 1 + attempt * 51;
            if let Some(rebel) = attempt_secession(
                NationId(0), nations, grid, wars, events,
                RebellionFrequency::High, year, rng,
            ) {
                return Some(rebel);
            }
        }
        None
    }

    #[test]
    fn revolt_splits_territory_and_opens_a_war() {
        let (mut nations, mut grid) = sprawling_parent(10.0);
        let mut wars = ActiveWars::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(21);

        let rebel = force_revolt(&mut nations, &mut grid, &mut wars, &mut events, &mut rng)
            .expect("an unstable empire revolts eventually");

        let rebel_tiles = grid.territory_count(rebel);
        assert!(rebel_tiles >= 4 && rebel_tiles < 96 / 3);
        assert_eq!(grid.territory_count(NationId(0)) + rebel_tiles, 96);
        assert!(wars.between(rebel, NationId(0)).is_some());

        let rebel_nation = nations.get(rebel).unwrap();
        assert!(rebel_nation.is_rebel);
        assert_eq!(rebel_nation.cities.len(), 1);
        assert!(rebel_nation.cities[0].is_capital);
        assert_ne!(rebel_nation.color, nations.get(NationId(0)).unwrap().color);
    }

    #[test]
    fn stable_nations_never_revolt() {
        let (mut nations, mut grid) = sprawling_parent(90.0);
        let mut wars = ActiveWars::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(22);
        assert!(force_revolt(&mut nations, &mut grid, &mut wars, &mut events, &mut rng).is_none());
    }

    #[test]
    fn cooldown_blocks_back_to_back_checks() {
        let (mut nations, mut grid) = sprawling_parent(10.0);
        let mut wars = ActiveWars::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(23);

        attempt_secession(
            NationId(0), &mut nations, &mut grid, &mut wars, &mut events,
            RebellionFrequency::High, 5, &mut rng,
        );
        assert_eq!(nations.get(NationId(0)).unwrap().last_revolt_year, 5);
        // Within the cooldown window the clock never advances.
        attempt_secession(
            NationId(0), &mut nations, &mut grid, &mut wars, &mut events,
            RebellionFrequency::High, 30, &mut rng,
        );
        assert_eq!(nations.get(NationId(0)).unwrap().last_revolt_year, 5);
    }

    #[test]
    fn disabled_frequency_is_inert() {
        let (mut nations, mut grid) = sprawling_parent(10.0);
        let mut wars = ActiveWars::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(24);
        for year in [1, 100, 200] {
            assert!(attempt_secession(
                NationId(0), &mut nations, &mut grid, &mut wars, &mut events,
                RebellionFrequency::Off, year, &mut rng,
            )
            .is_none());
        }
        assert_eq!(nations.get(NationId(0)).unwrap().last_revolt_year, 0);
    }
}
