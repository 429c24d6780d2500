//! The yearly nation turn: upkeep, then one rolled action.
//!
//! Turn order is the registry's creation order, snapshotted at the start of
//! the phase; nations created mid-phase first act the following year.

use bevy_ecs::prelude::*;
use rand::Rng;
use rand::rngs::SmallRng;

use crate::simulation::{
    ActiveWars, NationId, NationRef, Nations, SimRng, SimulationConfig, TerritoryGrid,
    TradeNetwork, WorldAggression, WorldEvent, WorldEventKind, WorldEventLog, WorldTime,
    WorldWarState,
    nation::remove_nation,
    systems::{
        diplomacy::{
            attempt_alliance, attempt_peace, attempt_trade, attempt_vassalization,
            consider_world_war,
        },
        expansion::{expand_nation, found_city},
        navy::{attempt_colonization, build_navy, process_navy_missions},
        secession::attempt_secession,
        warfare::consider_war,
    },
};

/// Stability drifts up in peace, down in war, and tracks how the war is
/// going on the map.
fn update_stability(actor: NationId, nations: &mut Nations, grid: &TerritoryGrid) {
    let enemies: Vec<(NationId, usize)> = nations
        .get(actor)
        .map(|n| {
            n.at_war_with
                .iter()
                .map(|e| (*e, grid.territory_count(*e)))
                .collect()
        })
        .unwrap_or_default();
    let own = grid.territory_count(actor) as f32;
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    if enemies.is_empty() {
        nation.stability = (nation.stability + 1.0).min(100.0);
        return;
    }
    nation.stability = (nation.stability - 2.0).max(10.0);
    for (_, enemy_tiles) in enemies {
        let enemy_tiles = enemy_tiles as f32;
        if own > enemy_tiles * 1.5 {
            nation.stability = (nation.stability + 1.0).min(100.0);
        } else if own * 1.5 < enemy_tiles {
            nation.stability = (nation.stability - 2.0).max(10.0);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rolled_action(
    roll: f32,
    actor: NationId,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    wars: &mut ActiveWars,
    world_war: &mut WorldWarState,
    trade: &mut TradeNetwork,
    events: &mut WorldEventLog,
    aggression: WorldAggression,
    year: u32,
    rng: &mut SmallRng,
) {
    let expansion = aggression.expansion_threshold();
    let war = expansion + aggression.war_chance();
    if roll < expansion {
        expand_nation(actor, nations, grid, rng);
        if rng.gen_bool(0.20) {
            found_city(actor, nations, grid, events, year, rng);
        }
        if rng.gen_bool(0.15) && grid.has_sea_access(actor) {
            build_navy(actor, nations, grid, events, year, rng);
        }
        if rng.gen_bool(0.12) {
            attempt_colonization(actor, nations, rng);
        }
    } else if roll < war {
        consider_war(actor, nations, grid, wars, events, year, rng);
    } else if roll < war + 0.03 {
        attempt_peace(actor, nations, grid, wars, trade, events, year, rng);
    } else if roll < war + 0.05 {
        attempt_alliance(actor, nations, grid, events, year, rng);
    } else if roll < war + 0.06 {
        attempt_trade(actor, nations, trade, events, year, rng);
    } else if roll < war + 0.07 {
        attempt_vassalization(actor, nations, grid, wars, events, year, rng);
    } else if roll >= 0.98 {
        // Escalation only fires once every diplomatic band has had its
        // slice of the roll.
        if aggression == WorldAggression::Peaceful {
            return;
        }
        if aggression == WorldAggression::Cautious && rng.gen_bool(0.7) {
            return;
        }
        consider_world_war(nations, grid, wars, world_war, events, year, rng);
    }
}

pub fn nation_turn_system(
    mut nations: ResMut<Nations>,
    mut grid: ResMut<TerritoryGrid>,
    mut wars: ResMut<ActiveWars>,
    mut world_war: ResMut<WorldWarState>,
    mut trade: ResMut<TradeNetwork>,
    mut events: ResMut<WorldEventLog>,
    time: Res<WorldTime>,
    config: Res<SimulationConfig>,
    mut rng: ResMut<SimRng>,
) {
    let nations = &mut *nations;
    let grid = &mut *grid;
    let wars = &mut *wars;
    let world_war = &mut *world_war;
    let trade = &mut *trade;
    let events = &mut *events;
    let rng = &mut rng.0;
    let year = time.year;

    for actor in nations.ids() {
        if !nations.contains(actor) {
            continue;
        }

        // Landless free nations are gone; landless vassals survive under
        // their overlord's wing.
        let landless = grid.territory_count(actor) == 0;
        if landless && nations.get(actor).map(|n| n.overlord.is_none()).unwrap_or(true) {
            if let Some(fallen) = remove_nation(actor, nations, grid, wars, trade) {
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::NationCollapsed {
                        nation: NationRef::of(&fallen),
                    },
                ));
            }
            continue;
        }

        if !rng.gen_bool(0.60) {
            continue;
        }

        if rng.gen_bool(0.15) {
            attempt_secession(
                actor, nations, grid, wars, events, config.rebellions, year, rng,
            );
            continue;
        }

        update_stability(actor, nations, grid);
        crate::simulation::systems::economy::update_nation_economy(
            actor, nations, trade, events, year, rng,
        );
        if rng.gen_bool(0.20) {
            if let Some(nation) = nations.get_mut(actor) {
                let drift: i8 = if rng.gen_bool(0.5) { 1 } else { -1 };
                nation.army_strength =
                    (nation.army_strength as i8 + drift).clamp(1, 6) as u8;
            }
        }
        process_navy_missions(actor, nations, grid, events, year, rng);
        attempt_secession(
            actor, nations, grid, wars, events, config.rebellions, year, rng,
        );
        let roll: f32 = rng.gen_range(0.0..1.0);
        rolled_action(
            roll, actor, nations, grid, wars, world_war, trade, events, config.aggression, year,
            rng,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::nation::{Government, Nation};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashMap;

    fn nation(id: u32, stability: f32) -> Nation {
        Nation {
            id: NationId(id),
            name: format!("Nation {id}"),
            color: (110, 110, 110),
            government: Government::Republic,
            stability,
            gdp: 1_000.0,
            population: 1_500_000.0,
            army_strength: 3,
            allies: Vec::new(),
            vassals: Vec::new(),
            overlord: None,
            at_war_with: Vec::new(),
            war_start_years: HashMap::new(),
            trade_resources: vec!["grain".into()],
            cities: Vec::new(),
            navies: Vec::new(),
            is_rebel: false,
            last_revolt_year: 0,
        }
    }

    #[test]
    fn peace_raises_and_war_erodes_stability() {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        nations.insert(nation(a.0, 50.0));
        nations.insert(nation(b.0, 50.0));
        let mut grid = TerritoryGrid::new(8, 2);
        for x in 0..8u16 {
            grid.set_owner(x, 0, Some(a));
        }
        grid.set_owner(0, 1, Some(b));

        update_stability(a, &mut nations, &grid);
        assert_eq!(nations.get(a).unwrap().stability, 51.0);

        nations.get_mut(a).unwrap().at_war_with.push(b);
        nations.get_mut(b).unwrap().at_war_with.push(a);
        // a holds 8 tiles against b's 1: the war is going well.
        update_stability(a, &mut nations, &grid);
        assert_eq!(nations.get(a).unwrap().stability, 50.0);
        // For b the same front reads as a disaster.
        update_stability(b, &mut nations, &grid);
        assert_eq!(nations.get(b).unwrap().stability, 46.0);
    }

    fn sim_world(seed: u64) -> (World, Schedule) {
        let mut world = World::new();
        let mut nations = Nations::default();
        let mut grid = TerritoryGrid::new(16, 16);
        for i in 0..2u32 {
            let id = nations.allocate_id();
            nations.insert(nation(id.0, 80.0));
            for y in 0..4u16 {
                for x in 0..4u16 {
                    grid.set_owner(x + (i as u16) * 8, y, Some(id));
                }
            }
        }
        world.insert_resource(nations);
        world.insert_resource(grid);
        world.insert_resource(ActiveWars::default());
        world.insert_resource(WorldWarState::default());
        world.insert_resource(TradeNetwork::default());
        world.insert_resource(WorldEventLog::default());
        world.insert_resource(WorldTime::default());
        world.insert_resource(SimulationConfig::default());
        world.insert_resource(SimRng(SmallRng::seed_from_u64(seed)));
        let mut schedule = Schedule::default();
        schedule.add_systems(nation_turn_system);
        (world, schedule)
    }

    #[test]
    fn landless_free_nations_collapse() {
        let (mut world, mut schedule) = sim_world(61);
        world.resource_mut::<TerritoryGrid>().scrub_owner(NationId(1));
        world.resource_mut::<WorldTime>().year = 1;
        schedule.run(&mut world);
        assert!(world.resource::<Nations>().get(NationId(1)).is_none());
        assert!(world.resource::<Nations>().contains(NationId(0)));
    }

    #[test]
    fn landless_vassals_survive_under_an_overlord() {
        let (mut world, mut schedule) = sim_world(62);
        world.resource_mut::<TerritoryGrid>().scrub_owner(NationId(1));
        {
            let mut nations = world.resource_mut::<Nations>();
            nations.get_mut(NationId(1)).unwrap().overlord = Some(NationId(0));
            nations.get_mut(NationId(0)).unwrap().vassals.push(NationId(1));
        }
        world.resource_mut::<WorldTime>().year = 1;
        schedule.run(&mut world);
        assert!(world.resource::<Nations>().contains(NationId(1)));
    }

    #[test]
    fn vassalization_band_never_escalates_to_world_war() {
        // Six nations in rows: 0 looms over tiny 1, while 2+3 and 4+5 form
        // two alliance blocs an escalation roll could ignite.
        let mut nations = Nations::default();
        let mut grid = TerritoryGrid::new(8, 6);
        for i in 0..6u32 {
            let id = nations.allocate_id();
            nations.insert(nation(id.0, 90.0));
            for x in 0..8u16 {
                grid.set_owner(x, i as u16, Some(id));
            }
        }
        for x in 2..8u16 {
            grid.set_owner(x, 1, None);
        }
        for (a, b) in [(2u32, 3u32), (4, 5)] {
            let (x, y) = nations.get_pair_mut(NationId(a), NationId(b)).unwrap();
            x.allies.push(NationId(b));
            y.allies.push(NationId(a));
        }
        let mut wars = ActiveWars::default();
        let mut world_war = WorldWarState::default();
        let mut trade = TradeNetwork::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(64);

        // At Balanced the band [0.98, 0.99) belongs to vassalization.
        for year in 1..=50 {
            rolled_action(
                0.985, NationId(0), &mut nations, &mut grid, &mut wars, &mut world_war,
                &mut trade, &mut events, WorldAggression::Balanced, year, &mut rng,
            );
            assert!(!world_war.active, "the vassalization band never escalates");
        }
        assert_eq!(nations.get(NationId(1)).unwrap().overlord, Some(NationId(0)));

        // The very top of the roll still escalates.
        rolled_action(
            0.995, NationId(0), &mut nations, &mut grid, &mut wars, &mut world_war,
            &mut trade, &mut events, WorldAggression::Balanced, 60, &mut rng,
        );
        assert!(world_war.active);
    }

    #[test]
    fn long_runs_keep_the_world_consistent() {
        let (mut world, mut schedule) = sim_world(63);
        for year in 1..=150 {
            world.resource_mut::<WorldTime>().year = year;
            schedule.run(&mut world);
        }
        let nations = world.resource::<Nations>();
        let grid = world.resource::<TerritoryGrid>();
        let wars = world.resource::<ActiveWars>();
        for (idx, owner) in grid.owner.iter().enumerate() {
            if let Some(id) = owner {
                assert!(nations.contains(*id), "owned tiles always have a live owner");
                assert!(!grid.terrain[idx].is_water(), "water is never owned");
            }
        }
        for war in &wars.list {
            assert!(nations.get(war.attacker).unwrap().at_war_with.contains(&war.defender));
            assert!(nations.get(war.defender).unwrap().at_war_with.contains(&war.attacker));
        }
    }
}
