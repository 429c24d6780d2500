//! War declaration, battles, and peace resolution.

use bevy_ecs::prelude::*;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::simulation::{
    ActiveWar, ActiveWars, BattleFlashes, NationId, NationRef, Nations, PeaceOutcome, SimRng,
    TerritoryGrid, TradeNetwork, WorldEvent, WorldEventKind, WorldEventLog, WorldTime,
    nation::remove_nation,
};

/// Symmetric war bookkeeping plus the war entry itself. The auto-end year is
/// rolled here, once, and never changes afterwards.
pub fn declare_war(
    attacker: NationId,
    defender: NationId,
    nations: &mut Nations,
    wars: &mut ActiveWars,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
    is_world_war: bool,
) {
    if attacker == defender || wars.between(attacker, defender).is_some() {
        return;
    }
    let Some((atk, def)) = nations.get_pair_mut(attacker, defender) else {
        return;
    };
    atk.at_war_with.push(defender);
    atk.war_start_years.insert(defender, year);
    def.at_war_with.push(attacker);
    def.war_start_years.insert(attacker, year);
    atk.stability = (atk.stability - 10.0).max(10.0);
    def.stability = (def.stability - 15.0).max(10.0);
    let event = WorldEventKind::WarDeclared {
        attacker: NationRef::of(atk),
        defender: NationRef::of(def),
    };
    wars.list.push(ActiveWar {
        attacker,
        defender,
        start_year: year,
        battle_cooldown: 0,
        auto_end_year: year + 20 + rng.gen_range(0..10),
        is_world_war,
    });
    events.push(WorldEvent::new(year, event));
}

/// A nation weighing a war declaration during its turn. Vassals never
/// declare; low stability makes a declaration more likely, not less.
pub fn consider_war(
    actor: NationId,
    nations: &mut Nations,
    grid: &TerritoryGrid,
    wars: &mut ActiveWars,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let Some(nation) = nations.get(actor) else {
        return;
    };
    if nation.overlord.is_some() {
        return;
    }
    let gate = 0.05 + (100.0 - nation.stability) / 100.0 * 0.1;
    if rng.gen_range(0.0..1.0f32) > gate {
        return;
    }
    let candidates: Vec<NationId> = grid
        .neighboring_nations(actor)
        .into_iter()
        .filter(|c| {
            !nation.allies.contains(c)
                && !nation.vassals.contains(c)
                && nation.overlord != Some(*c)
                && !nation.at_war_with.contains(c)
        })
        .collect();
    let Some(&target) = candidates.choose(rng) else {
        return;
    };

    declare_war(actor, target, nations, wars, events, year, rng, false);

    // Allies on both sides each weigh joining independently.
    let attacker_allies = nations.get(actor).map(|n| n.allies.clone()).unwrap_or_default();
    let defender_allies = nations.get(target).map(|n| n.allies.clone()).unwrap_or_default();
    for ally in attacker_allies {
        if rng.gen_bool(0.6) {
            declare_war(ally, target, nations, wars, events, year, rng, false);
        }
    }
    for ally in defender_allies {
        if rng.gen_bool(0.6) {
            declare_war(ally, actor, nations, wars, events, year, rng, false);
        }
    }
}

fn battle(
    attacker: NationId,
    defender: NationId,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    events: &mut WorldEventLog,
    flashes: &mut BattleFlashes,
    year: u32,
    rng: &mut SmallRng,
) {
    let front = grid.border_tiles(attacker, Some(defender));
    let Some(&(fx, fy)) = front.choose(rng) else {
        return;
    };
    let targets: Vec<(u16, u16)> = grid
        .neighbors4(fx, fy)
        .into_iter()
        .filter(|&(x, y)| grid.owner_at(x, y) == Some(defender))
        .collect();
    let Some(&target) = targets.choose(rng) else {
        return;
    };

    let (attack_power, defense_power) = {
        let atk = nations.get(attacker).map(|n| n.army_strength).unwrap_or(1);
        let def = nations.get(defender).map(|n| n.army_strength).unwrap_or(1);
        (
            atk as f32 + rng.gen_range(0.0..3.0),
            def as f32 + rng.gen_range(0.0..3.0),
        )
    };

    if attack_power > defense_power {
        let margin = attack_power - defense_power;
        let budget = ((margin * rng.gen_range(0.5..1.0)).floor() as usize).clamp(1, 5);
        let captured =
            grid.flood_collect(target, budget, |g, x, y| g.owner_at(x, y) == Some(defender));
        for &(x, y) in &captured {
            grid.set_owner(x, y, Some(attacker));
        }
        if let Some((atk, def)) = nations.get_pair_mut(attacker, defender) {
            atk.stability = (atk.stability + 1.0).min(100.0);
            def.stability = (def.stability - 3.0).max(10.0);
            events.push(WorldEvent::new(
                year,
                WorldEventKind::Battle {
                    winner: NationRef::of(atk),
                    loser: NationRef::of(def),
                    tile: target,
                    captured: captured.len(),
                },
            ));
        }
        flashes.0.push(target);
    } else {
        // Defensive victory; occasionally the defender pushes the line back.
        let mut reclaimed = 0;
        if rng.gen_bool(0.3) {
            let counter = grid.border_tiles(defender, Some(attacker));
            if let Some(&(cx, cy)) = counter.choose(rng) {
                let taken: Vec<(u16, u16)> = grid
                    .neighbors4(cx, cy)
                    .into_iter()
                    .filter(|&(x, y)| grid.owner_at(x, y) == Some(attacker))
                    .collect();
                if let Some(&(tx, ty)) = taken.choose(rng) {
                    grid.set_owner(tx, ty, Some(defender));
                    reclaimed = 1;
                }
            }
        }
        if let Some((def, atk)) = nations.get_pair_mut(defender, attacker) {
            def.stability = (def.stability + 1.0).min(100.0);
            atk.stability = (atk.stability - 1.0).max(10.0);
            events.push(WorldEvent::new(
                year,
                WorldEventKind::Battle {
                    winner: NationRef::of(def),
                    loser: NationRef::of(atk),
                    tile: (fx, fy),
                    captured: reclaimed,
                },
            ));
        }
        flashes.0.push((fx, fy));
    }
}

fn clear_war_state(a: NationId, b: NationId, nations: &mut Nations, wars: &mut ActiveWars) {
    if let Some(n) = nations.get_mut(a) {
        n.at_war_with.retain(|e| *e != b);
        n.war_start_years.remove(&b);
    }
    if let Some(n) = nations.get_mut(b) {
        n.at_war_with.retain(|e| *e != a);
        n.war_start_years.remove(&a);
    }
    wars.remove_between(a, b);
}

/// End the war between `a` and `b`. With no forced winner, territory decides
/// (a 1.2x edge wins, otherwise white peace). Rebellion wars settle the
/// rebel's fate; regular wars can eliminate or vassalize the loser.
pub fn resolve_peace(
    a: NationId,
    b: NationId,
    forced_winner: Option<NationId>,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    wars: &mut ActiveWars,
    trade: &mut TradeNetwork,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    if !nations.contains(a) || !nations.contains(b) {
        clear_war_state(a, b, nations, wars);
        return;
    }
    let (ta, tb) = (grid.territory_count(a), grid.territory_count(b));
    let winner = forced_winner.or_else(|| {
        if ta as f32 > tb as f32 * 1.2 {
            Some(a)
        } else if tb as f32 > ta as f32 * 1.2 {
            Some(b)
        } else {
            None
        }
    });

    clear_war_state(a, b, nations, wars);

    let rebel = [a, b]
        .into_iter()
        .find(|id| nations.get(*id).map(|n| n.is_rebel).unwrap_or(false));

    if let Some(rebel_id) = rebel {
        let parent_id = if rebel_id == a { b } else { a };
        match winner {
            Some(w) if w == parent_id => {
                // Rebellion crushed: land and settlements revert.
                let rebel_tiles = grid.territory_of(rebel_id);
                for (x, y) in rebel_tiles {
                    grid.set_owner(x, y, Some(parent_id));
                }
                let (parent_ref, rebel_ref) = {
                    let (parent, rebel) = nations.get_pair_mut(parent_id, rebel_id).expect("both live");
                    parent.stability = (parent.stability + 15.0).min(100.0);
                    let mut cities = std::mem::take(&mut rebel.cities);
                    for city in cities.iter_mut() {
                        city.is_capital = false;
                    }
                    parent.cities.append(&mut cities);
                    (NationRef::of(parent), NationRef::of(rebel))
                };
                remove_nation(rebel_id, nations, grid, wars, trade);
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::PeaceTreaty {
                        a: parent_ref,
                        b: rebel_ref,
                        outcome: PeaceOutcome::RebelCrushed,
                    },
                ));
            }
            Some(_) => {
                let (rebel, parent) = nations.get_pair_mut(rebel_id, parent_id).expect("both live");
                rebel.stability = (rebel.stability + 20.0).min(100.0);
                rebel.is_rebel = false;
                rebel.overlord = None;
                parent.stability = (parent.stability - 15.0).max(10.0);
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::PeaceTreaty {
                        a: NationRef::of(rebel),
                        b: NationRef::of(parent),
                        outcome: PeaceOutcome::RebelFreed,
                    },
                ));
            }
            None => {
                white_peace(a, b, nations, events, year);
            }
        }
        return;
    }

    match winner {
        Some(w) => {
            let loser = if w == a { b } else { a };
            let event_refs = {
                let (win, lose) = nations.get_pair_mut(w, loser).expect("both live");
                win.stability = (win.stability + 15.0).min(100.0);
                lose.stability = (lose.stability - 10.0).max(10.0);
                (NationRef::of(win), NationRef::of(lose))
            };
            if grid.territory_count(loser) == 0 {
                remove_nation(loser, nations, grid, wars, trade);
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::NationCollapsed { nation: event_refs.1 },
                ));
                return;
            }
            let vassalize = {
                let loser_n = nations.get(loser).expect("live");
                grid.territory_count(loser) < grid.territory_count(w) / 2
                    && loser_n.overlord.is_none()
                    && rng.gen_bool(0.2)
            };
            if vassalize {
                let (win, lose) = nations.get_pair_mut(w, loser).expect("both live");
                win.vassals.push(loser);
                lose.overlord = Some(w);
                lose.is_rebel = false;
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::PeaceTreaty {
                        a: event_refs.0,
                        b: event_refs.1,
                        outcome: PeaceOutcome::Vassalized,
                    },
                ));
            } else {
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::PeaceTreaty {
                        a: event_refs.0,
                        b: event_refs.1,
                        outcome: PeaceOutcome::Victory,
                    },
                ));
            }
        }
        None => white_peace(a, b, nations, events, year),
    }
}

fn white_peace(a: NationId, b: NationId, nations: &mut Nations, events: &mut WorldEventLog, year: u32) {
    if let Some((na, nb)) = nations.get_pair_mut(a, b) {
        na.stability = (na.stability + 5.0).min(100.0);
        nb.stability = (nb.stability + 5.0).min(100.0);
        events.push(WorldEvent::new(
            year,
            WorldEventKind::PeaceTreaty {
                a: NationRef::of(na),
                b: NationRef::of(nb),
                outcome: PeaceOutcome::WhitePeace,
            },
        ));
    }
}

/// Tick every active war: drop broken entries, run cooldowns and battles,
/// then settle the wars that ran out of land or time.
pub fn conduct_wars_system(
    mut nations: ResMut<Nations>,
    mut grid: ResMut<TerritoryGrid>,
    mut wars: ResMut<ActiveWars>,
    mut trade: ResMut<TradeNetwork>,
    mut events: ResMut<WorldEventLog>,
    mut flashes: ResMut<BattleFlashes>,
    time: Res<WorldTime>,
    mut rng: ResMut<SimRng>,
) {
    let nations = &mut *nations;
    let grid = &mut *grid;
    let wars = &mut *wars;
    let trade = &mut *trade;
    let events = &mut *events;
    let rng = &mut rng.0;
    let year = time.year;

    flashes.0.clear();

    // Wars referencing dead nations or one-sided bookkeeping are dropped
    // outright rather than resolved.
    wars.list.retain(|w| {
        let symmetric = nations
            .get(w.attacker)
            .map(|n| n.at_war_with.contains(&w.defender))
            .unwrap_or(false)
            && nations
                .get(w.defender)
                .map(|n| n.at_war_with.contains(&w.attacker))
                .unwrap_or(false);
        symmetric
    });

    let mut ended: Vec<(NationId, NationId)> = Vec::new();
    for i in 0..wars.list.len() {
        let (attacker, defender, auto_end_year) = {
            let war = &mut wars.list[i];
            war.battle_cooldown = war.battle_cooldown.saturating_sub(1);
            (war.attacker, war.defender, war.auto_end_year)
        };
        if wars.list[i].battle_cooldown == 0 {
            battle(attacker, defender, nations, grid, events, &mut flashes, year, rng);
            wars.list[i].battle_cooldown = rng.gen_range(1..=3);
        }
        let exhausted = grid.territory_count(attacker) == 0
            || grid.territory_count(defender) == 0
            || year >= auto_end_year;
        if exhausted {
            ended.push((attacker, defender));
        }
    }

    for (a, b) in ended {
        if wars.between(a, b).is_some() {
            resolve_peace(a, b, None, nations, grid, wars, trade, events, year, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::nation::{Government, Nation};
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn nation(id: u32) -> Nation {
        Nation {
            id: NationId(id),
            name: format!("Nation {id}"),
            color: (80, 80, 80),
            government: Government::Monarchy,
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

    fn two_nation_world() -> (Nations, TerritoryGrid) {
        let mut nations = Nations::default();
        let a = nations.allocate_id();
        let b = nations.allocate_id();
        nations.insert(nation(a.0));
        nations.insert(nation(b.0));
        let mut grid = TerritoryGrid::new(10, 4);
        for y in 0..4 {
            for x in 0..5 {
                grid.set_owner(x, y, Some(a));
            }
            for x in 5..10 {
                grid.set_owner(x, y, Some(b));
            }
        }
        (nations, grid)
    }

    #[test]
    fn declaration_is_symmetric_with_fixed_end_year() {
        let (mut nations, _grid) = two_nation_world();
        let mut wars = ActiveWars::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let (a, b) = (NationId(0), NationId(1));

        declare_war(a, b, &mut nations, &mut wars, &mut events, 5, &mut rng, false);

        assert!(nations.get(a).unwrap().at_war_with.contains(&b));
        assert!(nations.get(b).unwrap().at_war_with.contains(&a));
        let war = wars.between(a, b).unwrap();
        assert_eq!(war.start_year, 5);
        assert!(war.auto_end_year >= 25 && war.auto_end_year < 35);

        // Re-declaring the same pair is a no-op.
        declare_war(a, b, &mut nations, &mut wars, &mut events, 6, &mut rng, false);
        assert_eq!(wars.list.len(), 1);
    }

    #[test]
    fn battle_capture_stays_bounded_and_connected() {
        let (mut nations, mut grid) = two_nation_world();
        let mut events = WorldEventLog::default();
        let mut flashes = BattleFlashes::default();
        let mut rng = SmallRng::seed_from_u64(3);
        nations.get_mut(NationId(0)).unwrap().army_strength = 6;
        nations.get_mut(NationId(1)).unwrap().army_strength = 1;

        let before = grid.territory_count(NationId(1));
        for _ in 0..20 {
            battle(
                NationId(0),
                NationId(1),
                &mut nations,
                &mut grid,
                &mut events,
                &mut flashes,
                1,
                &mut rng,
            );
        }
        let after = grid.territory_count(NationId(1));
        assert!(after < before);
        // Total tiles conserved between the two sides.
        assert_eq!(
            grid.territory_count(NationId(0)) + after,
            40,
            "battles move tiles, never create or destroy them"
        );
    }

    #[test]
    fn white_peace_when_no_territorial_edge() {
        let (mut nations, mut grid) = two_nation_world();
        let mut wars = ActiveWars::default();
        let mut trade = TradeNetwork::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(4);
        let (a, b) = (NationId(0), NationId(1));
        declare_war(a, b, &mut nations, &mut wars, &mut events, 1, &mut rng, false);

        resolve_peace(
            a, b, None, &mut nations, &mut grid, &mut wars, &mut trade, &mut events, 9, &mut rng,
        );

        assert!(wars.list.is_empty());
        assert!(nations.get(a).unwrap().at_war_with.is_empty());
        assert!(nations.get(b).unwrap().at_war_with.is_empty());
    }

    #[test]
    fn landless_loser_is_eliminated_at_peace() {
        let (mut nations, mut grid) = two_nation_world();
        let mut wars = ActiveWars::default();
        let mut trade = TradeNetwork::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let (a, b) = (NationId(0), NationId(1));
        declare_war(a, b, &mut nations, &mut wars, &mut events, 1, &mut rng, false);
        grid.scrub_owner(b);

        resolve_peace(
            a, b, None, &mut nations, &mut grid, &mut wars, &mut trade, &mut events, 9, &mut rng,
        );

        assert!(nations.get(b).is_none());
        assert!(nations.get(a).unwrap().at_war_with.is_empty());
    }

    #[test]
    fn crushed_rebellion_returns_land_to_parent() {
        let (mut nations, mut grid) = two_nation_world();
        let mut wars = ActiveWars::default();
        let mut trade = TradeNetwork::default();
        let mut events = WorldEventLog::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let (parent, rebel) = (NationId(0), NationId(1));
        nations.get_mut(rebel).unwrap().is_rebel = true;
        declare_war(rebel, parent, &mut nations, &mut wars, &mut events, 1, &mut rng, false);

        resolve_peace(
            parent,
            rebel,
            Some(parent),
            &mut nations,
            &mut grid,
            &mut wars,
            &mut trade,
            &mut events,
            9,
            &mut rng,
        );

        assert!(nations.get(rebel).is_none());
        assert_eq!(grid.territory_count(parent), 40);
    }
}
