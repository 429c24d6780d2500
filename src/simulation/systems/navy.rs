//! Fleet construction and per-turn naval missions.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::simulation::{
    NationId, NationRef, Nations, Navy, NavyKind, NavyMission, TerritoryGrid, WorldEvent,
    WorldEventKind, WorldEventLog,
    nation::{City, random_city_name},
};

const ARRIVAL_RANGE: f32 = 1.5;
const MAX_FLEET_STRENGTH: u8 = 5;

/// Launch a fleet from a random stretch of coast. A nation with no harbor
/// town yet founds one at the launch site.
pub fn build_navy(
    actor: NationId,
    nations: &mut Nations,
    grid: &TerritoryGrid,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let coast = grid.coastal_tiles(actor);
    let Some(&(px, py)) = coast.choose(rng) else {
        return;
    };
    let water: Vec<(u16, u16)> = grid
        .neighbors4(px, py)
        .into_iter()
        .filter(|&(x, y)| grid.terrain_at(x, y).is_water())
        .collect();
    let Some(&(wx, wy)) = water.choose(rng) else {
        return;
    };
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    nation.navies.push(Navy {
        x: wx as f32,
        y: wy as f32,
        kind: NavyKind::random(rng),
        strength: rng.gen_range(1..=MAX_FLEET_STRENGTH),
        mission: NavyMission::Patrol,
        target: None,
        home_port: (px, py),
    });

    let has_harbor = nation.cities.iter().any(|c| coast.contains(&(c.x, c.y)));
    if !has_harbor {
        let name = random_city_name(rng);
        let is_capital = nation.cities.is_empty();
        nation.cities.push(City {
            x: px,
            y: py,
            name: name.clone(),
            size: 1,
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
}

/// Retask an idle fleet for overseas settlement. Some are refitted into
/// transports, which plant far larger colonies.
pub fn attempt_colonization(actor: NationId, nations: &mut Nations, rng: &mut SmallRng) {
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    let idle: Vec<usize> = nation
        .navies
        .iter()
        .enumerate()
        .filter(|(_, n)| matches!(n.mission, NavyMission::Patrol | NavyMission::Trade))
        .map(|(i, _)| i)
        .collect();
    let Some(&pick) = idle.choose(rng) else {
        return;
    };
    let navy = &mut nation.navies[pick];
    if rng.gen_bool(0.35) {
        navy.kind = NavyKind::Transport;
        navy.strength = (navy.strength + 1).min(MAX_FLEET_STRENGTH);
    }
    navy.mission = NavyMission::Colonize;
    navy.target = None;
}

/// One movement step toward `target`, clamped to water: a step that would
/// run the fleet aground is retried at half speed, then skipped. Returns
/// true once the fleet has closed within landing range.
fn sail_toward(
    navy: &mut Navy,
    target: (u16, u16),
    grid: &TerritoryGrid,
    rng: &mut SmallRng,
) -> bool {
    let dx = target.0 as f32 - navy.x;
    let dy = target.1 as f32 - navy.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < f32::EPSILON {
        return true;
    }
    let mut speed = rng.gen_range(1.0..2.0f32).min(dist);
    for _ in 0..2 {
        let nx = navy.x + dx / dist * speed;
        let ny = navy.y + dy / dist * speed;
        let (tx, ty) = (nx.round() as i32, ny.round() as i32);
        if grid.in_bounds(tx, ty) && grid.terrain_at(tx as u16, ty as u16).is_water() {
            navy.x = nx;
            navy.y = ny;
            break;
        }
        speed *= 0.5;
    }
    navy.distance_to(target) < ARRIVAL_RANGE
}

/// A random coastal tile of a random current enemy.
fn raid_target(
    actor: NationId,
    nations: &Nations,
    grid: &TerritoryGrid,
    rng: &mut SmallRng,
) -> Option<(u16, u16)> {
    let enemies = nations
        .get(actor)
        .map(|n| n.at_war_with.clone())
        .unwrap_or_default();
    let &enemy = enemies.choose(rng)?;
    grid.coastal_tiles(enemy).choose(rng).copied()
}

/// Unclaimed land reachable from the sea, for colony landings.
fn colony_target(grid: &TerritoryGrid, rng: &mut SmallRng) -> Option<(u16, u16)> {
    let shores: Vec<(u16, u16)> = grid
        .unclaimed_land_tiles()
        .into_iter()
        .filter(|&(x, y)| {
            grid.neighbors8(x, y)
                .into_iter()
                .any(|(nx, ny)| grid.terrain_at(nx, ny).is_sea_edge())
        })
        .collect();
    shores.choose(rng).copied()
}

fn plant_colony(
    actor: NationId,
    landing: (u16, u16),
    kind: NavyKind,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let budget = match kind {
        NavyKind::Transport => rng.gen_range(25..=40),
        _ => rng.gen_range(5..=15),
    };
    let claimed = grid.flood_collect(landing, budget, |g, x, y| {
        !g.terrain_at(x, y).is_water() && g.owner_at(x, y).is_none()
    });
    if claimed.is_empty() {
        return;
    }
    for &(x, y) in &claimed {
        grid.set_owner(x, y, Some(actor));
    }
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    nation.gdp += 2.0;
    nation.stability = (nation.stability + 5.0).min(100.0);
    if claimed.len() >= 5 {
        nation.cities.push(City {
            x: landing.0,
            y: landing.1,
            name: random_city_name(rng),
            size: 1,
            is_capital: nation.cities.is_empty(),
        });
    }
    events.push(WorldEvent::new(
        year,
        WorldEventKind::ColonyFounded {
            nation: NationRef::of(nation),
            tile: landing,
            tiles: claimed.len(),
        },
    ));
}

/// Storm ashore from the fleet's position: the first adjacent enemy tile
/// becomes the beachhead and the raid floods inland from it. Returns true
/// when the raiding fleet is sunk by a defending navy.
fn coastal_raid(
    actor: NationId,
    navy: &Navy,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) -> bool {
    let at_war_with = nations
        .get(actor)
        .map(|n| n.at_war_with.clone())
        .unwrap_or_default();
    let (cx, cy) = navy.tile();
    let beachhead = grid.neighbors4(cx, cy).into_iter().find(|&(x, y)| {
        !grid.terrain_at(x, y).is_water()
            && grid.owner_at(x, y).is_some_and(|o| at_war_with.contains(&o))
    });
    let Some((bx, by)) = beachhead else {
        return false;
    };
    let Some(enemy) = grid.owner_at(bx, by) else {
        return false;
    };

    let budget = ((navy.strength as usize + rng.gen_range(0..3)) * 3).min(20);
    let taken = grid.flood_collect((bx, by), budget, |g, x, y| g.owner_at(x, y) == Some(enemy));
    for &(x, y) in &taken {
        grid.set_owner(x, y, Some(actor));
    }

    // A quarter of raids meet an enemy fleet close enough to engage.
    if rng.gen_bool(0.25) {
        let defender_idx = nations.get(enemy).and_then(|n| {
            n.navies
                .iter()
                .position(|other| navy.distance_to(other.tile()) <= 3.0)
        });
        if let Some(idx) = defender_idx {
            let own_power = navy.strength as f32 + rng.gen_range(0.0..2.0);
            let (enemy_power, refs) = {
                let enemy_nation = nations.get(enemy).expect("live");
                (
                    enemy_nation.navies[idx].strength as f32 + rng.gen_range(0.0..2.0),
                    NationRef::of(enemy_nation),
                )
            };
            let actor_ref = nations.get(actor).map(NationRef::of).expect("live");
            if own_power >= enemy_power {
                if let Some(n) = nations.get_mut(enemy) {
                    n.navies.remove(idx);
                }
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::NavalBattle {
                        winner: actor_ref,
                        loser: refs,
                        tile: navy.tile(),
                    },
                ));
            } else {
                events.push(WorldEvent::new(
                    year,
                    WorldEventKind::NavalBattle {
                        winner: refs,
                        loser: actor_ref,
                        tile: navy.tile(),
                    },
                ));
                return true;
            }
        }
    }
    false
}

/// Run every fleet of `actor` for one turn. Fleets sunk in naval battles do
/// not return to the roster.
pub fn process_navy_missions(
    actor: NationId,
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    events: &mut WorldEventLog,
    year: u32,
    rng: &mut SmallRng,
) {
    let Some(nation) = nations.get_mut(actor) else {
        return;
    };
    let at_war = nation.is_at_war();
    let mut fleet = std::mem::take(&mut nation.navies);
    let mut sunk: Vec<usize> = Vec::new();

    for (idx, navy) in fleet.iter_mut().enumerate() {
        match navy.mission {
            NavyMission::Patrol => {
                if at_war && rng.gen_bool(0.40) {
                    navy.mission = NavyMission::Attack;
                } else if rng.gen_bool(0.05) {
                    navy.mission = NavyMission::Trade;
                }
            }
            NavyMission::Trade => {
                if let Some(n) = nations.get_mut(actor) {
                    n.gdp += rng.gen_range(1..=2) as f32;
                    n.population += rng.gen_range(200..=700) as f64;
                    if at_war {
                        n.stability = (n.stability + 1.0).min(100.0);
                    }
                }
                if rng.gen_bool(0.08) {
                    navy.mission = NavyMission::Patrol;
                } else if rng.gen_bool(0.30) {
                    let home = navy.home_port;
                    sail_toward(navy, home, grid, rng);
                }
            }
            NavyMission::Colonize => {
                if navy.target.is_none() {
                    navy.target = colony_target(grid, rng);
                }
                let Some(target) = navy.target else {
                    navy.mission = NavyMission::Patrol;
                    continue;
                };
                if sail_toward(navy, target, grid, rng) {
                    plant_colony(actor, target, navy.kind, nations, grid, events, year, rng);
                    navy.mission = NavyMission::Patrol;
                    navy.target = None;
                }
            }
            NavyMission::Attack => {
                if !at_war {
                    navy.mission = NavyMission::Patrol;
                    navy.target = None;
                    continue;
                }
                if navy.target.is_none() {
                    navy.target = raid_target(actor, nations, grid, rng);
                }
                let Some(target) = navy.target else {
                    navy.mission = NavyMission::Patrol;
                    continue;
                };
                if sail_toward(navy, target, grid, rng) {
                    navy.target = None;
                    if coastal_raid(actor, navy, nations, grid, events, year, rng) {
                        sunk.push(idx);
                    }
                }
            }
        }
    }

    for idx in sunk.into_iter().rev() {
        fleet.remove(idx);
    }
    if let Some(nation) = nations.get_mut(actor) {
        nation.navies = fleet;
    }
}
