use std::sync::{Arc, RwLock};

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;
use rand::{Rng, SeedableRng};
use rand::rngs::SmallRng;

pub mod economy;
pub mod events;
pub mod grid;
pub mod nation;
pub mod navy;
pub mod observer;
pub mod resources;
pub mod snapshot;
pub mod systems;
pub mod wars;

pub use economy::*;
pub use events::*;
pub use grid::*;
pub use nation::*;
pub use navy::*;
pub use observer::*;
pub use resources::*;
pub use snapshot::*;
pub use systems::*;
pub use wars::*;

pub struct SimulationWorld {
    world: World,
    schedule: Schedule,
    observer: Arc<RwLock<ObserverSnapshot>>,
}

impl SimulationWorld {
    #[allow(dead_code)]
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_observer(config, Arc::new(RwLock::new(ObserverSnapshot::default())))
    }

    pub fn with_observer(
        config: SimulationConfig,
        observer: Arc<RwLock<ObserverSnapshot>>,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut grid = generate_terrain(config.width, config.height, &mut rng);
        let mut nations = Nations::default();
        seed_starting_nations(&mut nations, &mut grid, config.starting_nations, &mut rng);

        let mut world = World::default();
        world.insert_resource(config);
        world.insert_resource(grid);
        world.insert_resource(nations);
        world.insert_resource(ActiveWars::default());
        world.insert_resource(WorldWarState::default());
        world.insert_resource(BattleFlashes::default());
        world.insert_resource(TradeNetwork::default());
        world.insert_resource(WorldEconomy::default());
        world.insert_resource(WorldEventLog::default());
        world.insert_resource(WorldTime::default());
        world.insert_resource(SimRng(rng));

        let mut sim = Self {
            world,
            schedule: build_schedule(),
            observer,
        };
        sim.refresh_observer_snapshot();
        sim
    }

    /// Resume from a save on disk when a valid one exists; start a fresh
    /// world otherwise.
    pub fn resume_or_new(
        config: SimulationConfig,
        path: impl AsRef<std::path::Path>,
        observer: Arc<RwLock<ObserverSnapshot>>,
    ) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match SaveGame::load_from_path(path)
                .and_then(|save| Self::from_save(config.clone(), save, observer.clone()))
            {
                Ok(sim) => {
                    tracing::info!("resumed world from {}", path.display());
                    return sim;
                }
                Err(err) => {
                    tracing::warn!("ignoring save at {}: {err}", path.display());
                }
            }
        }
        Self::with_observer(config, observer)
    }

    /// Rebuild a simulation from a validated save. The RNG restarts from the
    /// config seed; the save carries no generator state.
    pub fn from_save(
        config: SimulationConfig,
        save: SaveGame,
        observer: Arc<RwLock<ObserverSnapshot>>,
    ) -> Result<Self, SnapshotError> {
        save.validate()?;
        let mut world = World::default();
        let rng = SmallRng::seed_from_u64(config.seed.wrapping_add(save.year as u64));
        world.insert_resource(config);
        world.insert_resource(save.grid);
        world.insert_resource(Nations::from_parts(save.nations, save.next_nation_id));
        world.insert_resource(save.wars);
        world.insert_resource(save.world_war);
        world.insert_resource(BattleFlashes::default());
        world.insert_resource(save.trade);
        world.insert_resource(WorldEconomy::default());
        world.insert_resource(WorldEventLog::default());
        world.insert_resource(WorldTime { year: save.year });
        world.insert_resource(SimRng(rng));

        let mut sim = Self {
            world,
            schedule: build_schedule(),
            observer,
        };
        sim.refresh_observer_snapshot();
        Ok(sim)
    }

    pub fn save(&self) -> SaveGame {
        SaveGame::capture(
            self.world.resource::<WorldTime>(),
            self.world.resource::<Nations>(),
            self.world.resource::<TerritoryGrid>(),
            self.world.resource::<ActiveWars>(),
            self.world.resource::<WorldWarState>(),
            self.world.resource::<TradeNetwork>(),
        )
    }

    /// Advance one year: bump the calendar, run every system once, publish
    /// the observer snapshot.
    pub fn tick(&mut self) {
        {
            let mut time = self.world.resource_mut::<WorldTime>();
            time.year += 1;
        }

        self.schedule.run(&mut self.world);
        self.refresh_observer_snapshot();
    }

    fn refresh_observer_snapshot(&mut self) {
        let year = self.world.resource::<WorldTime>().year;
        let nations = self.world.resource::<Nations>();
        let grid = self.world.resource::<TerritoryGrid>();
        let wars = self.world.resource::<ActiveWars>();
        let world_war = self.world.resource::<WorldWarState>();
        let flashes = self.world.resource::<BattleFlashes>();
        let trade = self.world.resource::<TradeNetwork>();
        let economy = self.world.resource::<WorldEconomy>();
        let events = self.world.resource::<WorldEventLog>();

        let mut summaries: Vec<NationSummary> = nations
            .iter()
            .map(|n| NationSummary {
                id: n.id,
                name: n.name.clone(),
                color: n.color,
                government: n.government.label(),
                territory: grid.territory_count(n.id),
                stability: n.stability,
                gdp: n.gdp,
                population: n.population,
                army_strength: n.army_strength,
                cities: n.cities.len(),
                navies: n.navies.len(),
                allies: n.allies.len(),
                at_war: n.is_at_war(),
                is_rebel: n.is_rebel,
                overlord: n
                    .overlord
                    .and_then(|o| nations.get(o))
                    .map(|o| o.name.clone()),
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.gdp
                .partial_cmp(&a.gdp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let grid_snapshot = GridSnapshot {
            width: grid.width,
            height: grid.height,
            terrain: grid.terrain.clone(),
            owner_color: grid
                .owner
                .iter()
                .map(|owner| owner.and_then(|id| nations.get(id)).map(|n| n.color))
                .collect(),
        };

        let war_summaries: Vec<WarSummary> = wars
            .list
            .iter()
            .filter_map(|w| {
                let attacker = nations.get(w.attacker)?;
                let defender = nations.get(w.defender)?;
                Some(WarSummary {
                    attacker: attacker.name.clone(),
                    attacker_color: attacker.color,
                    defender: defender.name.clone(),
                    defender_color: defender.color,
                    start_year: w.start_year,
                    is_world_war: w.is_world_war,
                })
            })
            .collect();

        let economy_snapshot = EconomySnapshot {
            world_gdp: economy.world_gdp,
            global_trade_volume: trade.global_trade_volume,
            route_count: trade.routes.len(),
            economic_centers: economy
                .economic_centers
                .iter()
                .filter_map(|(id, city)| {
                    nations.get(*id).map(|n| (n.name.clone(), city.clone()))
                })
                .collect(),
        };

        if let Ok(mut snapshot) = self.observer.write() {
            snapshot.year = year;
            snapshot.nations = summaries;
            snapshot.grid = grid_snapshot;
            snapshot.wars = war_summaries;
            snapshot.battles = flashes.0.clone();
            snapshot.world_war_active = world_war.active;
            snapshot.economy = economy_snapshot;
            snapshot.events = events.snapshot();
        }
    }
}

fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            formation_system,
            nation_turn_system,
            conduct_wars_system,
            world_war_system,
            global_economy_system,
            logging_system,
        )
            .chain(),
    );
    schedule
}

pub(crate) fn seed_starting_nations(
    nations: &mut Nations,
    grid: &mut TerritoryGrid,
    count: usize,
    rng: &mut SmallRng,
) {
    for _ in 0..count {
        let id = nations.allocate_id();
        let target = rng.gen_range(30..=60);
        let patch = claim_starting_patch(grid, id, target, rng);
        if patch.is_empty() {
            continue;
        }
        let (cx, cy) = patch[0];
        nations.insert(Nation {
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
                size: rng.gen_range(1..=3),
                is_capital: true,
            }],
            navies: Vec::new(),
            is_rebel: false,
            last_revolt_year: 0,
        });
    }
}
