//! Global trade and economy resources. Per-nation figures live on `Nation`;
//! the network of routes and the world aggregates live here.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::NationId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRoute {
    pub a: NationId,
    pub b: NationId,
    /// Route worth, drifting within 0..=15 as it matures or suffers war.
    pub value: f32,
    pub established_year: u32,
}

impl TradeRoute {
    pub fn links(&self, x: NationId, y: NationId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct TradeNetwork {
    pub routes: Vec<TradeRoute>,
    pub global_trade_volume: f32,
}

impl TradeNetwork {
    pub fn route_between(&self, a: NationId, b: NationId) -> Option<&TradeRoute> {
        self.routes.iter().find(|r| r.links(a, b))
    }

    pub fn routes_of(&self, id: NationId) -> usize {
        self.routes.iter().filter(|r| r.a == id || r.b == id).count()
    }
}

#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct WorldEconomy {
    pub world_gdp: f64,
    pub global_resources: HashMap<String, u32>,
    /// Top GDP nations and their largest city, refreshed every tick.
    pub economic_centers: Vec<(NationId, String)>,
}
