//! Fleets. A navy sits on water, carries a mission, and moves a tile or two
//! per tick toward its target.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavyKind {
    Trade,
    Transport,
    Battle,
}

impl NavyKind {
    pub fn random(rng: &mut SmallRng) -> Self {
        match rng.gen_range(0..3) {
            0 => NavyKind::Trade,
            1 => NavyKind::Transport,
            _ => NavyKind::Battle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavyMission {
    Patrol,
    Trade,
    Colonize,
    Attack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Navy {
    pub x: f32,
    pub y: f32,
    pub kind: NavyKind,
    pub strength: u8,
    pub mission: NavyMission,
    pub target: Option<(u16, u16)>,
    pub home_port: (u16, u16),
}

impl Navy {
    pub fn tile(&self) -> (u16, u16) {
        (self.x.round().max(0.0) as u16, self.y.round().max(0.0) as u16)
    }

    pub fn distance_to(&self, tile: (u16, u16)) -> f32 {
        let dx = tile.0 as f32 - self.x;
        let dy = tile.1 as f32 - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}
