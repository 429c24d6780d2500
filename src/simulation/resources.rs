//! Shared resources and world-level configuration.

use std::time::Duration;

use bevy_ecs::prelude::Resource;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// World-level appetite for war, applied to every nation's action roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldAggression {
    Peaceful,
    Cautious,
    Balanced,
    Aggressive,
    Warmonger,
}

impl WorldAggression {
    pub fn war_chance(&self) -> f32 {
        match self {
            WorldAggression::Peaceful => 0.02,
            WorldAggression::Cautious => 0.05,
            WorldAggression::Balanced => 0.07,
            WorldAggression::Aggressive => 0.12,
            WorldAggression::Warmonger => 0.20,
        }
    }

    /// Upper bound of the expansion band in the action roll.
    pub fn expansion_threshold(&self) -> f32 {
        match self {
            WorldAggression::Peaceful => 0.75,
            WorldAggression::Cautious => 0.80,
            WorldAggression::Balanced => 0.85,
            WorldAggression::Aggressive => 0.88,
            WorldAggression::Warmonger => 0.90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorldAggression::Peaceful => "Peaceful",
            WorldAggression::Cautious => "Cautious",
            WorldAggression::Balanced => "Balanced",
            WorldAggression::Aggressive => "Aggressive",
            WorldAggression::Warmonger => "Warmonger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebellionFrequency {
    Off,
    Low,
    Medium,
    High,
}

impl RebellionFrequency {
    pub fn multiplier(&self) -> Option<f32> {
        match self {
            RebellionFrequency::Off => None,
            RebellionFrequency::Low => Some(0.5),
            RebellionFrequency::Medium => Some(1.0),
            RebellionFrequency::High => Some(2.0),
        }
    }
}

#[derive(Debug, Clone, Resource)]
pub struct SimulationConfig {
    pub seed: u64,
    pub width: u16,
    pub height: u16,
    pub starting_nations: usize,
    pub aggression: WorldAggression,
    pub rebellions: RebellionFrequency,
    pub tick_duration: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x4e61_7469,
            width: 96,
            height: 64,
            starting_nations: 6,
            aggression: WorldAggression::Balanced,
            rebellions: RebellionFrequency::Medium,
            tick_duration: Duration::from_secs(1),
        }
    }
}

/// Simulation calendar. One tick advances one year, before any system runs.
#[derive(Debug, Clone, Resource, Serialize, Deserialize, Default)]
pub struct WorldTime {
    pub year: u32,
}

/// The only RNG in the simulation. Seeded once from `SimulationConfig::seed`
/// so a run is reproducible from its config.
#[derive(Debug, Resource)]
pub struct SimRng(pub SmallRng);
