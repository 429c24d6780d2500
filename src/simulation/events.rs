//! Structured world events and the bounded event log.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::{Nation, NationId};

/// Identity of a nation at the moment an event fired. Events outlive the
/// nations they mention, so the name and color are captured by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationRef {
    pub id: NationId,
    pub name: String,
    pub color: (u8, u8, u8),
}

impl NationRef {
    pub fn of(nation: &Nation) -> Self {
        Self {
            id: nation.id,
            name: nation.name.clone(),
            color: nation.color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeaceOutcome {
    Victory,
    WhitePeace,
    Vassalized,
    RebelCrushed,
    RebelFreed,
}

impl PeaceOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PeaceOutcome::Victory => "decisive victory",
            PeaceOutcome::WhitePeace => "white peace",
            PeaceOutcome::Vassalized => "vassalized",
            PeaceOutcome::RebelCrushed => "rebellion crushed",
            PeaceOutcome::RebelFreed => "independence won",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterKind {
    Plague,
    EconomicCollapse,
    NaturalDisaster,
}

impl DisasterKind {
    pub fn label(&self) -> &'static str {
        match self {
            DisasterKind::Plague => "plague",
            DisasterKind::EconomicCollapse => "economic collapse",
            DisasterKind::NaturalDisaster => "natural disaster",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEventKind {
    NationFormed {
        nation: NationRef,
        tiles: usize,
    },
    NationCollapsed {
        nation: NationRef,
    },
    WarDeclared {
        attacker: NationRef,
        defender: NationRef,
    },
    Battle {
        winner: NationRef,
        loser: NationRef,
        tile: (u16, u16),
        captured: usize,
    },
    PeaceTreaty {
        a: NationRef,
        b: NationRef,
        outcome: PeaceOutcome,
    },
    Rebellion {
        parent: NationRef,
        rebel: NationRef,
    },
    Alliance {
        a: NationRef,
        b: NationRef,
    },
    TradeAgreement {
        a: NationRef,
        b: NationRef,
        value: f32,
    },
    Vassalized {
        overlord: NationRef,
        vassal: NationRef,
    },
    WorldWarBegan {
        side_a: Vec<NationRef>,
        side_b: Vec<NationRef>,
    },
    WorldWarEnded {
        winners: Vec<NationRef>,
    },
    Disaster {
        nation: NationRef,
        kind: DisasterKind,
    },
    ColonyFounded {
        nation: NationRef,
        tile: (u16, u16),
        tiles: usize,
    },
    NavalBattle {
        winner: NationRef,
        loser: NationRef,
        tile: (u16, u16),
    },
    CityFounded {
        nation: NationRef,
        name: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    pub year: u32,
    pub kind: WorldEventKind,
}

impl WorldEvent {
    pub fn new(year: u32, kind: WorldEventKind) -> Self {
        Self { year, kind }
    }

    pub fn category(&self) -> &'static str {
        match &self.kind {
            WorldEventKind::NationFormed { .. } => "Founding",
            WorldEventKind::NationCollapsed { .. } => "Collapse",
            WorldEventKind::WarDeclared { .. } => "War",
            WorldEventKind::Battle { .. } => "War",
            WorldEventKind::PeaceTreaty { .. } => "Peace",
            WorldEventKind::Rebellion { .. } => "Rebellion",
            WorldEventKind::Alliance { .. } => "Diplomacy",
            WorldEventKind::TradeAgreement { .. } => "Trade",
            WorldEventKind::Vassalized { .. } => "Diplomacy",
            WorldEventKind::WorldWarBegan { .. } => "WorldWar",
            WorldEventKind::WorldWarEnded { .. } => "WorldWar",
            WorldEventKind::Disaster { .. } => "Disaster",
            WorldEventKind::ColonyFounded { .. } => "Colony",
            WorldEventKind::NavalBattle { .. } => "War",
            WorldEventKind::CityFounded { .. } => "Founding",
        }
    }

    pub fn sentiment(&self) -> Sentiment {
        match &self.kind {
            WorldEventKind::NationFormed { .. } => Sentiment::Positive,
            WorldEventKind::NationCollapsed { .. } => Sentiment::Negative,
            WorldEventKind::WarDeclared { .. } => Sentiment::Negative,
            WorldEventKind::Battle { .. } => Sentiment::Negative,
            WorldEventKind::PeaceTreaty { .. } => Sentiment::Positive,
            WorldEventKind::Rebellion { .. } => Sentiment::Negative,
            WorldEventKind::Alliance { .. } => Sentiment::Positive,
            WorldEventKind::TradeAgreement { .. } => Sentiment::Positive,
            WorldEventKind::Vassalized { .. } => Sentiment::Neutral,
            WorldEventKind::WorldWarBegan { .. } => Sentiment::Negative,
            WorldEventKind::WorldWarEnded { .. } => Sentiment::Positive,
            WorldEventKind::Disaster { .. } => Sentiment::Negative,
            WorldEventKind::ColonyFounded { .. } => Sentiment::Positive,
            WorldEventKind::NavalBattle { .. } => Sentiment::Negative,
            WorldEventKind::CityFounded { .. } => Sentiment::Positive,
        }
    }

    /// Short one-line form for the TUI ticker.
    pub fn headline(&self) -> String {
        match &self.kind {
            WorldEventKind::NationFormed { nation, tiles } => {
                format!("{} founded ({} tiles)", nation.name, tiles)
            }
            WorldEventKind::NationCollapsed { nation } => {
                format!("{} has collapsed", nation.name)
            }
            WorldEventKind::WarDeclared { attacker, defender } => {
                format!("{} declares war on {}", attacker.name, defender.name)
            }
            WorldEventKind::Battle {
                winner,
                loser,
                captured,
                ..
            } => format!(
                "{} defeats {} in battle ({} tiles)",
                winner.name, loser.name, captured
            ),
            WorldEventKind::PeaceTreaty { a, b, outcome } => {
                format!("{} and {} — {}", a.name, b.name, outcome.label())
            }
            WorldEventKind::Rebellion { parent, rebel } => {
                format!("{} rises against {}", rebel.name, parent.name)
            }
            WorldEventKind::Alliance { a, b } => {
                format!("{} allies with {}", a.name, b.name)
            }
            WorldEventKind::TradeAgreement { a, b, value } => {
                format!("{} trades with {} (worth {:.0})", a.name, b.name, value)
            }
            WorldEventKind::Vassalized { overlord, vassal } => {
                format!("{} becomes a vassal of {}", vassal.name, overlord.name)
            }
            WorldEventKind::WorldWarBegan { side_a, side_b } => format!(
                "World war: {} nations vs {}",
                side_a.len(),
                side_b.len()
            ),
            WorldEventKind::WorldWarEnded { winners } => {
                let names: Vec<&str> = winners.iter().map(|n| n.name.as_str()).collect();
                format!("World war over — {} prevail", names.join(", "))
            }
            WorldEventKind::Disaster { nation, kind } => {
                format!("{} struck by {}", nation.name, kind.label())
            }
            WorldEventKind::ColonyFounded { nation, tiles, .. } => {
                format!("{} plants a colony ({} tiles)", nation.name, tiles)
            }
            WorldEventKind::NavalBattle { winner, loser, .. } => {
                format!("{} sinks a fleet of {}", winner.name, loser.name)
            }
            WorldEventKind::CityFounded { nation, name } => {
                format!("{} founds the city of {}", nation.name, name)
            }
        }
    }
}

#[derive(Debug, Resource)]
pub struct WorldEventLog {
    events: VecDeque<WorldEvent>,
    capacity: usize,
}

impl WorldEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: WorldEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<WorldEvent> {
        self.events.iter().cloned().collect()
    }

    /// Events emitted at `year`, newest last.
    pub fn of_year(&self, year: u32) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter().filter(move |e| e.year == year)
    }
}

impl Default for WorldEventLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_ref(id: u32) -> NationRef {
        NationRef {
            id: NationId(id),
            name: format!("N{id}"),
            color: (10, 20, 30),
        }
    }

    #[test]
    fn log_evicts_oldest_at_capacity() {
        let mut log = WorldEventLog::new(2);
        for year in 0..3 {
            log.push(WorldEvent::new(
                year,
                WorldEventKind::NationCollapsed { nation: stub_ref(year) },
            ));
        }
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].year, 1);
        assert_eq!(snapshot[1].year, 2);
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = WorldEvent::new(
            12,
            WorldEventKind::PeaceTreaty {
                a: stub_ref(1),
                b: stub_ref(2),
                outcome: PeaceOutcome::WhitePeace,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: WorldEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.year, 12);
        assert_eq!(back.category(), "Peace");
    }
}
