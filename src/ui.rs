mod control;
mod map;
mod panels;

use crate::simulation::{ObserverSnapshot, WorldEvent, WorldEventKind};
use control::render_control_deck;
use map::MapWidget;
use panels::{render_event_table, render_nation_leaderboard, render_war_theater_panel};
use ratatui::{
    prelude::*,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::time::Duration;

pub struct Theme {
    pub accent: Color,
    pub border: Color,
}

pub const THEME: Theme = Theme {
    accent: Color::LightCyan,
    border: Color::DarkGray,
};

#[derive(Debug, Clone)]
pub struct ControlState {
    pub paused: bool,
    pub tick_duration: Duration,
    pub preset_status: Vec<PresetStatus>,
    pub log_filter: LogFilter,
    pub last_save: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PresetStatus {
    pub key: char,
    pub label: &'static str,
    pub intent: &'static str,
    pub tick_ms: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    All,
    War,
    Diplomacy,
    Trade,
    Upheaval,
}

impl LogFilter {
    pub fn label(&self) -> &'static str {
        match self {
            LogFilter::All => "All",
            LogFilter::War => "War",
            LogFilter::Diplomacy => "Diplomacy",
            LogFilter::Trade => "Trade/Colony",
            LogFilter::Upheaval => "Upheaval",
        }
    }

    pub fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::War,
            LogFilter::War => LogFilter::Diplomacy,
            LogFilter::Diplomacy => LogFilter::Trade,
            LogFilter::Trade => LogFilter::Upheaval,
            LogFilter::Upheaval => LogFilter::All,
        }
    }

    pub fn matches(&self, event: &WorldEvent) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::War => matches!(event.category(), "War" | "WorldWar"),
            LogFilter::Diplomacy => matches!(event.category(), "Diplomacy" | "Peace"),
            LogFilter::Trade => matches!(event.category(), "Trade" | "Colony" | "Founding"),
            LogFilter::Upheaval => {
                matches!(event.category(), "Rebellion" | "Disaster" | "Collapse")
            }
        }
    }
}

/// Draws the full dashboard frame: header, control deck, map, and panels.
pub fn render(frame: &mut Frame, snapshot: &ObserverSnapshot, control: &ControlState) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(frame.size());

    let at_war = snapshot.wars.len();
    let mut header_lines = vec![
        Line::from(vec![
            Span::styled(" ATLAS NATIONS ", Style::default().bold()),
            Span::raw(" | "),
            Span::styled(
                format!("Year {}", snapshot.year),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(" | "),
            Span::styled(
                format!("Nations {}", snapshot.nations.len()),
                Style::default().fg(Color::White),
            ),
            Span::raw(" | "),
            Span::styled(
                format!("Wars {}", at_war),
                Style::default().fg(if at_war > 0 { Color::Red } else { Color::Gray }),
            ),
            Span::raw(" | "),
            Span::styled(
                format!(
                    "World GDP {:.0} · Routes {}",
                    snapshot.economy.world_gdp, snapshot.economy.route_count
                ),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::styled("Chronicle ", Style::default().fg(Color::LightYellow).bold()),
            Span::raw("→ "),
            Span::styled(narrative_ticker(snapshot), Style::default().fg(Color::White)),
        ]),
    ];
    if snapshot.world_war_active {
        header_lines.push(Line::from(Span::styled(
            "WORLD WAR IN PROGRESS — alliance blocs locked in total war",
            Style::default().fg(Color::LightRed).bold(),
        )));
    }

    let header_paragraph = Paragraph::new(header_lines).block(Block::new().borders(Borders::TOP));
    frame.render_widget(header_paragraph, main_layout[0]);
    render_control_deck(frame, main_layout[1], snapshot, control);

    let content_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(main_layout[2]);

    let top_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(content_layout[0]);

    render_nation_leaderboard(frame, top_layout[0], snapshot);

    let map_widget = MapWidget { snapshot };
    frame.render_widget(map_widget, top_layout[1]);

    let bottom_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
        .split(content_layout[1]);

    render_war_theater_panel(frame, bottom_layout[0], snapshot);
    render_event_table(frame, bottom_layout[1], snapshot, control);
}

fn narrative_ticker(snapshot: &ObserverSnapshot) -> String {
    let mut snippets = Vec::new();
    for event in snapshot.events.iter().rev().take(3) {
        let snippet = match &event.kind {
            WorldEventKind::WarDeclared { attacker, defender } => {
                format!("{} → war → {}", attacker.name, defender.name)
            }
            WorldEventKind::WorldWarBegan { side_a, side_b } => {
                format!("WORLD WAR {}v{}", side_a.len(), side_b.len())
            }
            _ => event.headline(),
        };
        snippets.push(snippet);
    }

    if snippets.is_empty() {
        "A quiet age — the map settles".to_string()
    } else {
        snippets.join(" · ")
    }
}
