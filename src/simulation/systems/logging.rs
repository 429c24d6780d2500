//! Colorized world pulse logging for quick scanning of a running sim.

use bevy_ecs::prelude::*;
use colored::{Color, Colorize};
use tracing::info;

use crate::simulation::{
    ActiveWars, NationRef, Nations, Sentiment, WorldEvent, WorldEventKind, WorldEventLog,
    WorldTime, WorldWarState,
};

fn badge(label: &str, color: Color) -> String {
    format!("[{}]", label).color(color).to_string()
}

fn category_color(category: &str) -> Color {
    match category {
        "War" => Color::Red,
        "WorldWar" => Color::BrightRed,
        "Peace" => Color::BrightGreen,
        "Trade" => Color::BrightCyan,
        "Diplomacy" => Color::BrightBlue,
        "Rebellion" => Color::BrightMagenta,
        "Disaster" => Color::Yellow,
        "Collapse" => Color::BrightBlack,
        "Founding" => Color::Green,
        "Colony" => Color::Cyan,
        _ => Color::White,
    }
}

fn sentiment_tag(sentiment: Sentiment) -> String {
    match sentiment {
        Sentiment::Positive => badge("+", Color::BrightGreen),
        Sentiment::Neutral => badge("=", Color::BrightBlack),
        Sentiment::Negative => badge("-", Color::BrightRed),
    }
}

fn nation_badge(nation: &NationRef) -> String {
    badge(
        &nation.name,
        Color::TrueColor {
            r: nation.color.0,
            g: nation.color.1,
            b: nation.color.2,
        },
    )
}

fn format_event_line(event: &WorldEvent) -> String {
    let category_badge = badge(event.category(), category_color(event.category()));
    let sentiment_badge = sentiment_tag(event.sentiment());
    let year_badge = badge(&format!("Year {}", event.year), Color::BrightBlack);
    let prefix = format!("{} {} {}", category_badge, sentiment_badge, year_badge);

    match &event.kind {
        WorldEventKind::WarDeclared { attacker, defender } => format!(
            "{} {} declares war on {}",
            prefix,
            nation_badge(attacker),
            nation_badge(defender)
        ),
        WorldEventKind::Battle {
            winner,
            loser,
            captured,
            ..
        } => format!(
            "{} {} defeats {} in the field | tiles {}",
            prefix,
            nation_badge(winner),
            nation_badge(loser),
            captured
        ),
        WorldEventKind::PeaceTreaty { a, b, outcome } => format!(
            "{} {} and {} settle | {}",
            prefix,
            nation_badge(a),
            nation_badge(b),
            outcome.label().color(Color::BrightGreen)
        ),
        WorldEventKind::Rebellion { parent, rebel } => format!(
            "{} {} rises against {}",
            prefix,
            nation_badge(rebel),
            nation_badge(parent)
        ),
        WorldEventKind::WorldWarBegan { side_a, side_b } => format!(
            "{} {} | {} nations vs {}",
            prefix,
            "WORLD WAR".color(Color::BrightRed).bold(),
            side_a.len(),
            side_b.len()
        ),
        _ => format!("{} {}", prefix, event.headline()),
    }
}

/// One info line per event this year, under a world header. The TUI owns
/// stdout, so the subscriber is expected to write elsewhere.
pub fn logging_system(
    time: Res<WorldTime>,
    nations: Res<Nations>,
    wars: Res<ActiveWars>,
    world_war: Res<WorldWarState>,
    events: Res<WorldEventLog>,
) {
    let mut header = format!(
        "{} {} {} {}",
        badge("World", Color::BrightWhite),
        badge(&format!("Year {}", time.year), Color::BrightBlack),
        badge(&format!("Nations {}", nations.len()), Color::BrightCyan),
        badge(&format!("Wars {}", wars.list.len()), Color::Red),
    );
    if world_war.active {
        header.push(' ');
        header.push_str(&badge("WORLD WAR", Color::BrightRed));
    }

    let mut lines = vec![header];
    for event in events.of_year(time.year) {
        lines.push(format_event_line(event));
    }
    if lines.len() == 1 {
        lines.push(
            "[Event] a quiet year"
                .color(Color::BrightBlack)
                .to_string(),
        );
    }

    info!("\n{}", lines.join("\n"));
}
