use ratatui::{
    prelude::*,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use super::{ControlState, THEME};
use crate::simulation::{ObserverSnapshot, WorldEventKind};

fn nation_color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

pub fn render_nation_leaderboard(frame: &mut Frame, area: Rect, snapshot: &ObserverSnapshot) {
    let outer_block = Block::bordered()
        .title(" NATIONS — by GDP ")
        .title_style(Style::default().fg(THEME.accent).bold())
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(THEME.border));
    frame.render_widget(outer_block.clone(), area);
    let inner = outer_block.inner(area);

    let header = Row::new(
        ["Nation", "Gov", "Tiles", "Stab", "GDP", "Pop", "Army", "Navy"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::White).bold())),
    )
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = snapshot
        .nations
        .iter()
        .take(inner.height.saturating_sub(2) as usize)
        .map(|n| {
            let mut name = n.name.clone();
            if n.is_rebel {
                name.push_str(" ⚑");
            }
            if let Some(overlord) = &n.overlord {
                name.push_str(&format!(" (→{overlord})"));
            }
            let stab_color = if n.stability < 40.0 {
                Color::Red
            } else if n.stability < 70.0 {
                Color::Yellow
            } else {
                Color::Green
            };
            let row_style = if n.at_war {
                Style::default().fg(Color::LightRed)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new(vec![
                Cell::from(name).style(Style::default().fg(nation_color(n.color)).bold()),
                Cell::from(n.government),
                Cell::from(n.territory.to_string()),
                Cell::from(format!("{:.0}", n.stability))
                    .style(Style::default().fg(stab_color)),
                Cell::from(format!("{:.0}", n.gdp)),
                Cell::from(format!("{:.1}M", n.population / 1_000_000.0)),
                Cell::from(n.army_strength.to_string()),
                Cell::from(n.navies.to_string()),
            ])
            .style(row_style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Length(5),
        ],
    )
    .header(header);
    frame.render_widget(table, inner);
}

pub fn render_war_theater_panel(frame: &mut Frame, area: Rect, snapshot: &ObserverSnapshot) {
    let title = if snapshot.world_war_active {
        " WAR THEATER — WORLD WAR "
    } else {
        " WAR THEATER "
    };
    let block = Block::bordered()
        .title(title)
        .title_style(Style::default().fg(Color::LightRed).bold())
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(THEME.border));
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let mut lines: Vec<Line> = Vec::new();
    if snapshot.wars.is_empty() {
        lines.push(Line::from(Span::styled(
            "The world is at peace.",
            Style::default().fg(Color::Gray),
        )));
    }
    for war in snapshot.wars.iter().take(inner.height as usize) {
        let duration = snapshot.year.saturating_sub(war.start_year);
        let mut spans = vec![
            Span::styled(
                war.attacker.clone(),
                Style::default().fg(nation_color(war.attacker_color)).bold(),
            ),
            Span::raw(" vs "),
            Span::styled(
                war.defender.clone(),
                Style::default().fg(nation_color(war.defender_color)).bold(),
            ),
            Span::styled(
                format!("  ({duration}y)"),
                Style::default().fg(Color::Gray),
            ),
        ];
        if war.is_world_war {
            spans.push(Span::styled(" WW", Style::default().fg(Color::LightRed).bold()));
        }
        lines.push(Line::from(spans));
    }
    if !snapshot.economy.economic_centers.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Economic centers: ", Style::default().fg(Color::Green)),
            Span::raw(
                snapshot
                    .economy
                    .economic_centers
                    .iter()
                    .map(|(nation, city)| format!("{city} ({nation})"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

pub fn render_event_table(
    frame: &mut Frame,
    area: Rect,
    snapshot: &ObserverSnapshot,
    control: &ControlState,
) {
    let header = Row::new(
        ["Year", "Category", "Event"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::White).bold())),
    )
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = snapshot
        .events
        .iter()
        .rev()
        .filter(|e| control.log_filter.matches(e))
        .take(area.height.saturating_sub(3) as usize)
        .map(|event| {
            let style = match &event.kind {
                WorldEventKind::WarDeclared { .. }
                | WorldEventKind::Battle { .. }
                | WorldEventKind::NavalBattle { .. } => Style::default().fg(Color::Red),
                WorldEventKind::WorldWarBegan { .. } => {
                    Style::default().fg(Color::LightRed).bold()
                }
                WorldEventKind::PeaceTreaty { .. } | WorldEventKind::WorldWarEnded { .. } => {
                    Style::default().fg(Color::Green)
                }
                WorldEventKind::Rebellion { .. } => Style::default().fg(Color::Magenta),
                WorldEventKind::Disaster { .. } => Style::default().fg(Color::Yellow),
                WorldEventKind::NationCollapsed { .. } => Style::default().fg(Color::DarkGray),
                WorldEventKind::TradeAgreement { .. } | WorldEventKind::ColonyFounded { .. } => {
                    Style::default().fg(Color::Cyan)
                }
                _ => Style::default().fg(Color::White),
            };
            Row::new(vec![
                Cell::from(event.year.to_string()),
                Cell::from(event.category()),
                Cell::from(event.headline()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Min(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" WORLD CHRONICLE — filter: {} ", control.log_filter.label()))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, area);
}
