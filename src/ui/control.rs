use ratatui::{
    prelude::*,
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use super::ControlState;
use crate::simulation::ObserverSnapshot;

/// Renders the control deck with status, presets, and the hotkey legend.
pub fn render_control_deck(
    frame: &mut Frame,
    area: Rect,
    snapshot: &ObserverSnapshot,
    control: &ControlState,
) {
    let block = Block::default()
        .title("COMMAND BRIDGE — tempo / filters")
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(3, 5), Constraint::Ratio(2, 5)])
        .split(inner);

    let active_preset = control
        .preset_status
        .iter()
        .find(|p| p.active)
        .map(|p| format!("{} [{}]", p.label, p.key))
        .unwrap_or_else(|| "Custom flow".to_string());

    let status_lines = vec![
        Line::from(vec![
            Span::styled(
                if control.paused { "PAUSED" } else { "LIVE" },
                Style::default()
                    .fg(if control.paused {
                        Color::Yellow
                    } else {
                        Color::LightGreen
                    })
                    .bold(),
            ),
            Span::raw(" · Tick "),
            Span::styled(
                format!("{} ms", control.tick_duration.as_millis()),
                Style::default().fg(Color::White),
            ),
            Span::raw(" · Preset "),
            Span::styled(active_preset, Style::default().fg(Color::Magenta)),
            Span::raw(" · Log "),
            Span::styled(
                control.log_filter.label(),
                Style::default().fg(Color::Cyan).bold(),
            ),
        ]),
        Line::from(format!(
            "Trade volume {:.0} | Routes {} | Battles this year {}",
            snapshot.economy.global_trade_volume,
            snapshot.economy.route_count,
            snapshot.battles.len()
        )),
        Line::from(match &control.last_save {
            Some(path) => format!("Saved → {path}"),
            None => "No save yet".to_string(),
        }),
        Line::from(vec![
            Span::styled("Hotkeys:", Style::default().fg(Color::Yellow)),
            Span::raw(" Space/P pause  "),
            Span::styled("+-", Style::default().fg(Color::Green)),
            Span::raw(" Tick speed  "),
            Span::styled("1~4", Style::default().fg(Color::LightMagenta)),
            Span::raw(" Preset  "),
            Span::styled("F", Style::default().fg(Color::Cyan)),
            Span::raw(" Log filter  "),
            Span::styled("S", Style::default().fg(Color::LightGreen)),
            Span::raw(" Save  "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ]),
    ];
    let status_paragraph = Paragraph::new(status_lines).wrap(Wrap { trim: true });
    frame.render_widget(status_paragraph, columns[0]);

    let preset_rows: Vec<Row> = control
        .preset_status
        .iter()
        .map(|preset| {
            let marker = if preset.active { "▶" } else { "·" };
            Row::new(vec![
                Cell::from(format!("{marker} {}", preset.label)),
                Cell::from(format!("{} | {}", preset.key, preset.intent)),
                Cell::from(format!("{} ms", preset.tick_ms)),
            ])
            .style(if preset.active {
                Style::default().fg(Color::LightGreen).bold()
            } else {
                Style::default().fg(Color::White)
            })
        })
        .collect();

    let preset_table = Table::new(
        preset_rows,
        [
            Constraint::Length(14),
            Constraint::Min(16),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["Preset", "Role", "Tick"])
            .style(Style::default().fg(Color::White).bold()),
    )
    .block(Block::default().borders(Borders::ALL).title("Speed Presets"));
    frame.render_widget(preset_table, columns[1]);
}
