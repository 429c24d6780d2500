use std::io::{self, stdout};
use std::panic;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use tokio::sync::{Notify, watch};
use tracing_subscriber::EnvFilter;

mod simulation;
mod ui;

use simulation::{ObserverSnapshot, SimulationConfig, SimulationWorld};
use ui::{ControlState, LogFilter, PresetStatus};

const SAVE_PATH: &str = "atlas_save.json";
const LOG_PATH: &str = "atlas_nations.log";

#[derive(Clone, Copy)]
struct SpeedPreset {
    key: char,
    label: &'static str,
    intent: &'static str,
    tick_ms: u64,
}

impl SpeedPreset {
    fn duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

const SPEED_PRESETS: [SpeedPreset; 4] = [
    SpeedPreset {
        key: '1',
        label: "Chronicle",
        intent: "slow observation",
        tick_ms: 1_600,
    },
    SpeedPreset {
        key: '2',
        label: "Standard",
        intent: "balanced pace",
        tick_ms: 1_000,
    },
    SpeedPreset {
        key: '3',
        label: "Campaign",
        intent: "fast centuries",
        tick_ms: 400,
    },
    SpeedPreset {
        key: '4',
        label: "Epoch",
        intent: "millennia rush",
        tick_ms: 120,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The TUI owns stdout, so the world pulse log goes to a file.
    let log_file = std::fs::File::create(LOG_PATH)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .init();

    let config = SimulationConfig {
        tick_duration: Duration::from_secs(1),
        ..Default::default()
    };
    let initial_tick_duration = config.tick_duration;

    let (tick_duration_tx, mut tick_duration_rx) = watch::channel(initial_tick_duration);
    let (pause_tx, mut pause_rx) = watch::channel(false);
    let (save_tx, mut save_rx) = watch::channel(0u64);
    let mut active_preset: Option<char> = Some('2');
    let mut log_filter = LogFilter::All;
    let mut last_save: Option<String> = None;

    let observer = Arc::new(RwLock::new(ObserverSnapshot::default()));
    let shutdown_notify = Arc::new(Notify::new());

    // A save left by a previous run resumes the same world.
    let mut simulation = SimulationWorld::resume_or_new(config, SAVE_PATH, observer.clone());
    let notify_for_simulation = shutdown_notify.clone();
    let simulation_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(*tick_duration_rx.borrow());
        let mut paused = *pause_rx.borrow();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !paused {
                        simulation.tick();
                    }
                },
                result = tick_duration_rx.changed() => {
                    if result.is_ok() {
                        let new_duration = *tick_duration_rx.borrow();
                        interval = tokio::time::interval(new_duration);
                    } else {
                        // Channel closed, time to shut down
                        break;
                    }
                },
                result = pause_rx.changed() => {
                    if result.is_ok() {
                        paused = *pause_rx.borrow();
                    } else {
                        break;
                    }
                },
                result = save_rx.changed() => {
                    if result.is_ok() {
                        match simulation.save().save_to_path(SAVE_PATH) {
                            Ok(()) => tracing::info!("world saved to {SAVE_PATH}"),
                            Err(err) => tracing::warn!("save failed: {err}"),
                        }
                    } else {
                        break;
                    }
                },
                _ = notify_for_simulation.notified() => break,
            }
        }
    });
    let ctrlc_notify = shutdown_notify.clone();
    let ctrl_c_task = tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrlc_notify.notify_waiters();
    });

    let mut terminal = init_terminal()?;
    let mut term_guard = TerminalGuard::new();
    panic::set_hook(Box::new(|info| {
        let _ = restore_terminal();
        eprintln!("panic: {info}");
    }));
    let mut app_should_run = true;

    while app_should_run {
        let control_state = ControlState {
            paused: *pause_tx.borrow(),
            tick_duration: *tick_duration_tx.borrow(),
            preset_status: preset_status(active_preset),
            log_filter,
            last_save: last_save.clone(),
        };

        terminal.draw(|frame| {
            let snapshot = observer.read().expect("Observer lock is poisoned").clone();
            ui::render(frame, &snapshot, &control_state);
        })?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => app_should_run = false,
                    KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => {
                        let new_state = !*pause_tx.borrow();
                        pause_tx.send(new_state).ok();
                    }
                    KeyCode::Char(c @ '1'..='4') => {
                        if let Some(selected) = apply_preset(c, &tick_duration_tx) {
                            active_preset = Some(selected);
                            pause_tx.send(false).ok();
                        }
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        let current_duration = *tick_duration_tx.borrow();
                        let new_duration = (current_duration / 2).max(Duration::from_millis(1));
                        active_preset = None;
                        tick_duration_tx.send(new_duration).ok();
                    }
                    KeyCode::Char('-') => {
                        let current_duration = *tick_duration_tx.borrow();
                        let new_duration = current_duration * 2;
                        active_preset = None;
                        tick_duration_tx.send(new_duration).ok();
                    }
                    KeyCode::Char('f') | KeyCode::Char('F') => {
                        log_filter = log_filter.next();
                    }
                    KeyCode::Char('s') | KeyCode::Char('S') => {
                        let next = *save_tx.borrow() + 1;
                        save_tx.send(next).ok();
                        last_save = Some(SAVE_PATH.to_string());
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        active_preset = Some('2');
                        tick_duration_tx.send(initial_tick_duration).ok();
                        pause_tx.send(false).ok();
                    }
                    _ => {}
                }
            }
        }

        if ctrl_c_task.is_finished() {
            app_should_run = false;
        }
    }

    shutdown_notify.notify_waiters();
    simulation_task.await?;
    restore_terminal()?;
    term_guard.disarm();

    Ok(())
}

fn preset_status(active: Option<char>) -> Vec<PresetStatus> {
    SPEED_PRESETS
        .iter()
        .map(|preset| PresetStatus {
            key: preset.key,
            label: preset.label,
            intent: preset.intent,
            tick_ms: preset.tick_ms,
            active: Some(preset.key) == active,
        })
        .collect()
}

fn apply_preset(key: char, tick_duration_tx: &watch::Sender<Duration>) -> Option<char> {
    let preset = SPEED_PRESETS.iter().find(|p| p.key == key)?;
    tick_duration_tx.send(preset.duration()).ok();
    Some(key)
}

fn init_terminal() -> io::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Ensures terminal is restored on panic/early-return.
struct TerminalGuard {
    armed: bool,
}

impl TerminalGuard {
    fn new() -> Self {
        Self { armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = restore_terminal();
        }
    }
}
