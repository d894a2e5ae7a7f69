// =============================================================================
// Terminal UI — raw-mode alternate screen driven by the refresh watch channel
// =============================================================================

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

use crate::chart::{self, ChartView};
use crate::config::AppConfig;
use crate::refresh::DashboardState;

/// How long to wait for a key before redrawing (keeps the countdown live).
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Quit,
    Refresh,
    None,
}

pub fn command_for(key: &KeyEvent) -> UiCommand {
    if key.kind != KeyEventKind::Press {
        return UiCommand::None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => UiCommand::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => UiCommand::Quit,
        KeyCode::Char('r') => UiCommand::Refresh,
        _ => UiCommand::None,
    }
}

/// Take over the terminal, run the UI until the user quits, then restore it.
pub fn run(
    config: &AppConfig,
    mut rx: watch::Receiver<DashboardState>,
    refresh_now: Arc<Notify>,
) -> Result<()> {
    install_panic_hook();
    enable_raw_mode().context("failed to enable raw mode")?;

    let res = enter_and_loop(config, &mut rx, &refresh_now);

    // Restore even when the loop failed; its error wins.
    let restored = restore_terminal().context("failed to restore terminal");
    res.and(restored)
}

fn enter_and_loop(
    config: &AppConfig,
    rx: &mut watch::Receiver<DashboardState>,
    refresh_now: &Notify,
) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialise terminal")?;

    ui_loop(&mut terminal, config, rx, refresh_now)
}

/// Leave raw mode and the alternate screen and show the cursor. Every step
/// is attempted.
fn restore_terminal() -> io::Result<()> {
    first_error([
        disable_raw_mode(),
        execute!(io::stdout(), LeaveAlternateScreen),
        execute!(io::stdout(), cursor::Show),
    ])
}

fn first_error(results: impl IntoIterator<Item = io::Result<()>>) -> io::Result<()> {
    results.into_iter().fold(Ok(()), |acc, next| acc.and(next))
}

/// A panic on the UI thread would otherwise leave the shell in raw mode.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}

fn ui_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &AppConfig,
    rx: &mut watch::Receiver<DashboardState>,
    refresh_now: &Notify,
) -> Result<()> {
    let mut view = ChartView::new(config, rx.borrow_and_update().clone());

    loop {
        match rx.has_changed() {
            Ok(true) => {
                // Fresh chart state for every tick: drop the old view and wipe
                // the screen before drawing the new one.
                view = ChartView::new(config, rx.borrow_and_update().clone());
                terminal.clear()?;
                debug!(state = ?view.state().updated_at(), "dashboard state replaced");
            }
            Ok(false) => {}
            Err(_) => {
                info!("refresh loop ended; closing UI");
                break;
            }
        }

        terminal.draw(|f| chart::draw(f, &view, Utc::now()))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                match command_for(&key) {
                    UiCommand::Quit => {
                        info!("quit requested");
                        break;
                    }
                    UiCommand::Refresh => refresh_now.notify_one(),
                    UiCommand::None => {}
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        assert_eq!(command_for(&press(KeyCode::Char('q'), KeyModifiers::NONE)), UiCommand::Quit);
        assert_eq!(command_for(&press(KeyCode::Esc, KeyModifiers::NONE)), UiCommand::Quit);
        assert_eq!(command_for(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)), UiCommand::Quit);
    }

    #[test]
    fn refresh_and_other_keys() {
        assert_eq!(command_for(&press(KeyCode::Char('r'), KeyModifiers::NONE)), UiCommand::Refresh);
        assert_eq!(command_for(&press(KeyCode::Char('c'), KeyModifiers::NONE)), UiCommand::None);
        assert_eq!(command_for(&press(KeyCode::Up, KeyModifiers::NONE)), UiCommand::None);
    }

    fn step(log: &mut Vec<&'static str>, name: &'static str, fail: bool) -> io::Result<()> {
        log.push(name);
        if fail {
            Err(io::Error::other(name))
        } else {
            Ok(())
        }
    }

    #[test]
    fn restore_runs_every_step_and_reports_first_failure() {
        let mut log = Vec::new();
        let res = first_error([
            step(&mut log, "raw mode", true),
            step(&mut log, "alternate screen", false),
            step(&mut log, "cursor", true),
        ]);
        assert_eq!(log, ["raw mode", "alternate screen", "cursor"]);
        assert_eq!(res.unwrap_err().to_string(), "raw mode");
    }

    #[test]
    fn restore_ok_when_all_steps_succeed() {
        let mut log = Vec::new();
        assert!(first_error([step(&mut log, "a", false), step(&mut log, "b", false)]).is_ok());
    }

    #[test]
    fn key_release_is_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(command_for(&release), UiCommand::None);
    }
}
