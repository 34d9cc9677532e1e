//! Cyberpad TUI
//!
//! Terminal user interface for browsing and editing the page tree.
//!
//! ## Layout
//!
//! Two-pane layout:
//! - Left: Page tree with expand/collapse
//! - Right: Blocks of the active page
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - Space: Toggle children
//! - l/→ and h/←: Expand, collapse (or jump to parent)
//! - Enter: Open the selected page
//! - q: Quit
//!
//! ## Commands
//!
//! - n: New root page
//! - c: New child of the selected page
//! - r: Rename page
//! - d: Delete page

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cyberpad_core::Config;

use app::{App, InputMode};

use crate::commands::Session;

/// Run the TUI application
pub fn run(config: Config, user_flag: Option<&str>) -> Result<()> {
    // File-based, so log lines don't land on the terminal
    init_tui_logging(&config);

    let mut session = Session::open(config, user_flag)?;
    let data = session.load()?;
    let identity = session.require_identity()?.to_string();

    let mut app = App::new(data, identity);
    app.usage = session.store.usage();

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, &mut app, &mut session);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    session: &mut Session,
) -> Result<()> {
    loop {
        app.check_status_timeout();
        terminal.draw(|frame| ui::draw(frame, app))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // If help is showing, any key dismisses it
        if app.show_help {
            app.show_help = false;
            continue;
        }

        let changed = match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, key.code, key.modifiers),
            InputMode::Title => handle_title_mode(app, key.code, key.modifiers),
        };

        if changed {
            persist(app, session);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Save the workspace, reporting failure in the status bar
fn persist(app: &mut App, session: &mut Session) {
    match session.save(&app.data) {
        Ok(()) => {}
        Err(e) => {
            warn!(error = %e, "Save failed");
            app.set_status(format!("Not saved: {}", e));
        }
    }
    app.usage = session.store.usage();
}

/// Handle key events in normal mode
///
/// Returns true if the workspace changed and should be saved.
fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    if matches!(
        code,
        KeyCode::Char('j') | KeyCode::Char('k') | KeyCode::Up | KeyCode::Down
    ) {
        app.status_message = None;
    }

    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('g') | KeyCode::Home => app.move_to_first(),
        KeyCode::Char('G') | KeyCode::End => app.move_to_last(),

        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('l') | KeyCode::Right => app.expand_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Enter => return app.open_selected(),

        KeyCode::Char('n') => app.begin_new_root(),
        KeyCode::Char('c') => app.begin_new_child(),
        KeyCode::Char('r') => app.begin_rename(),
        KeyCode::Char('d') => return app.delete_selected(),

        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }

    false
}

/// Handle key events while typing a title
fn handle_title_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Esc => app.exit_input_mode(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }
        KeyCode::Enter => return app.submit_title(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        _ => {}
    }
    false
}

/// Initialize logging for TUI mode
///
/// Only initializes if CYBERPAD_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("CYBERPAD_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "cyberpad_core={},cyberpad_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberpad_core::WorkspaceData;

    fn app() -> App {
        let mut data = WorkspaceData::empty();
        let root = data.add_page("Root", None).unwrap();
        data.add_page("Child", Some(&root)).unwrap();
        App::new(data, "neo")
    }

    #[test]
    fn test_navigation_keys_do_not_save() {
        let mut app = app();
        assert!(!handle_normal_mode(&mut app, KeyCode::Char(' '), KeyModifiers::NONE));
        assert_eq!(app.rows.len(), 2);
        assert!(!handle_normal_mode(&mut app, KeyCode::Char('j'), KeyModifiers::NONE));
        assert_eq!(app.selected, 1);
        assert!(!handle_normal_mode(&mut app, KeyCode::Char('h'), KeyModifiers::NONE));
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_enter_and_delete_request_save() {
        let mut app = app();
        assert!(handle_normal_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE));
        assert!(handle_normal_mode(&mut app, KeyCode::Char('d'), KeyModifiers::NONE));
        assert!(app.rows.is_empty());
    }

    #[test]
    fn test_title_entry_flow() {
        let mut app = app();
        handle_normal_mode(&mut app, KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(app.input_mode, InputMode::Title);

        // 'q' is text here, not quit
        assert!(!handle_title_mode(&mut app, KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.should_quit);
        assert!(handle_title_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.active_page().unwrap().title, "q");

        handle_normal_mode(&mut app, KeyCode::Char('r'), KeyModifiers::NONE);
        assert!(!handle_title_mode(&mut app, KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        handle_normal_mode(&mut app, KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.should_quit);
    }
}
