//! keyline - an Emacs-style terminal text editor
//!
//! This is the main entry point for the application.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use keyline::app::App;
use keyline::config::{self, Config, UiState};
use keyline::engine::local::LocalEngine;
use keyline::ui;

/// How long to wait for input before redrawing
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// keyline - Emacs-style terminal text editor
#[derive(Parser, Debug)]
#[command(name = "keyline")]
#[command(about = "An Emacs-style terminal text editor", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files to open
    paths: Vec<PathBuf>,

    /// Configuration file [default: <config dir>/keyline/config.json]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file [default: <cache dir>/keyline/keyline.log]
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        print_completions(*shell);
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let (config, config_error) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_path = cli.log_file.clone().unwrap_or_else(config::default_log_path);
    let _log_guard = match config::init_logging(&log_path, &config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Could not set up logging: {}", e);
            None
        }
    };

    if let Some(e) = config_error {
        warn!(target: "config", path = %config_path.display(), error = %e, "bad config, using defaults");
        eprintln!(
            "Warning: Could not load {}: {}. Using defaults.",
            config_path.display(),
            e
        );
    }

    run_editor(&cli.paths, &config)
}

/// Print shell completions
fn print_completions(shell: clap_complete::Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "keyline", &mut std::io::stdout());
}

/// Run the editor on the given files
fn run_editor(paths: &[PathBuf], config: &Config) -> Result<()> {
    let state_path = config::default_state_path();
    let ui_state = UiState::load(&state_path).unwrap_or_else(|e| {
        warn!(target: "config", error = %e, "bad UI state, ignoring it");
        UiState::default()
    });

    let engine = LocalEngine::new(config.engine_settings());
    let mut app = App::new(engine, config, ui_state, Some(state_path))?;
    info!(target: "config", files = paths.len(), "starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;

    // Disambiguate C-/ and friends where the terminal supports it
    let keyboard_enhancement_enabled = execute!(
        stdout,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    )
    .is_ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (width, height) = crossterm::terminal::size()?;
    app.initialize(width, height);
    app.open_paths(paths);

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);
    app.save_state();

    // Restore terminal
    disable_raw_mode()?;
    if keyboard_enhancement_enabled {
        let _ = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags);
    }
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

/// Main application loop
fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        // Draw the UI
        terminal.draw(|frame| ui::render(frame, app))?;

        // Wait for input, then drain everything pending
        if event::poll(POLL_INTERVAL)? {
            app.push_terminal_event(event::read()?);
            while event::poll(Duration::from_millis(0))? {
                app.push_terminal_event(event::read()?);
            }
        }

        if app.process_events() {
            return Ok(());
        }

        app.maybe_save_state();
    }
}
