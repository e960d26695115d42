use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleetwatch::app::{App, View};
use fleetwatch::config::{Overrides, Settings};
use fleetwatch::export::export_once;
use fleetwatch::live::LiveData;
use fleetwatch::{events, ui};

/// How often the UI loop wakes to redraw and pick up new snapshots.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "fleetwatch", version)]
#[command(about = "Terminal dashboard for a fleet of monitored servers")]
struct Args {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the monitoring server
    #[arg(long, conflicts_with = "file")]
    endpoint: Option<String>,

    /// Read snapshots from a JSON file instead of a server
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Roster JSON file to use with --file
    #[arg(long, requires = "file")]
    roster_file: Option<PathBuf>,

    /// Refresh interval in milliseconds
    #[arg(short, long)]
    refresh: Option<u64>,

    /// Records kept per node history
    #[arg(long)]
    history: Option<u64>,

    /// Fetch once, export state to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write logs to this file (the TUI owns the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let settings = Settings::load(
        args.config.as_deref(),
        &Overrides {
            endpoint: args.endpoint.clone(),
            file: args.file.clone(),
            roster_file: args.roster_file.clone(),
            refresh_interval_ms: args.refresh,
            history_capacity: args.history,
        },
    )?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let _guard = runtime.enter();

    let live = LiveData::new(settings.sources()?, settings.live_options());
    info!(source = live.description(), "fleetwatch starting");

    if let Some(path) = &args.export {
        let data = runtime.block_on(export_once(&live, &settings.thresholds, path))?;
        println!(
            "Exported {} nodes ({} online) to: {}",
            data.nodes.len(),
            data.summary.online,
            path.display()
        );
        return Ok(());
    }

    live.start();
    let app = App::new(live, settings.thresholds, settings.ping_hours);
    run_tui(app)
}

/// Install the tracing subscriber.
///
/// Export mode logs to stderr. The TUI logs to `--log-file` when given and
/// discards logs otherwise, so nothing is drawn over the screen.
fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&args.log_file, &args.export) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
        }
        (None, Some(_)) => {
            let _ = builder.with_writer(io::stderr).try_init();
        }
        (None, None) => {
            let _ = builder.with_writer(io::sink).try_init();
        }
    }
    Ok(())
}

/// Run the TUI until the user quits.
fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal before printing a panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.live().stop();
    info!("fleetwatch stopped");
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        app.reload_data();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Nodes => ui::nodes::render(frame, app, chunks[2]),
                View::Regions => ui::regions::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay() {
                ui::detail::render_overlay(frame, app, area);
            }
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(FRAME_INTERVAL)? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                // Content starts after header (1) + tabs (1) + table border (1)
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, 3),
                _ => {}
            }
        }
    }

    Ok(())
}
