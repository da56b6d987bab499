//! The `run` command: poll loop and display loop side by side.
//!
//! One round runs before the first frame so the board starts populated.
//! After that the poll loop runs as its own task and the display re-reads
//! the store once a second; the two share nothing but the database.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{watch, Notify};
use tracing::{error, info, warn};

use crate::app::App;
use crate::config::AppConfig;
use crate::events;
use crate::headless::PollDriver;
use crate::store::Store;
use crate::ui::{self, Theme};

/// How often the display re-reads the store.
const RELOAD_INTERVAL: Duration = Duration::from_secs(1);
/// Pause between frames, during which the poll task gets to run.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Options of the `run` command.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Draw on the alternate screen.
    pub screen: bool,
    /// Draw a single frame and exit.
    pub once: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            screen: true,
            once: false,
        }
    }
}

/// Entry point of the `run` command.
pub async fn run(config: AppConfig, options: RunOptions) -> Result<()> {
    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database {}", config.database_path.display()))?;
    let mut driver = PollDriver::connect(&config, store.clone()).await?;

    match driver.round().await {
        Ok(report) => info!(timestamp = report.timestamp, "{report}"),
        Err(err) => error!(error = %err, "failed to persist initial poll round"),
    }

    if options.once {
        let result = draw_once(&config, &store).await;
        store.close().await;
        return result;
    }

    let poll_now = Arc::new(Notify::new());
    let (stop_tx, stop_rx) = watch::channel(false);
    let poll_task = {
        let poll_now = Arc::clone(&poll_now);
        let interval = config.poll_interval;
        tokio::spawn(async move { driver.run(interval, false, poll_now, stop_rx).await })
    };

    let result = run_tui(&config, &store, &poll_now, options.screen).await;

    let _ = stop_tx.send(true);
    if let Err(err) = poll_task.await {
        warn!(error = %err, "poll task ended abnormally");
    }
    store.close().await;
    result
}

/// Render one frame to the normal screen.
async fn draw_once(config: &AppConfig, store: &Store) -> Result<()> {
    let mut app = App::new(config, Theme::auto_detect());
    if let Err(err) = app.reload(store).await {
        app.load_error = Some(err.to_string());
    }

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    terminal.draw(|frame| ui::render(frame, &app))?;
    terminal.show_cursor()?;
    println!();
    Ok(())
}

/// Run the interactive display until the user quits.
async fn run_tui(config: &AppConfig, store: &Store, poll_now: &Notify, screen: bool) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if screen {
        execute!(stdout, EnterAlternateScreen)?;
    }
    execute!(stdout, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic);
    }));

    let mut app = App::new(config, Theme::auto_detect());
    if !screen {
        terminal.clear()?;
    }

    let result = run_app(&mut terminal, &mut app, store, poll_now).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture)?;
    if screen {
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    }
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    store: &Store,
    poll_now: &Notify,
) -> Result<()> {
    let mut last_reload: Option<Instant> = None;

    while app.running {
        if last_reload.map_or(true, |at| at.elapsed() >= RELOAD_INTERVAL) {
            if let Err(err) = app.reload(store).await {
                warn!(error = %err, "failed to reload from the store");
                app.load_error = Some(err.to_string());
            }
            last_reload = Some(Instant::now());
        }

        terminal.draw(|frame| ui::render(frame, app))?;

        // Drain input without blocking the scheduler
        while let Some(event) = events::poll_event(Duration::ZERO)? {
            events::handle_event(app, event);
        }
        if app.take_poll_request() {
            poll_now.notify_one();
        }

        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    Ok(())
}
