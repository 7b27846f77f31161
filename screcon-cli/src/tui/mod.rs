//! Interactive terminal dashboard.
//!
//! Three screens: Scans (list + tabbed detail), New scan, Help.
//! All backend traffic runs on spawned tasks that report back through the
//! unified event channel; the UI thread never blocks on the network.

mod app;
mod event;
mod screens;
mod theme;

use std::io;
use std::time::Duration;

use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use screcon_client::ApiClient;

use app::App;
use event::{AppEvent, EventHandler};

/// RAII guard that restores terminal state on drop (including panics).
struct TerminalGuard;

impl TerminalGuard {
    fn setup() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Run the dashboard until the user quits.
pub async fn run_tui(client: ApiClient, default_timing: u8) -> anyhow::Result<()> {
    let _guard = TerminalGuard::setup()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let (ui_tx, ui_rx) = mpsc::channel(64);
    let mut app = App::new(client, default_timing, ui_tx);
    let mut events = EventHandler::new(Duration::from_millis(100), ui_rx);

    // Initial wholesale load of the scan collection
    app.reload();

    loop {
        term.draw(|frame| app.render(frame))?;

        match events.next().await? {
            AppEvent::Key(key) => app.handle_key(key),
            AppEvent::Ui(evt) => app.handle_ui_event(evt),
            AppEvent::Tick => {}
            AppEvent::Resize => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
