//! Unified event loop merging crossterm input, ticks, and backend events.

use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

use screcon_core::RunEvent;
use screcon_types::Scan;

/// Backend-side happenings reported by spawned tasks.
#[derive(Debug)]
pub enum UiEvent {
    /// Fresh scan collection fetched (unsorted, as the backend sent it).
    ScansLoaded(Vec<Scan>),
    /// The collection fetch failed (cancellations are never reported).
    LoadFailed(String),
    /// A scan was deleted; the collection must be re-fetched.
    Deleted,
    DeleteFailed(String),
    /// Progress from an orchestration run.
    Run(RunEvent),
}

/// Event type consumed by the main loop.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input (Press only).
    Key(KeyEvent),
    /// 100ms render tick.
    Tick,
    Ui(UiEvent),
    Resize,
}

/// Merges crossterm input and task events into a single stream.
pub struct EventHandler {
    tick_rate: Duration,
    ui_rx: mpsc::Receiver<UiEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, ui_rx: mpsc::Receiver<UiEvent>) -> Self {
        Self { tick_rate, ui_rx }
    }

    /// Wait for the next event. Returns `Tick` if nothing happens within
    /// the tick rate.
    pub async fn next(&mut self) -> anyhow::Result<AppEvent> {
        // Drain pending task events first (non-blocking)
        if let Ok(evt) = self.ui_rx.try_recv() {
            return Ok(AppEvent::Ui(evt));
        }

        // Poll crossterm with the tick timeout
        if event::poll(self.tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(AppEvent::Key(key));
                }
                Event::Resize(_, _) => return Ok(AppEvent::Resize),
                _ => {}
            }
        }

        // Check task events again after the poll wait
        if let Ok(evt) = self.ui_rx.try_recv() {
            return Ok(AppEvent::Ui(evt));
        }

        Ok(AppEvent::Tick)
    }
}
