use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::{Stream, StreamExt};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

const TICK_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Terminal input and animation ticks, merged onto one channel
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    reader: JoinHandle<()>,
    reader_done: bool,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::from_stream(EventStream::new())
    }

    pub fn from_stream<S>(mut input: S) -> Self
    where
        S: Stream<Item = io::Result<Event>> + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let tx_events = tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(evt) = input.next().await {
                let app_event = match evt {
                    // Only key presses; releases and repeats on some terminals are noise
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                    Ok(_) => continue,
                    Err(e) => {
                        error!(error = %e, "could not read terminal input");
                        break;
                    }
                };

                if tx_events.send(app_event).is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                if tx.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            reader,
            reader_done: false,
        }
    }

    /// Next event, or `None` once terminal input can no longer be read.
    /// Events already queued are delivered first.
    pub async fn next(&mut self) -> Option<AppEvent> {
        if self.reader_done {
            return None;
        }

        tokio::select! {
            biased;
            event = self.rx.recv() => event,
            result = &mut self.reader => {
                self.reader_done = true;
                match result {
                    Err(e) if e.is_panic() => error!("terminal input reader panicked, quitting"),
                    _ => error!("terminal input closed, quitting"),
                }
                None
            }
        }
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic.
///
/// Must be called from the thread that owns the terminal. Panics anywhere
/// else happen in runtime tasks, which the dispatcher and the event handler
/// catch, so they are only logged; printing them would corrupt the screen.
pub fn install_panic_hook() {
    let ui_thread = std::thread::current().id();
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if std::thread::current().id() != ui_thread {
            tracing::error!(%panic_info, "panic in background task");
            return;
        }
        let _ = restore();
        original_hook(panic_info);
    }));
}
