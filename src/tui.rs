use crate::events::TuiEvent;
use anyhow::Result;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;
use tokio::time::Duration;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Tick interval; bounds how long a finished reply waits before it is drawn
const TICK_RATE: Duration = Duration::from_millis(200);

/// Merges terminal input and a periodic tick into one stream
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<TuiEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let tui_event = match evt {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        Some(TuiEvent::Key(key))
                    }
                    Ok(Event::Paste(text)) => Some(TuiEvent::Paste(text)),
                    Ok(Event::Resize(w, h)) => Some(TuiEvent::Resize(w, h)),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::error!(error = %err, "terminal event stream failed");
                        break;
                    }
                };

                if let Some(event) = tui_event {
                    if tx_events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_RATE);
            loop {
                interval.tick().await;
                if tx.send(TuiEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<TuiEvent> {
        self.rx.recv().await
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic.
///
/// Must be called from the thread that drives the UI. Panics on other threads
/// (request tasks, event readers) are recovered elsewhere and only get logged,
/// so the terminal stays in raw mode for the running session.
pub fn install_panic_hook() {
    let ui_thread = thread::current().id();
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let restored = restore_if_ui_thread(ui_thread, || {
            let _ = restore();
        });
        if restored {
            original_hook(panic_info);
        } else {
            tracing::error!(panic = %panic_info, "background task panicked");
        }
    }));
}

/// Run `restore` only when called on `ui_thread`. Returns whether it ran.
fn restore_if_ui_thread(ui_thread: ThreadId, restore: impl FnOnce()) -> bool {
    if thread::current().id() != ui_thread {
        return false;
    }
    restore();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn spawned_tasks_leave_the_terminal_alone() {
        let ui_thread = thread::current().id();
        let restores = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&restores);
        let ran = tokio::spawn(async move {
            restore_if_ui_thread(ui_thread, || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .await
        .unwrap();
        assert!(!ran);
        assert_eq!(restores.load(Ordering::SeqCst), 0);

        let counter = Arc::clone(&restores);
        assert!(restore_if_ui_thread(ui_thread, || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(restores.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_threads_leave_the_terminal_alone() {
        let ui_thread = thread::current().id();
        let ran = thread::spawn(move || restore_if_ui_thread(ui_thread, || {}))
            .join()
            .unwrap();
        assert!(!ran);
    }
}
