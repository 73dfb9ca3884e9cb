use crate::events::TuiEvent;
use crate::tui::{self, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::Result;

/// Run the interactive session until the user quits
pub async fn run(mut manager: ConversationManager) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = event_loop(&mut terminal, &mut manager).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    let mut events = EventHandler::new();

    loop {
        manager.poll();
        terminal.draw(|frame| manager.render(frame))?;

        match events.next().await {
            Some(TuiEvent::Key(key)) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    break;
                }
            }
            Some(TuiEvent::Paste(text)) => manager.handle_paste(&text),
            Some(TuiEvent::Resize(width, height)) => {
                tracing::debug!(width, height, "terminal resized");
            }
            Some(TuiEvent::Tick) => {}
            None => break,
        }
    }

    tracing::info!(
        messages = manager.controller().log().len(),
        "session ended"
    );
    Ok(())
}
