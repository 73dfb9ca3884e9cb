use crate::controller::{ConversationController, SubmitOutcome};
use crate::events::Theme;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, SlashCommand, get_help_text,
};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Binds the composer and the history view to one conversation controller
pub struct ConversationManager {
    controller: ConversationController,
    composer: ConversationComposer,
    theme: Theme,
    status: Option<String>,
}

impl ConversationManager {
    pub fn new(controller: ConversationController, theme: Theme) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new("Type your message..."),
            theme,
            status: None,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Apply a finished reply, if any. Called from the main loop on every event.
    pub fn poll(&mut self) -> bool {
        self.controller.poll_reply()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => return ConversationAction::Exit,
                KeyCode::Char('t') => {
                    self.toggle_theme();
                    return ConversationAction::None;
                }
                _ => {}
            }
        }
        if key.code == KeyCode::Esc {
            return ConversationAction::Exit;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Edited => {
                self.status = None;
                self.controller.update_draft(self.composer.content());
                ConversationAction::None
            }
            ComposerResult::Submit => {
                self.submit();
                ConversationAction::None
            }
            ComposerResult::Command(command) => {
                self.controller.update_draft(self.composer.content());
                self.handle_slash_command(command)
            }
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Handle a bracketed paste
    pub fn handle_paste(&mut self, text: &str) {
        if self.composer.insert_str(text) == ComposerResult::Edited {
            self.controller.update_draft(self.composer.content());
        }
    }

    fn submit(&mut self) {
        match self.controller.submit() {
            SubmitOutcome::Dispatched => {
                self.composer.clear();
                self.status = None;
            }
            SubmitOutcome::Busy => {
                self.status = Some("Still waiting for the previous reply".to_string());
            }
            SubmitOutcome::EmptyDraft => {}
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
        tracing::debug!(theme = self.theme.display_name(), "theme toggled");
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        match command {
            SlashCommand::Theme => {
                self.toggle_theme();
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.status = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    /// Render the header, history, composer and status line
    pub fn render(&self, frame: &mut Frame) {
        let palette = Palette::for_theme(self.theme());
        let area = frame.size();
        frame.render_widget(Paragraph::new("").style(palette.base()), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(3),    // History
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Status
            ])
            .split(area);

        self.render_header(frame, chunks[0], &palette);

        let busy = self.controller.is_awaiting_reply();
        frame.render_widget(
            ConversationHistory::new(self.controller.log(), busy, palette),
            chunks[1],
        );

        self.composer
            .render(chunks[2], frame.buffer_mut(), &palette, busy);

        let status = self
            .status()
            .unwrap_or("Enter send · /help commands · Ctrl+T theme · Esc quit");
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(palette.muted),
            )))
            .style(palette.base()),
            chunks[3],
        );
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let icon = match self.theme {
            Theme::Light => "☾",
            Theme::Dark => "☀",
        };
        let title = " Chat Assistant";
        let hint = format!("{} {} ", icon, self.theme.display_name());
        let pad = (area.width as usize).saturating_sub(title.width() + hint.width());
        let line = Line::from(format!("{}{}{}", title, " ".repeat(pad), hint));
        frame.render_widget(Paragraph::new(line).style(palette.header_style()), area);
    }
}
