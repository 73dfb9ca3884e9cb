use crate::ui::conversation::commands::{SlashCommand, parse_slash_command};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter on ordinary text; the draft is left in place for the caller
    Submit,
    /// Enter on a slash command; the composer has been cleared
    Command(SlashCommand),
    /// The text changed
    Edited,
    None,
}

/// Single-line input editor. The cursor counts chars, not bytes.
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    cursor: usize,
    placeholder: String,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if let Some(command) = parse_slash_command(&self.content) {
                    self.clear();
                    return ComposerResult::Command(command);
                }
                return ComposerResult::Submit;
            }
            KeyCode::Char(c) => {
                if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    return ComposerResult::None;
                }
                self.insert_char(c);
                return ComposerResult::Edited;
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    return ComposerResult::Edited;
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    return ComposerResult::Edited;
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_len());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor. Line breaks become spaces.
    pub fn insert_str(&mut self, text: &str) -> ComposerResult {
        let mut inserted = false;
        for c in text.chars().filter(|c| *c != '\r') {
            self.insert_char(if c == '\n' { ' ' } else { c });
            inserted = true;
        }
        if inserted {
            ComposerResult::Edited
        } else {
            ComposerResult::None
        }
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.content.remove(at);
        true
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, palette: &Palette, busy: bool) {
        let title = if busy {
            " Waiting for reply… "
        } else {
            " Message "
        };
        let border = if busy { palette.border } else { palette.header };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(border))
            .style(palette.base());

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.content.is_empty() {
            let line = Line::from(vec![
                Span::styled("▌", Style::default().fg(palette.header)),
                Span::styled(self.placeholder.as_str(), Style::default().fg(palette.muted)),
            ]);
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        // Keep the cursor in view by scrolling horizontally. Widths are
        // display columns; the cursor glyph takes one.
        let width = inner.width as usize;
        let chars: Vec<char> = self.content.chars().collect();
        let mut start = self.cursor;
        let mut used = 1;
        while start > 0 {
            let w = chars[start - 1].width().unwrap_or(0);
            if used + w > width {
                break;
            }
            used += w;
            start -= 1;
        }

        let mut visible: String = chars[start..self.cursor].iter().collect();
        visible.push('▌');
        visible.extend(&chars[self.cursor..]);

        let line = Line::from(Span::raw(visible));
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Theme;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            assert_eq!(composer.handle_key(key(KeyCode::Char(c))), ComposerResult::Edited);
        }
    }

    #[test]
    fn typing_and_cursor_editing() {
        let mut composer = ConversationComposer::new("placeholder");
        type_text(&mut composer, "helo");
        composer.handle_key(key(KeyCode::Left));
        type_text(&mut composer, "l");
        assert_eq!(composer.content(), "hello");

        composer.handle_key(key(KeyCode::Home));
        assert_eq!(composer.handle_key(key(KeyCode::Backspace)), ComposerResult::None);
        assert_eq!(composer.handle_key(key(KeyCode::Delete)), ComposerResult::Edited);
        assert_eq!(composer.content(), "ello");

        composer.handle_key(key(KeyCode::End));
        assert_eq!(composer.handle_key(key(KeyCode::Delete)), ComposerResult::None);
    }

    #[test]
    fn multibyte_characters_edit_cleanly() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "café");
        composer.handle_key(key(KeyCode::Left));
        type_text(&mut composer, "f");
        composer.handle_key(key(KeyCode::End));
        composer.handle_key(key(KeyCode::Backspace));
        assert_eq!(composer.content(), "caff");
    }

    #[test]
    fn enter_submits_without_clearing() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "hi");
        assert_eq!(composer.handle_key(key(KeyCode::Enter)), ComposerResult::Submit);
        assert_eq!(composer.content(), "hi");
    }

    #[test]
    fn enter_on_slash_command_clears() {
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "/theme");
        assert_eq!(
            composer.handle_key(key(KeyCode::Enter)),
            ComposerResult::Command(SlashCommand::Theme)
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn control_chords_do_not_insert() {
        let mut composer = ConversationComposer::new("");
        let chord = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL);
        assert_eq!(composer.handle_key(chord), ComposerResult::None);
        assert_eq!(composer.content(), "");

        let shifted = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(composer.handle_key(shifted), ComposerResult::Edited);
        assert_eq!(composer.content(), "A");
    }

    #[test]
    fn paste_flattens_line_breaks() {
        let mut composer = ConversationComposer::new("");
        assert_eq!(composer.insert_str("one\r\ntwo"), ComposerResult::Edited);
        assert_eq!(composer.content(), "one two");
        assert_eq!(composer.insert_str(""), ComposerResult::None);
    }

    #[test]
    fn render_scrolls_to_keep_cursor_visible() {
        let palette = Palette::for_theme(Theme::Light);
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "abcdefghijklmnopqrstuvwxyz");

        let area = Rect::new(0, 0, 12, 3);
        let mut buf = Buffer::empty(area);
        composer.render(area, &mut buf, &palette, false);

        let row: String = (1..11).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert_eq!(row, "rstuvwxyz▌");
    }

    #[test]
    fn render_scrolls_by_display_width() {
        let palette = Palette::for_theme(Theme::Light);
        let mut composer = ConversationComposer::new("");
        type_text(&mut composer, "你好世界你好世界");

        let area = Rect::new(0, 0, 12, 3);
        let mut buf = Buffer::empty(area);
        composer.render(area, &mut buf, &palette, false);

        let row: String = (1..11).map(|x| buf.get(x, 1).symbol().to_string()).collect();
        assert_eq!(row.replace(' ', ""), "你好世界▌");
    }
}
