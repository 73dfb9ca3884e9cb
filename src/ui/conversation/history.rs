//! Conversation history display component

use crate::events::{Author, ChatMessage};
use crate::ui::theme::Palette;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Renders the message log as chat bubbles, newest at the bottom.
///
/// User bubbles sit on the left, assistant bubbles on the right.
pub struct ConversationHistory<'a> {
    messages: &'a [ChatMessage],
    awaiting_reply: bool,
    palette: Palette,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [ChatMessage], awaiting_reply: bool, palette: Palette) -> Self {
        Self {
            messages,
            awaiting_reply,
            palette,
        }
    }

    fn welcome_lines(&self) -> Vec<Line<'static>> {
        vec![
            Line::from(Span::styled(
                "Welcome to Chat Assistant!",
                Style::default()
                    .fg(self.palette.header)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Type a message below and press Enter to send.",
                Style::default().fg(self.palette.muted),
            )),
            Line::from(Span::styled(
                "Ctrl+T toggles the theme, /help lists commands.",
                Style::default().fg(self.palette.muted),
            )),
        ]
    }

    /// Lay out one message: a header row followed by the padded bubble rows
    fn message_lines(&self, message: &ChatMessage, width: usize) -> Vec<Line<'static>> {
        let max_bubble = (width * 3 / 4).max(4).min(width);
        let wrapped = wrap_text(message.text(), max_bubble.saturating_sub(2));
        let text_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);
        let bubble_width = (text_width + 2).min(width);

        let header = format!(
            "{} · {}",
            message.author().display_name(),
            message.sent_at().format("%H:%M")
        );

        let mut lines = Vec::with_capacity(wrapped.len() + 1);
        lines.push(self.aligned(
            message.author(),
            header.width(),
            width,
            Span::styled(header, Style::default().fg(self.palette.muted)),
        ));

        let style = self.palette.bubble(message.author());
        for row in wrapped {
            let fill = text_width - row.width();
            let cell = format!(" {}{} ", row, " ".repeat(fill));
            lines.push(self.aligned(
                message.author(),
                bubble_width,
                width,
                Span::styled(cell, style),
            ));
        }
        lines
    }

    fn aligned(&self, author: Author, len: usize, width: usize, span: Span<'static>) -> Line<'static> {
        match author {
            Author::User => Line::from(vec![Span::raw(" "), span]),
            Author::Assistant => {
                let pad = width.saturating_sub(len + 1);
                Line::from(vec![Span::raw(" ".repeat(pad)), span])
            }
        }
    }

    fn typing_line(&self, width: usize) -> Line<'static> {
        let text = "Assistant is typing…";
        let pad = width.saturating_sub(text.width() + 1);
        Line::from(vec![
            Span::raw(" ".repeat(pad)),
            Span::styled(
                text,
                Style::default()
                    .fg(self.palette.muted)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Conversation ")
            .border_style(Style::default().fg(self.palette.border))
            .style(self.palette.base());

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let mut all_lines: Vec<Line> = Vec::new();

        if self.messages.is_empty() && !self.awaiting_reply {
            all_lines = self.welcome_lines();
        } else {
            for message in self.messages {
                all_lines.extend(self.message_lines(message, width));
                all_lines.push(Line::from(""));
            }
            if self.awaiting_reply {
                all_lines.push(self.typing_line(width));
            }
        }

        // Follow the newest lines
        let height = inner.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}

/// Wrap text to fit within `width` display columns, splitting overlong words
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_width = 0;

        for mut word in paragraph.split_whitespace() {
            while word.width() > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                let (head, tail) = split_at_width(word, width);
                lines.push(head.to_string());
                word = tail;
            }
            if word.is_empty() {
                continue;
            }

            let word_width = word.width();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_width += word_width;
            current_line.push_str(word);
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Split off the longest prefix that fits in `width` columns, at least one char
fn split_at_width(text: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            let at = if i == 0 { c.len_utf8() } else { i };
            return text.split_at(at);
        }
        used += w;
    }
    (text, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Theme;

    fn rows(buf: &Buffer, area: Rect) -> Vec<String> {
        (area.y + 1..area.y + area.height - 1)
            .map(|y| {
                (area.x + 1..area.x + area.width - 1)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect()
            })
            .collect()
    }

    fn render(messages: &[ChatMessage], awaiting: bool, area: Rect) -> Vec<String> {
        let mut buf = Buffer::empty(area);
        ConversationHistory::new(messages, awaiting, Palette::for_theme(Theme::Dark))
            .render(area, &mut buf);
        rows(&buf, area)
    }

    #[test]
    fn wrap_text_respects_width() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("line one\n\nline two", 20), vec!["line one", "", "line two"]);
        assert_eq!(wrap_text("", 5), vec![String::new()]);
    }

    #[test]
    fn wrap_text_counts_display_columns() {
        assert_eq!(wrap_text("你好世界", 5), vec!["你好", "世界"]);
        assert_eq!(wrap_text("ab 你好", 4), vec!["ab", "你好"]);
        // A glyph wider than the line still makes progress
        assert_eq!(wrap_text("你好", 1), vec!["你", "好"]);
    }

    #[test]
    fn wide_glyph_reply_is_shown_in_full() {
        let reply = format!("{}END", "你好世界".repeat(4));
        let messages = vec![ChatMessage::assistant(reply.clone())];
        let rows = render(&messages, false, Rect::new(0, 0, 40, 10));

        // Wide glyphs occupy two cells; the second one renders blank
        let all: String = rows.iter().map(|r| r.replace(' ', "")).collect();
        assert!(all.contains(&reply));

        let last = rows.iter().find(|r| r.contains("END")).unwrap();
        assert!(last.trim_end().ends_with("END"));
    }

    #[test]
    fn empty_log_shows_welcome() {
        let rows = render(&[], false, Rect::new(0, 0, 60, 8));
        assert!(rows[0].contains("Welcome to Chat Assistant!"));
    }

    #[test]
    fn user_left_assistant_right() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello there")];
        let area = Rect::new(0, 0, 40, 12);
        let rows = render(&messages, false, area);

        let user_row = rows.iter().find(|r| r.contains("hi ")).unwrap();
        assert_eq!(user_row.find("hi"), Some(2));

        let reply_row = rows.iter().find(|r| r.contains("Hello there")).unwrap();
        assert!(reply_row.find("Hello there").unwrap() > 20);
        assert!(reply_row.trim_end().ends_with("Hello there"));
    }

    #[test]
    fn typing_indicator_while_awaiting() {
        let messages = vec![ChatMessage::user("ping")];
        let rows = render(&messages, true, Rect::new(0, 0, 40, 10));
        assert!(rows.iter().any(|r| r.contains("Assistant is typing")));

        let rows = render(&messages, false, Rect::new(0, 0, 40, 10));
        assert!(!rows.iter().any(|r| r.contains("Assistant is typing")));
    }

    #[test]
    fn newest_lines_stay_visible() {
        let messages: Vec<ChatMessage> = (0..20)
            .map(|i| ChatMessage::user(format!("message number {i}")))
            .collect();
        let rows = render(&messages, false, Rect::new(0, 0, 40, 8));
        let joined = rows.join("\n");
        assert!(joined.contains("message number 19"));
        assert!(!joined.contains("message number 0 "));
    }
}
