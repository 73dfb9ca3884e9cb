use crate::events::{Author, Theme};
use ratatui::style::{Color, Modifier, Style};

/// Resolved colors for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub header: Color,
    pub header_text: Color,
    pub border: Color,
    pub user_bubble: Color,
    pub user_text: Color,
    pub assistant_bubble: Color,
    pub assistant_text: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: Color::Rgb(250, 250, 250),
                foreground: Color::Black,
                muted: Color::Rgb(117, 117, 117),
                header: Color::Rgb(25, 118, 210),
                header_text: Color::White,
                border: Color::Rgb(189, 189, 189),
                user_bubble: Color::Rgb(224, 224, 224),
                user_text: Color::Black,
                assistant_bubble: Color::Rgb(25, 118, 210),
                assistant_text: Color::White,
            },
            Theme::Dark => Palette {
                background: Color::Rgb(18, 18, 18),
                foreground: Color::Rgb(238, 238, 238),
                muted: Color::Rgb(158, 158, 158),
                header: Color::Rgb(51, 51, 51),
                header_text: Color::White,
                border: Color::Rgb(97, 97, 97),
                user_bubble: Color::Rgb(224, 224, 224),
                user_text: Color::Black,
                assistant_bubble: Color::Rgb(25, 118, 210),
                assistant_text: Color::White,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_text)
            .bg(self.header)
            .add_modifier(Modifier::BOLD)
    }

    pub fn bubble(&self, author: Author) -> Style {
        match author {
            Author::User => Style::default().fg(self.user_text).bg(self.user_bubble),
            Author::Assistant => Style::default()
                .fg(self.assistant_text)
                .bg(self.assistant_bubble),
        }
    }
}
