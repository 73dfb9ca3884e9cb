use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Terminal events delivered to the application loop
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Periodic redraw and reply polling
    Tick,
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn display_name(&self) -> &'static str {
        match self {
            Author::User => "You",
            Author::Assistant => "Assistant",
        }
    }
}

/// A single chat bubble. Immutable once created.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    text: String,
    author: Author,
    sent_at: DateTime<Local>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Author::User)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text.into(), Author::Assistant)
    }

    fn new(text: String, author: Author) -> Self {
        Self {
            text,
            author,
            sent_at: Local::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn sent_at(&self) -> DateTime<Local> {
        self.sent_at
    }
}

/// Color scheme selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}
