use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Toggle between the light and dark theme
    Theme,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Theme => "toggle light/dark theme",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input.
///
/// Unknown commands return `None` so the text is sent as a normal message.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let rest = input.strip_prefix('/')?;
    let mut words = rest.split_whitespace();
    let head = words.next()?.to_lowercase();
    if words.next().is_some() {
        return None;
    }

    SlashCommand::from_str(&head)
        .ok()
        .or_else(|| match head.as_str() {
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })
}

/// One-line summary of the commands and key bindings
pub fn get_help_text() -> String {
    let commands: Vec<String> = SlashCommand::iter()
        .map(|c| format!("/{} {}", c.command(), c.description()))
        .collect();
    format!(
        "{} · Ctrl+T theme · Esc/Ctrl+C/Ctrl+D quit",
        commands.join(" · ")
    )
}
