use console::{style, StyledObject};
use std::fmt::Display;

fn styled(text: impl Display) -> StyledObject<String> {
    style(text.to_string())
}

/// A stage or measurement still in flight.
pub fn pending(text: impl Display) -> StyledObject<String> {
    styled(text).bright().yellow()
}

pub fn passed(text: impl Display) -> StyledObject<String> {
    styled(text).bright().green()
}

pub fn failed(text: impl Display) -> StyledObject<String> {
    styled(text).bright().red()
}

/// Project names and other identifiers.
pub fn highlight(text: impl Display) -> StyledObject<String> {
    styled(text).cyan()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    styled(text).dim()
}

pub fn strong(text: impl Display) -> StyledObject<String> {
    styled(text).bright()
}

pub fn title(text: impl Display) -> StyledObject<String> {
    styled(text).magenta().bold()
}
