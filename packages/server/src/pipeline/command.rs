//! Text commands typed into the chat box.

const RENAME_DIRECTIVE: &str = "/nickname";

/// What a raw chat line asks the room to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Change the sender's display name to the (unsanitized) target
    Rename(&'a str),
    /// Broadcast the text as a chat message
    Say(&'a str),
}

/// Classify a raw chat line.
///
/// `/nickname` followed by whitespace or nothing is a rename directive; the
/// rest of the line is the requested name. Anything else is chat.
pub fn parse_command(text: &str) -> Command<'_> {
    match text.strip_prefix(RENAME_DIRECTIVE) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            Command::Rename(rest)
        }
        _ => Command::Say(text),
    }
}
