//! Input line parsing and listing output.

use thiserror::Error;

use parley_core::{Conversation, ConversationId};

/// What a line of input asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a new conversation
    New,
    /// List conversations
    List,
    /// Switch to the conversation at this 1-based position in the list
    Switch(usize),
    /// Show help
    Help,
    /// Exit
    Quit,
    /// Send a message in the active conversation
    Send(String),
}

/// Why a command line could not be understood
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// `/switch` without a usable number
    #[error("usage: /switch <number> (see /list)")]
    SwitchUsage,
    /// A `/word` that is not a command
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),
}

/// Help text for the command set
pub const HELP: &str = "\
Commands:
  /new          start a new conversation
  /list         list conversations
  /switch <n>   switch to conversation n from /list
  /help         show this help
  /quit         exit
Anything else is sent as a message. Ctrl-C cancels a reply in progress,
or exits when no reply is streaming.";

/// Parse one line of input
///
/// Returns `Ok(None)` for blank input.
///
/// # Errors
///
/// Returns an error for an unknown or malformed `/command`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let command = match name {
        "new" => Command::New,
        "list" => Command::List,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "switch" => {
            let index = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or(CommandError::SwitchUsage)?;
            Command::Switch(index)
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Render the conversation list, newest first, marking the active one
#[must_use]
pub fn format_list(conversations: &[Conversation], active: Option<&ConversationId>) -> String {
    if conversations.is_empty() {
        return "No conversations yet.".to_string();
    }

    conversations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if Some(&c.id) == active { '*' } else { ' ' };
            format!(
                "{marker} {:>2}. {} ({} messages)",
                i + 1,
                c.title,
                c.message_count()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
