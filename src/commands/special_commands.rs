//! Special commands parser for interactive chat mode
//!
//! This module parses the special commands that can be entered during an
//! interactive chat instead of a message. They manage sessions, toggle web
//! search, rate answers, and show help.
//!
//! Commands are prefixed with `/` and are case-insensitive.

use crate::conversation::Rating;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the session list or the view instead of being
/// sent to the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new conversation
    NewSession,

    /// List stored conversations
    ListSessions,

    /// Switch to the conversation with this id
    SwitchSession(String),

    /// Delete a conversation (the current one when no id is given)
    DeleteSession(Option<String>),

    /// Remove all messages from the current conversation
    ClearSession,

    /// Set web search on/off, or toggle it when `None`
    Search(Option<bool>),

    /// Rate an answer (the latest one when no id is given)
    Rate {
        rating: Rating,
        message_id: Option<String>,
    },

    /// Display the current session and search status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command, send as a message
    None,
}

fn optional_argument(input: &str, command: &str) -> Option<String> {
    let rest = input[command.len()..].trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Parse user input into a special command
///
/// Session commands:
/// - `/new` - Start a new conversation
/// - `/sessions` - List conversations
/// - `/switch <id>` - Switch conversation
/// - `/delete [id]` - Delete a conversation
/// - `/clear` - Clear the current conversation
///
/// Other commands:
/// - `/search [on|off]` - Toggle or set web search
/// - `/up [id]`, `/down [id]` - Rate an answer
/// - `/status` - Show current session and search status
/// - `/help` - Show help information
/// - `exit` or `quit` - Exit the session
///
/// # Examples
///
/// ```
/// use kfupm_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/search on").unwrap();
/// assert_eq!(cmd, SpecialCommand::Search(Some(true)));
///
/// let cmd = parse_special_command("/switch 1700000000000").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchSession("1700000000000".to_string()));
///
/// let cmd = parse_special_command("what are the library hours?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// // Invalid command returns error
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/new" => Ok(SpecialCommand::NewSession),
        "/sessions" | "/history" => Ok(SpecialCommand::ListSessions),

        "/switch" => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <session_id>".to_string(),
        }),
        input if input.starts_with("/switch ") => Ok(SpecialCommand::SwitchSession(
            input[8..].trim().to_string(),
        )),

        "/delete" => Ok(SpecialCommand::DeleteSession(None)),
        input if input.starts_with("/delete ") => Ok(SpecialCommand::DeleteSession(
            optional_argument(input, "/delete"),
        )),

        "/clear" => Ok(SpecialCommand::ClearSession),

        "/search" => Ok(SpecialCommand::Search(None)),
        "/search on" => Ok(SpecialCommand::Search(Some(true))),
        "/search off" => Ok(SpecialCommand::Search(Some(false))),
        input if input.starts_with("/search ") => Err(CommandError::UnsupportedArgument {
            command: "/search".to_string(),
            arg: input[8..].trim().to_string(),
        }),

        input if input == "/up" || input.starts_with("/up ") => Ok(SpecialCommand::Rate {
            rating: Rating::Up,
            message_id: optional_argument(input, "/up"),
        }),
        input if input == "/down" || input.starts_with("/down ") => Ok(SpecialCommand::Rate {
            rating: Rating::Down,
            message_id: optional_argument(input, "/down"),
        }),

        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),

        // Exit commands
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        input if input.starts_with('/') => {
            let cmd = input.split_whitespace().next().unwrap_or(input);
            Err(CommandError::UnknownCommand(cmd.to_string()))
        }

        // Not a special command
        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CONVERSATIONS:
  /new             - Start a new conversation
  /sessions        - List conversations (most recent first)
  /switch <id>     - Switch to another conversation
  /delete [id]     - Delete a conversation (default: the current one)
  /clear           - Remove all messages from the current conversation

ANSWERS:
  /search          - Toggle web search for the next messages
  /search on|off   - Enable or disable web search
  /up [id]         - Rate an answer as helpful (default: the latest one)
  /down [id]       - Rate an answer as not helpful
  Ctrl-C           - Skip the typing animation of an answer

SESSION INFORMATION:
  /status          - Show the current conversation and search status
  /help            - Show this help message
  /?               - Same as /help

SESSION CONTROL:
  exit             - Exit interactive mode
  quit             - Same as exit

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent to the assistant
  - Messages are limited to 2000 characters
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_text_is_not_a_command() {
        assert_eq!(
            parse_special_command("How do I register?").unwrap(),
            SpecialCommand::None
        );
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(
            parse_special_command("/NEW").unwrap(),
            SpecialCommand::NewSession
        );
        assert_eq!(
            parse_special_command("/sessions").unwrap(),
            SpecialCommand::ListSessions
        );
        assert_eq!(
            parse_special_command("/clear").unwrap(),
            SpecialCommand::ClearSession
        );
        assert_eq!(
            parse_special_command("/delete").unwrap(),
            SpecialCommand::DeleteSession(None)
        );
        assert_eq!(
            parse_special_command("/delete 17").unwrap(),
            SpecialCommand::DeleteSession(Some("17".to_string()))
        );
        assert_eq!(
            parse_special_command("  /switch   42 ").unwrap(),
            SpecialCommand::SwitchSession("42".to_string())
        );
    }

    #[test]
    fn test_switch_requires_id() {
        assert!(matches!(
            parse_special_command("/switch"),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_search_variants() {
        assert_eq!(
            parse_special_command("/search").unwrap(),
            SpecialCommand::Search(None)
        );
        assert_eq!(
            parse_special_command("/search OFF").unwrap(),
            SpecialCommand::Search(Some(false))
        );
        assert_eq!(
            parse_special_command("/search maybe"),
            Err(CommandError::UnsupportedArgument {
                command: "/search".to_string(),
                arg: "maybe".to_string()
            })
        );
    }

    #[test]
    fn test_rating_commands() {
        assert_eq!(
            parse_special_command("/up").unwrap(),
            SpecialCommand::Rate {
                rating: Rating::Up,
                message_id: None
            }
        );
        assert_eq!(
            parse_special_command("/down msg_1_abcdefghi").unwrap(),
            SpecialCommand::Rate {
                rating: Rating::Down,
                message_id: Some("msg_1_abcdefghi".to_string())
            }
        );
    }

    #[test]
    fn test_prefix_is_not_confused() {
        assert!(matches!(
            parse_special_command("/upload"),
            Err(CommandError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_exit_variants() {
        for input in ["exit", "QUIT", "/exit", "/quit"] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Exit);
        }
    }

    #[test]
    fn test_help_and_status() {
        assert_eq!(parse_special_command("/?").unwrap(), SpecialCommand::Help);
        assert_eq!(
            parse_special_command("/status").unwrap(),
            SpecialCommand::ShowStatus
        );
    }

    #[test]
    fn test_unknown_command_error_mentions_help() {
        let err = parse_special_command("/frobnicate now").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/frobnicate".to_string()));
        assert!(err.to_string().contains("/help"));
    }
}
