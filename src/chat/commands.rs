//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the assistant.

/// A parsed chat command.
///
/// These commands control the chat session and are never sent to the
/// service as messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Create a new conversation and make it active.
    NewConversation,

    /// List the known conversations.
    ListConversations,

    /// Switch the active conversation, by 1-based index or id.
    Switch(String),

    /// Reload the active conversation's history, bypassing the cache.
    Refresh,

    /// Show the authenticated user's identity.
    Whoami,

    /// Rotate the user key in place.
    SetKey(String),

    /// Create a new user and adopt its issued key.
    NewUser {
        /// Display name for the new user.
        name: String,
        /// Identifier for the new user.
        id: String,
    },

    /// Attach to the active conversation's event stream.
    Listen,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use palaver::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/switch 2").is_some());
/// assert!(parse_command("What games do you have?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::NewConversation,
        "conversations" | "convs" => ChatCommand::ListConversations,
        "switch" => match argument {
            Some(selector) => ChatCommand::Switch(selector.to_string()),
            None => ChatCommand::Invalid(
                "/switch requires a conversation index or id".to_string(),
            ),
        },
        "refresh" => ChatCommand::Refresh,
        "whoami" => ChatCommand::Whoami,
        "key" => match argument {
            Some(key) => ChatCommand::SetKey(key.to_string()),
            None => ChatCommand::Invalid("/key requires a user key".to_string()),
        },
        "user" => parse_user_command(argument),
        "listen" => ChatCommand::Listen,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_user_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/user requires '<name> <id>'".to_string());
    };

    let mut parts = arg.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let Some(id) = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return ChatCommand::Invalid("/user requires '<name> <id>'".to_string());
    };
    ChatCommand::NewUser {
        name: name.to_string(),
        id: id.to_string(),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    "Available commands:\n\
     /new                  Create a new conversation\n\
     /conversations        List conversations\n\
     /switch <n|id>        Switch the active conversation\n\
     /refresh              Reload history, bypassing the cache\n\
     /whoami               Show the authenticated user\n\
     /user <name> <id>     Create a user and adopt its key\n\
     /key <user-key>       Rotate the user key\n\
     /listen               Stream conversation events (ctrl-c to stop)\n\
     /stats                Show session statistics\n\
     /help                 Show this help\n\
     /quit                 Exit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_messages_are_not_commands() {
        assert!(parse_command("hello there").is_none());
        assert!(parse_command("  what about slashes/in/the/middle").is_none());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::NewConversation));
        assert_eq!(
            parse_command("/conversations"),
            Some(ChatCommand::ListConversations)
        );
        assert_eq!(parse_command("/refresh"), Some(ChatCommand::Refresh));
        assert_eq!(parse_command("/whoami"), Some(ChatCommand::Whoami));
        assert_eq!(parse_command("/listen"), Some(ChatCommand::Listen));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
    }

    #[test]
    fn switch_takes_selector() {
        assert_eq!(
            parse_command("/switch 2"),
            Some(ChatCommand::Switch("2".to_string()))
        );
        assert_eq!(
            parse_command("/switch conv-abc"),
            Some(ChatCommand::Switch("conv-abc".to_string()))
        );
        assert!(matches!(
            parse_command("/switch"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn key_takes_value() {
        assert_eq!(
            parse_command("/key uk-abc"),
            Some(ChatCommand::SetKey("uk-abc".to_string()))
        );
        assert!(matches!(parse_command("/key"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn user_takes_name_and_id() {
        assert_eq!(
            parse_command("/user demo user-42"),
            Some(ChatCommand::NewUser {
                name: "demo".to_string(),
                id: "user-42".to_string(),
            })
        );
        assert!(matches!(
            parse_command("/user demo"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/user"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_commands_are_invalid() {
        assert!(matches!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_command("/QUIT"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/New"), Some(ChatCommand::NewConversation));
    }
}
