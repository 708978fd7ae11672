//! Chat application module for interactive conversations over the Botpress
//! Chat API.
//!
//! This module provides the session layer behind the `palaver-chat` REPL.
//! It supports:
//!
//! - Conversation selection, creation, and cached history display
//! - Send-then-poll delivery of assistant replies
//! - Slash commands for session control
//! - A YAML credential store read once at startup
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing, configuration, and credentials
//! - [`session`]: Core chat session management and service interaction
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, CredentialStore, StoredUserKey};
pub use session::{ChatSession, ChatTurn, SendOutcome, SessionStats, TurnRole};
