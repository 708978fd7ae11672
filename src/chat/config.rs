//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, the resolved
//! [`ChatConfig`], and the YAML credential store holding the service
//! instance id and issued user keys. The store is read once at startup;
//! nothing here talks to the network.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_MESSAGE_LIMIT;
use crate::error::{Error, Result};
use crate::poll::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};

/// Command-line arguments for the palaver-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Service instance identifier.
    #[arrrg(optional, "Chat API identifier (default: CHAT_API_ID env)", "ID")]
    pub api_id: Option<String>,

    /// Bearer credential identifying the end-user.
    #[arrrg(optional, "User key for authentication (default: CHAT_USER_KEY env)", "KEY")]
    pub user_key: Option<String>,

    /// Path to a YAML credential store.
    #[arrrg(optional, "Read credentials from this YAML file", "PATH")]
    pub secrets: Option<String>,

    /// Messages fetched when loading history.
    #[arrrg(optional, "Messages fetched when loading history (default: 50)", "N")]
    pub limit: Option<u32>,

    /// Delay between reply polls, in milliseconds.
    #[arrrg(optional, "Delay between reply polls in milliseconds (default: 500)", "MS")]
    pub poll_interval_ms: Option<u32>,

    /// Reply polls before giving up.
    #[arrrg(optional, "Reply polls before giving up (default: 20)", "N")]
    pub poll_attempts: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log every client request to stderr.
    #[arrrg(flag, "Log client requests to stderr")]
    pub verbose: bool,
}

/// The persisted credential store: the service instance id and one or more
/// issued user keys.
///
/// ```yaml
/// chat_api_id: 8461ebd3-5d0e-4a6a-9b66-a1f5e6f2b101
/// users:
///   - key: uk-Zm9vYmFy
///     name: demo
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CredentialStore {
    /// The service instance identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_api_id: Option<String>,

    /// Issued user keys, most recent first.
    #[serde(default)]
    pub users: Vec<StoredUserKey>,
}

/// One issued user key in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUserKey {
    /// The bearer key.
    pub key: String,

    /// Optional label for the key's owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CredentialStore {
    /// Loads the store from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("failed to read credential store {}", path.display()),
                e,
            )
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Returns the first stored user key, if any.
    pub fn first_key(&self) -> Option<&str> {
        self.users.first().map(|user| user.key.as_str())
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments, the credential store, and defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Service instance identifier; falls back to the CHAT_API_ID
    /// environment variable when unset.
    pub api_id: Option<String>,

    /// User key; falls back to the CHAT_USER_KEY environment variable when
    /// unset.
    pub user_key: Option<String>,

    /// Messages fetched when loading history.
    pub history_limit: u32,

    /// Delay between reply polls.
    pub poll_interval: Duration,

    /// Reply polls before giving up.
    pub poll_attempts: u32,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log client requests to stderr.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            api_id: None,
            user_key: None,
            history_limit: DEFAULT_MESSAGE_LIMIT,
            poll_interval: POLL_INTERVAL,
            poll_attempts: MAX_POLL_ATTEMPTS,
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the service instance identifier.
    pub fn with_api_id(mut self, api_id: String) -> Self {
        self.api_id = Some(api_id);
        self
    }

    /// Sets the user key.
    pub fn with_user_key(mut self, user_key: String) -> Self {
        self.user_key = Some(user_key);
        self
    }

    /// Sets the history fetch limit.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolves configuration from parsed arguments: credential store
    /// first, then explicit flags override it.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new();
        if let Some(path) = &args.secrets {
            let store = CredentialStore::load(Path::new(path))?;
            config.api_id = store.chat_api_id.clone();
            config.user_key = store.first_key().map(String::from);
        }
        if args.api_id.is_some() {
            config.api_id = args.api_id;
        }
        if args.user_key.is_some() {
            config.user_key = args.user_key;
        }
        if let Some(limit) = args.limit {
            config.history_limit = limit;
        }
        if let Some(ms) = args.poll_interval_ms {
            config.poll_interval = Duration::from_millis(u64::from(ms));
        }
        if let Some(attempts) = args.poll_attempts {
            config.poll_attempts = attempts;
        }
        config.use_color = !args.no_color;
        config.verbose = args.verbose;
        Ok(config)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
