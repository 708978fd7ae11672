//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the client,
//! tracks the active conversation, keeps a per-conversation view of the
//! transcript, and drives the send-then-poll protocol for assistant
//! replies. The session is the synchronous caller the client was designed
//! for: one operation at a time, one poller per conversation.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::chat::config::ChatConfig;
use crate::client::Botpress;
use crate::error::{Error, Result};
use crate::poll::{PollOutcome, ReplyPoller};
use crate::retry::{Sleeper, TokioSleeper};
use crate::types::{Conversation, Message, User};

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    /// The local user.
    User,
    /// The assistant (or any other sender).
    Assistant,
}

/// One displayable turn in a conversation transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    /// Who produced the turn.
    pub role: TurnRole,
    /// Display text for the turn.
    pub content: String,
}

/// The result of sending one message.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant replied with this display text.
    Replied(String),
    /// No reply arrived within the poll budget.
    TimedOut {
        /// How many polls were made.
        attempts: u32,
    },
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The authenticated user's id.
    pub user_id: String,
    /// The authenticated user's display name.
    pub user_name: String,
    /// How many conversations the session knows about.
    pub conversation_count: usize,
    /// The active conversation id, if any.
    pub active_conversation: Option<String>,
    /// Turns held locally for the active conversation.
    pub active_turns: usize,
    /// Messages sent this session.
    pub messages_sent: u64,
    /// Assistant replies received this session.
    pub replies_received: u64,
    /// Sends that timed out waiting for a reply.
    pub poll_timeouts: u64,
    /// Messages fetched when loading history.
    pub history_limit: u32,
}

/// A chat session that manages conversation state and service interaction.
pub struct ChatSession {
    client: Botpress,
    poller: ReplyPoller,
    sleeper: Arc<dyn Sleeper>,
    user: User,
    conversations: Vec<Conversation>,
    active: Option<String>,
    history: HashMap<String, Vec<ChatTurn>>,
    history_limit: u32,
    messages_sent: u64,
    replies_received: u64,
    poll_timeouts: u64,
}

impl ChatSession {
    /// Authenticates against the service and selects a conversation,
    /// creating one when the user has none.
    pub async fn connect(client: Botpress, config: &ChatConfig) -> Result<Self> {
        let user = client.get_user().await?;
        let mut conversations = client.list_conversations().await?;
        if conversations.is_empty() {
            conversations.push(client.create_conversation().await?);
        }
        let active = conversations.first().map(|conversation| conversation.id.clone());

        Ok(Self {
            client,
            poller: ReplyPoller::new()
                .with_interval(config.poll_interval)
                .with_max_attempts(config.poll_attempts),
            sleeper: Arc::new(TokioSleeper),
            user,
            conversations,
            active,
            history: HashMap::new(),
            history_limit: config.history_limit,
            messages_sent: 0,
            replies_received: 0,
            poll_timeouts: 0,
        })
    }

    /// Returns the authenticated user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns the known conversations.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Returns the active conversation id, if any.
    pub fn active_conversation(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn active_id(&self) -> Result<String> {
        self.active
            .clone()
            .ok_or_else(|| Error::bad_request("no active conversation"))
    }

    /// Creates a new conversation and makes it active.
    pub async fn new_conversation(&mut self) -> Result<String> {
        let conversation = self.client.create_conversation().await?;
        let id = conversation.id.clone();
        self.conversations.push(conversation);
        self.history.insert(id.clone(), Vec::new());
        self.active = Some(id.clone());
        Ok(id)
    }

    /// Re-lists conversations from the service, keeping the active one when
    /// it still exists. Returns how many conversations are known.
    pub async fn refresh_conversations(&mut self) -> Result<usize> {
        self.conversations = self.client.list_conversations().await?;
        let still_active = self
            .active
            .as_ref()
            .is_some_and(|id| self.conversations.iter().any(|c| &c.id == id));
        if !still_active {
            self.active = self.conversations.first().map(|c| c.id.clone());
        }
        Ok(self.conversations.len())
    }

    /// Switches the active conversation by 1-based index or id.
    pub fn switch(&mut self, selector: &str) -> Result<String> {
        let Some(id) = resolve_selector(&self.conversations, selector) else {
            return Err(Error::bad_request(format!(
                "no conversation matches '{selector}'"
            )));
        };
        self.active = Some(id.clone());
        Ok(id)
    }

    /// Returns the active conversation's transcript, loading it from the
    /// service on first access.
    pub async fn history(&mut self) -> Result<&[ChatTurn]> {
        let id = self.active_id()?;
        if !self.history.contains_key(&id) {
            let messages = self
                .client
                .list_messages(&id, self.history_limit, false)
                .await?;
            let turns = turns_from_messages(&messages, &self.user.id);
            self.history.insert(id.clone(), turns);
        }
        Ok(self.history.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    /// Reloads the active conversation's transcript, bypassing the cache.
    pub async fn reload_history(&mut self) -> Result<&[ChatTurn]> {
        let id = self.active_id()?;
        let messages = self
            .client
            .list_messages(&id, self.history_limit, true)
            .await?;
        let turns = turns_from_messages(&messages, &self.user.id);
        self.history.insert(id.clone(), turns);
        Ok(self.history.get(&id).map(Vec::as_slice).unwrap_or_default())
    }

    /// Sends a message in the active conversation and polls for the reply.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome> {
        let id = self.active_id()?;

        // The local transcript shows the user's turn immediately, whether or
        // not a reply ever arrives.
        self.history.entry(id.clone()).or_default().push(ChatTurn {
            role: TurnRole::User,
            content: text.to_string(),
        });
        self.messages_sent += 1;

        let outcome = self
            .poller
            .send_and_poll(&self.client, self.sleeper.as_ref(), &id, &self.user.id, text)
            .await?;

        match outcome {
            PollOutcome::Delivered(reply) => {
                let content = reply.text().to_string();
                self.history.entry(id).or_default().push(ChatTurn {
                    role: TurnRole::Assistant,
                    content: content.clone(),
                });
                self.replies_received += 1;
                Ok(SendOutcome::Replied(content))
            }
            PollOutcome::TimedOut { attempts } => {
                self.poll_timeouts += 1;
                Ok(SendOutcome::TimedOut { attempts })
            }
        }
    }

    /// Creates a new user, adopts its key, and starts over with that
    /// identity's conversations.
    pub async fn recreate_user(&mut self, name: &str, id: &str) -> Result<&User> {
        let created = self.client.create_and_set_user(name, id).await?;
        self.user = created.user;
        self.reset_for_new_identity().await?;
        Ok(&self.user)
    }

    /// Rotates the user key in place and re-authenticates.
    pub async fn rotate_key(&mut self, key: String) -> Result<&User> {
        self.client.set_user_key(key);
        self.user = self.client.get_user().await?;
        self.reset_for_new_identity().await?;
        Ok(&self.user)
    }

    async fn reset_for_new_identity(&mut self) -> Result<()> {
        self.history.clear();
        self.conversations = self.client.list_conversations().await?;
        if self.conversations.is_empty() {
            self.conversations.push(self.client.create_conversation().await?);
        }
        self.active = self.conversations.first().map(|c| c.id.clone());
        Ok(())
    }

    /// Attaches to the active conversation's event stream.
    pub async fn listen(&self) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        let id = self.active_id()?;
        self.client.listen_conversation(&id).await
    }

    /// Returns aggregated stats for this session.
    pub fn stats(&self) -> SessionStats {
        let active_turns = self
            .active
            .as_ref()
            .and_then(|id| self.history.get(id))
            .map_or(0, Vec::len);
        SessionStats {
            user_id: self.user.id.clone(),
            user_name: self.user.display_name().to_string(),
            conversation_count: self.conversations.len(),
            active_conversation: self.active.clone(),
            active_turns,
            messages_sent: self.messages_sent,
            replies_received: self.replies_received,
            poll_timeouts: self.poll_timeouts,
            history_limit: self.history_limit,
        }
    }

    /// Closes the underlying client.
    pub fn close(&self) {
        self.client.close();
    }
}

/// Maps a newest-first message list to a chronological transcript, labeling
/// turns by sender and skipping messages with no display text.
fn turns_from_messages(messages: &[Message], local_user_id: &str) -> Vec<ChatTurn> {
    messages
        .iter()
        .rev()
        .filter_map(|message| {
            let content = message.text();
            if content.is_empty() {
                return None;
            }
            let role = if message.is_from(local_user_id) {
                TurnRole::User
            } else {
                TurnRole::Assistant
            };
            Some(ChatTurn {
                role,
                content: content.to_string(),
            })
        })
        .collect()
}

/// Resolves a conversation selector: a 1-based index or a conversation id.
fn resolve_selector(conversations: &[Conversation], selector: &str) -> Option<String> {
    if let Ok(index) = selector.parse::<usize>() {
        if index >= 1 {
            if let Some(conversation) = conversations.get(index - 1) {
                return Some(conversation.id.clone());
            }
        }
        return None;
    }
    conversations
        .iter()
        .find(|conversation| conversation.id == selector)
        .map(|conversation| conversation.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, user_id: &str, text: &str) -> Message {
        serde_json::from_str(&format!(
            r#"{{"id":"{id}","userId":"{user_id}","payload":{{"type":"text","text":"{text}"}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn transcript_is_reversed_and_labeled() {
        // Newest first, as the service returns them.
        let messages = vec![
            message("msg-3", "bot-1", "reply"),
            message("msg-2", "user-1", "question"),
            message("msg-1", "bot-1", "welcome"),
        ];
        let turns = turns_from_messages(&messages, "user-1");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, TurnRole::Assistant);
        assert_eq!(turns[0].content, "welcome");
        assert_eq!(turns[1].role, TurnRole::User);
        assert_eq!(turns[2].content, "reply");
    }

    #[test]
    fn empty_messages_are_skipped() {
        let messages = vec![
            message("msg-2", "bot-1", ""),
            message("msg-1", "user-1", "question"),
        ];
        let turns = turns_from_messages(&messages, "user-1");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
    }

    #[test]
    fn selector_resolves_index_and_id() {
        let conversations = vec![Conversation::new("conv-a"), Conversation::new("conv-b")];
        assert_eq!(
            resolve_selector(&conversations, "1").as_deref(),
            Some("conv-a")
        );
        assert_eq!(
            resolve_selector(&conversations, "2").as_deref(),
            Some("conv-b")
        );
        assert_eq!(
            resolve_selector(&conversations, "conv-b").as_deref(),
            Some("conv-b")
        );
        assert!(resolve_selector(&conversations, "0").is_none());
        assert!(resolve_selector(&conversations, "3").is_none());
        assert!(resolve_selector(&conversations, "conv-z").is_none());
    }
}
