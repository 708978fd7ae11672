use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::render::payload_to_markdown;
use crate::types::MessagePayload;

/// One message in a conversation.
///
/// The service returns message lists newest-first; callers reverse for
/// chronological display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique message identifier.
    pub id: String,

    /// The conversation this message belongs to.
    #[serde(
        rename = "conversationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_id: Option<String>,

    /// Identifier of the sending user. Assistant replies carry the bot's
    /// user id, which differs from the local user's.
    #[serde(rename = "userId", default)]
    pub user_id: String,

    /// The message payload.
    pub payload: MessagePayload,

    /// Creation time, when the service reports one.
    #[serde(
        rename = "createdAt",
        default,
        with = "crate::utils::time",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,

    /// Cached normalization of a rich payload, filled in by the client when
    /// the payload lacks a direct text field. Not part of the wire format.
    #[serde(skip)]
    pub display_text: Option<String>,
}

impl Message {
    /// Returns true if this message was sent by the given user.
    pub fn is_from(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Returns the display text for this message: the cached normalization
    /// if one was derived, otherwise the payload's direct text.
    pub fn text(&self) -> &str {
        if let Some(text) = &self.display_text {
            return text;
        }
        self.payload.raw_text().unwrap_or("")
    }

    /// Derives and caches the display text when the payload lacks a direct
    /// non-empty text field. Normalization runs once per fetched message,
    /// not per render.
    pub fn ensure_display_text(&mut self) {
        let missing = self.payload.raw_text().is_none_or(str::is_empty);
        if missing {
            self.display_text = Some(payload_to_markdown(&self.payload));
        }
    }
}
