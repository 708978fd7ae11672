use serde::{Deserialize, Serialize};

use crate::types::Conversation;

/// Response envelope for `POST /conversations` and
/// `GET /conversations/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationResponse {
    /// The conversation.
    pub conversation: Conversation,
}
