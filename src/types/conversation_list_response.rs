use serde::{Deserialize, Serialize};

use crate::types::Conversation;

/// Response envelope for `GET /conversations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationListResponse {
    /// All conversations visible to the current user.
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}
