use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Response envelope for `GET /conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageListResponse {
    /// Messages, newest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}
