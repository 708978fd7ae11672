use serde::{Deserialize, Serialize};

use crate::types::MessagePayload;

/// One event on a `/conversations/{id}/listen` stream.
///
/// The service wraps each event in a `data` envelope; events without a
/// payload (membership changes, typing indicators) carry `None` and are
/// skipped by the listen stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEvent {
    /// The event body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConversationEventData>,
}

/// The body of a conversation event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEventData {
    /// Identifier of the sending user, when the event is a message.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// The message payload, when the event is a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
}

impl ConversationEvent {
    /// Returns the event's payload, if it is a message event.
    pub fn payload(&self) -> Option<&MessagePayload> {
        self.data.as_ref().and_then(|data| data.payload.as_ref())
    }
}
