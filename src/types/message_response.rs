use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Response envelope for `POST /messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    /// The message as stored by the service.
    pub message: Message,
}
