use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A message thread between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: String,

    /// Creation time, when the service reports one.
    #[serde(
        rename = "createdAt",
        default,
        with = "crate::utils::time",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,

    /// Time of the most recent activity, when the service reports one.
    #[serde(
        rename = "updatedAt",
        default,
        with = "crate::utils::time",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl Conversation {
    /// Creates a new Conversation with the given id.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            updated_at: None,
        }
    }
}
