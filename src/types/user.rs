use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An end-user identity known to the chat service.
///
/// Identities are fetched lazily via `GET /users/me` and cached by the
/// client until the user key is rotated or a new user is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier.
    pub id: String,

    /// Display name, if one was set at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Creation time, when the service reports one.
    #[serde(
        rename = "createdAt",
        default,
        with = "crate::utils::time",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

impl User {
    /// Creates a new User with the given id and no name.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            name: None,
            created_at: None,
        }
    }

    /// Returns the display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialization_tolerates_missing_fields() {
        let json = r#"{"id":"user-1"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "user-1");
        assert!(user.name.is_none());
        assert!(user.created_at.is_none());
        assert_eq!(user.display_name(), "user-1");
    }

    #[test]
    fn deserialization_with_timestamp() {
        let json = r#"{"id":"user-1","name":"Demo","createdAt":"2025-02-19T00:00:00Z"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.display_name(), "Demo");
        assert!(user.created_at.is_some());
    }
}
