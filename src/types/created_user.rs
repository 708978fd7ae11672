use serde::{Deserialize, Serialize};

use crate::types::User;

/// Response envelope for `POST /users`: the created user plus the issued
/// bearer key for subsequent requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedUser {
    /// The newly created user.
    pub user: User,

    /// The issued user key.
    pub key: String,
}
