use serde::{Deserialize, Serialize};

use crate::types::User;

/// Response envelope for `GET /users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    /// The authenticated user.
    pub user: User,
}
