use serde::{Deserialize, Serialize};

/// Fallback for payload types this SDK does not model.
///
/// The service is free to introduce new payload kinds; an unrecognized tag
/// must not fail a whole message list, so unknown payloads deserialize here
/// and keep whatever raw text they carried.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OtherPayload {
    /// Raw text carried by the payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
