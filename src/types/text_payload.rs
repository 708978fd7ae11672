use serde::{Deserialize, Serialize};

/// A plain-text message payload.
///
/// This is the only payload type the client ever sends; everything else
/// arrives from the assistant side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPayload {
    /// The text content.
    pub text: String,
}

impl TextPayload {
    /// Creates a new TextPayload with the specified text.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let payload = TextPayload::new("hello");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"text":"hello"}"#);
        let back: TextPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
