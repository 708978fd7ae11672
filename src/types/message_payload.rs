use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{CardPayload, CarouselPayload, ChoicePayload, ImagePayload, OtherPayload, TextPayload};

/// A message payload, tagged by `type` on the wire.
///
/// Deserialization dispatches on the tag by hand rather than through serde's
/// derived tagging so that an unrecognized type falls back to
/// [`OtherPayload`] instead of failing the surrounding message.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePayload {
    /// Plain text.
    Text(TextPayload),

    /// An image reference.
    Image(ImagePayload),

    /// A card: image, title, subtitle.
    Card(CardPayload),

    /// A horizontally scrollable strip of cards.
    Carousel(CarouselPayload),

    /// A prompt with selectable options.
    #[serde(rename = "single-choice")]
    Choice(ChoicePayload),

    /// Any payload type this SDK does not model.
    #[serde(rename = "unknown")]
    Other(OtherPayload),
}

impl MessagePayload {
    /// Creates a plain-text payload.
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessagePayload::Text(TextPayload::new(text))
    }

    /// Returns the payload's direct text field, if the variant carries one.
    ///
    /// Image, card, and carousel payloads have no direct text; their display
    /// text comes from rich-payload normalization instead.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            MessagePayload::Text(payload) => Some(&payload.text),
            MessagePayload::Choice(payload) => payload.text.as_deref(),
            MessagePayload::Other(payload) => payload.text.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this payload is plain text.
    pub fn is_text(&self) -> bool {
        matches!(self, MessagePayload::Text(_))
    }
}

impl<'de> Deserialize<'de> for MessagePayload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let payload = match tag.as_str() {
            "text" => TextPayload::deserialize(&value).map(MessagePayload::Text),
            "image" => ImagePayload::deserialize(&value).map(MessagePayload::Image),
            "card" => CardPayload::deserialize(&value).map(MessagePayload::Card),
            "carousel" => CarouselPayload::deserialize(&value).map(MessagePayload::Carousel),
            "single-choice" | "choice" => {
                ChoicePayload::deserialize(&value).map(MessagePayload::Choice)
            }
            _ => OtherPayload::deserialize(&value).map(MessagePayload::Other),
        };
        payload.map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let payload = MessagePayload::text("hello");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hello"}"#);
        let back: MessagePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn choice_accepts_both_tags() {
        let single: MessagePayload =
            serde_json::from_str(r#"{"type":"single-choice","text":"Pick one","choices":[]}"#)
                .unwrap();
        let plain: MessagePayload =
            serde_json::from_str(r#"{"type":"choice","text":"Pick one","choices":[]}"#).unwrap();
        assert_eq!(single, plain);
        assert_eq!(single.raw_text(), Some("Pick one"));
    }

    #[test]
    fn unknown_tag_falls_back() {
        let payload: MessagePayload =
            serde_json::from_str(r#"{"type":"location","text":"here","lat":1.5}"#).unwrap();
        assert_eq!(payload, MessagePayload::Other(OtherPayload {
            text: Some("here".to_string()),
        }));
        assert_eq!(payload.raw_text(), Some("here"));
    }

    #[test]
    fn missing_tag_falls_back() {
        let payload: MessagePayload = serde_json::from_str(r#"{"text":"bare"}"#).unwrap();
        assert!(matches!(payload, MessagePayload::Other(_)));
    }

    #[test]
    fn image_has_no_raw_text() {
        let payload: MessagePayload =
            serde_json::from_str(r#"{"type":"image","image":"https://example.com/a.png"}"#)
                .unwrap();
        assert_eq!(payload.raw_text(), None);
    }
}
