use serde::{Deserialize, Serialize};

/// A card message payload: optional image, optional title, optional subtitle.
///
/// Cards are also the items of a carousel; the carousel renderer reuses this
/// type for its entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CardPayload {
    /// Title, rendered bold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// URL of the header image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Subtitle, rendered muted beneath the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl CardPayload {
    /// Creates an empty card.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the card title.
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the header image URL.
    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the subtitle.
    pub fn with_subtitle<S: Into<String>>(mut self, subtitle: S) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}
