use serde::{Deserialize, Serialize};

/// An image message payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagePayload {
    /// URL of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Title, rendered as the image's alt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ImagePayload {
    /// Creates a new ImagePayload for the given URL.
    pub fn new<S: Into<String>>(image: S) -> Self {
        Self {
            image: Some(image.into()),
            title: None,
        }
    }

    /// Sets the title used as alt text.
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }
}
