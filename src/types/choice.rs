use serde::{Deserialize, Serialize};

/// One option in a choice-list payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Display title for the option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Raw value submitted when the option is picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Choice {
    /// Returns the display label: the title, falling back to the raw value.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.value.as_deref())
            .unwrap_or("")
    }
}
