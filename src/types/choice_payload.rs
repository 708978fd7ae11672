use serde::{Deserialize, Serialize};

use crate::types::Choice;

/// A choice-list message payload: a prompt followed by selectable options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoicePayload {
    /// Prompt text shown above the options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// The selectable options, in display order.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChoicePayload {
    /// Creates a choice payload with the given prompt and options.
    pub fn new<S: Into<String>>(text: S, choices: Vec<Choice>) -> Self {
        Self {
            text: Some(text.into()),
            choices,
        }
    }
}
