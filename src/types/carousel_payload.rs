use serde::{Deserialize, Serialize};

use crate::types::CardPayload;

/// A carousel message payload: a strip of card-like items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CarouselPayload {
    /// The carousel entries, in display order.
    #[serde(default)]
    pub items: Vec<CardPayload>,
}

impl CarouselPayload {
    /// Creates a carousel from the given items.
    pub fn new(items: Vec<CardPayload>) -> Self {
        Self { items }
    }
}
