//! Rich-payload normalization.
//!
//! This module converts structured message payloads (images, cards,
//! carousels, choice lists) into a single displayable markdown/HTML string.
//! The function is pure and deterministic: the same payload always produces
//! byte-identical output, which makes the result safe to cache on the
//! message that carried it.

use crate::types::{CardPayload, MessagePayload};

/// Inline style for images embedded in cards and carousel items.
const IMG_STYLE: &str = "width: 100%; height: auto; border-radius: 8px 8px 0 0;";

/// Inline style for the card container block.
const CARD_CONTAINER_STYLE: &str = "border: 1px solid rgba(128, 128, 128, 0.2); \
border-radius: 8px; \
padding: 0px; \
max-width: 240px; \
margin: 5px 0; \
overflow: hidden;";

/// Inline style for the text region of a card.
const TEXT_PADDING_STYLE: &str = "padding: 8px 10px;";

/// Converts a rich payload into a displayable markdown/HTML string.
///
/// Unrecognized payloads fall back to their raw text field, or the empty
/// string when there is none.
pub fn payload_to_markdown(payload: &MessagePayload) -> String {
    match payload {
        MessagePayload::Text(text) => text.text.clone(),
        MessagePayload::Image(image) => match non_empty(image.image.as_deref()) {
            Some(url) => {
                let title = non_empty(image.title.as_deref()).unwrap_or("Image");
                format!(
                    "<img src=\"{url}\" alt=\"{title}\" \
style=\"max-width: 250px; width: auto; border-radius: 8px;\">"
                )
            }
            None => String::new(),
        },
        MessagePayload::Card(card) => render_card(card),
        MessagePayload::Carousel(carousel) => {
            let mut html = String::from(
                "<div style=\"display: flex; gap: 10px; overflow-x: auto; \
padding-bottom: 5px;\">",
            );
            for item in &carousel.items {
                html.push_str(&render_carousel_item(item));
            }
            html.push_str("</div>");
            html
        }
        MessagePayload::Choice(choice) => {
            let mut md = format!("{}\n\n", choice.text.as_deref().unwrap_or(""));
            for option in &choice.choices {
                md.push_str(&format!("* {}\n", option.label()));
            }
            md
        }
        MessagePayload::Other(other) => other.text.clone().unwrap_or_default(),
    }
}

/// Renders one card as a bordered block: optional image, optional bold
/// title, optional muted subtitle. Absent or empty fields contribute
/// nothing.
fn render_card(card: &CardPayload) -> String {
    let mut html = format!("<div style=\"{CARD_CONTAINER_STYLE}\">");
    if let Some(image) = non_empty(card.image.as_deref()) {
        html.push_str(&format!("<img src=\"{image}\" style=\"{IMG_STYLE}\">"));
    }
    html.push_str(&format!("<div style=\"{TEXT_PADDING_STYLE}\">"));
    if let Some(title) = non_empty(card.title.as_deref()) {
        html.push_str(&format!(
            "<div style=\"font-weight: 600; margin-bottom: 2px;\">{title}</div>"
        ));
    }
    if let Some(subtitle) = non_empty(card.subtitle.as_deref()) {
        html.push_str(&format!(
            "<div style=\"font-size: 0.85em; opacity: 0.8;\">{subtitle}</div>"
        ));
    }
    html.push_str("</div></div>");
    html
}

/// Renders one carousel entry. Entries are narrower than standalone cards
/// and show only an image and a title.
fn render_carousel_item(item: &CardPayload) -> String {
    let mut html = format!("<div style=\"{CARD_CONTAINER_STYLE} min-width: 200px;\">");
    if let Some(image) = non_empty(item.image.as_deref()) {
        html.push_str(&format!("<img src=\"{image}\" style=\"{IMG_STYLE}\">"));
    }
    html.push_str(&format!("<div style=\"{TEXT_PADDING_STYLE}\">"));
    if let Some(title) = non_empty(item.title.as_deref()) {
        html.push_str(&format!("<div style=\"font-weight: 600;\">{title}</div>"));
    }
    html.push_str("</div></div>");
    html
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
