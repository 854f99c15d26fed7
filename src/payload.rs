//! Wire types for the Google Chat `cardsV2` message body.

use serde::Serialize;

pub const CARD_ID: &str = "info-card-id";
pub const SECTION_HEADER: &str = "Details";

/// Widgets that stay visible when the section is collapsed.
pub const UNCOLLAPSIBLE_WIDGETS: u32 = 3;

/// Built-in Google Chat icons used by the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownIcon {
    Bookmark,
    Ticket,
    Clock,
    Bus,
    ConfirmationNumberIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub text: String,
    #[serde(rename = "cardsV2")]
    pub cards_v2: Vec<CardV2>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardV2 {
    pub card_id: String,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub header: CardHeader,
    /// A single section object; Google Chat accepts it in place of a list.
    pub sections: Section,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardHeader {
    pub title: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub header: String,
    pub collapsible: bool,
    pub uncollapsible_widgets_count: u32,
    pub widgets: Vec<Widget>,
}

/// A decorated-text line: icon plus text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub decorated_text: DecoratedText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedText {
    pub start_icon: StartIcon,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartIcon {
    pub known_icon: KnownIcon,
}

impl Widget {
    pub fn new(text: impl Into<String>, icon: KnownIcon) -> Self {
        Self {
            decorated_text: DecoratedText {
                start_icon: StartIcon { known_icon: icon },
                text: text.into(),
            },
        }
    }

    pub fn text(&self) -> &str {
        &self.decorated_text.text
    }

    pub fn icon(&self) -> KnownIcon {
        self.decorated_text.start_icon.known_icon
    }
}

impl ChatPayload {
    /// Wrap `text` and a single details card.
    pub fn new(text: String, header: CardHeader, widgets: Vec<Widget>) -> Self {
        Self {
            text,
            cards_v2: vec![CardV2 {
                card_id: CARD_ID.to_string(),
                card: Card {
                    header,
                    sections: Section {
                        header: SECTION_HEADER.to_string(),
                        collapsible: true,
                        uncollapsible_widgets_count: UNCOLLAPSIBLE_WIDGETS,
                        widgets,
                    },
                },
            }],
        }
    }

    /// Widgets of the first card.
    pub fn widgets(&self) -> &[Widget] {
        self.cards_v2
            .first()
            .map(|c| c.card.sections.widgets.as_slice())
            .unwrap_or_default()
    }
}
