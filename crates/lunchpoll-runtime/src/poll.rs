//! Renders the menu as a message of vote buttons.
//!
//! The payload follows Discord's message component layout: action rows
//! (type 1) of up to five buttons (type 2), at most five rows.

use lunchpoll_core::{GateState, MenuCatalog};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prefix of a vote button's custom ID; the item ID follows it.
pub const VOTE_PREFIX: &str = "vote:";

/// Custom ID of the cancel button.
pub const CANCEL_ID: &str = "cancel";

pub const POLL_CONTENT: &str = "Today's Menu:";

const CANCEL_LABEL: &str = "Cancel my order";
const BUTTONS_PER_ROW: usize = 5;
const MAX_BUTTONS: usize = 25;
const MAX_LABEL_CHARS: usize = 80;

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

impl From<ButtonStyle> for u8 {
    fn from(style: ButtonStyle) -> Self {
        match style {
            ButtonStyle::Primary => 1,
            ButtonStyle::Danger => 4,
        }
    }
}

impl TryFrom<u8> for ButtonStyle {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Primary),
            4 => Ok(Self::Danger),
            other => Err(format!("unsupported button style {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

/// The poll message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollMessage {
    pub content: String,
    pub components: Vec<ActionRow>,
}

impl PollMessage {
    /// One button per catalog item plus a cancel button, all disabled while
    /// the gate is closed.
    ///
    /// Items beyond what fits beside the cancel button are left out.
    pub fn render(catalog: &MenuCatalog, gate: GateState) -> Self {
        let disabled = !gate.is_enabled();
        let capacity = MAX_BUTTONS - 1;
        if catalog.len() > capacity {
            warn!(
                items = catalog.len(),
                shown = capacity,
                "Menu has more items than the poll can show"
            );
        }

        let buttons: Vec<Button> = catalog
            .items()
            .iter()
            .take(capacity)
            .map(|item| Button {
                kind: BUTTON,
                style: ButtonStyle::Primary,
                label: truncate_label(&item.label),
                custom_id: format!("{VOTE_PREFIX}{}", item.id),
                disabled,
            })
            .chain(std::iter::once(Button {
                kind: BUTTON,
                style: ButtonStyle::Danger,
                label: CANCEL_LABEL.to_string(),
                custom_id: CANCEL_ID.to_string(),
                disabled,
            }))
            .collect();

        Self {
            content: POLL_CONTENT.to_string(),
            components: buttons
                .chunks(BUTTONS_PER_ROW)
                .map(|chunk| ActionRow {
                    kind: ACTION_ROW,
                    components: chunk.to_vec(),
                })
                .collect(),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.components.iter().flat_map(|row| &row.components)
    }
}

/// What a pressed button asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction<'a> {
    Vote(&'a str),
    Cancel,
    Unknown,
}

impl<'a> ButtonAction<'a> {
    pub fn parse(custom_id: &'a str) -> Self {
        if custom_id == CANCEL_ID {
            return Self::Cancel;
        }
        match custom_id.strip_prefix(VOTE_PREFIX) {
            Some(item_id) if !item_id.is_empty() => Self::Vote(item_id),
            _ => Self::Unknown,
        }
    }
}

fn truncate_label(label: &str) -> String {
    match label.char_indices().nth(MAX_LABEL_CHARS) {
        Some((end, _)) => label[..end].to_string(),
        None => label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use lunchpoll_core::MenuItem;
    use serde_json::json;

    use super::*;

    fn catalog(count: usize) -> MenuCatalog {
        MenuCatalog::new((0..count).map(|i| MenuItem {
            id: format!("item{i}"),
            label: format!("Item {i}"),
        }))
    }

    #[test]
    fn test_render_lays_out_rows_of_five() {
        let poll = PollMessage::render(&catalog(6), GateState::Enabled);

        assert_eq!(poll.content, "Today's Menu:");
        let sizes: Vec<_> = poll.components.iter().map(|r| r.components.len()).collect();
        assert_eq!(sizes, [5, 2]);

        let last = poll.buttons().last().unwrap();
        assert_eq!(last.custom_id, CANCEL_ID);
        assert_eq!(last.style, ButtonStyle::Danger);
        assert!(poll.buttons().all(|b| !b.disabled));
    }

    #[test]
    fn test_render_disables_everything_when_gate_closed() {
        let poll = PollMessage::render(&catalog(3), GateState::Disabled);
        assert!(poll.buttons().all(|b| b.disabled));
    }

    #[test]
    fn test_render_caps_at_twenty_five_buttons() {
        let poll = PollMessage::render(&catalog(40), GateState::Enabled);

        assert_eq!(poll.buttons().count(), 25);
        assert_eq!(poll.components.len(), 5);
        assert_eq!(poll.buttons().last().unwrap().custom_id, CANCEL_ID);
    }

    #[test]
    fn test_empty_catalog_renders_only_cancel() {
        let poll = PollMessage::render(&MenuCatalog::default(), GateState::Enabled);
        assert_eq!(poll.buttons().count(), 1);
    }

    #[test]
    fn test_long_labels_are_truncated_on_char_boundaries() {
        let label = "é".repeat(100);
        assert_eq!(truncate_label(&label).chars().count(), 80);
        assert_eq!(truncate_label("Dal"), "Dal");
    }

    #[test]
    fn test_poll_serializes_as_discord_components() {
        let poll = PollMessage::render(
            &MenuCatalog::new([MenuItem {
                id: "dal".into(),
                label: "Dal Tadka".into(),
            }]),
            GateState::Enabled,
        );

        assert_eq!(
            serde_json::to_value(&poll).unwrap(),
            json!({
                "content": "Today's Menu:",
                "components": [{
                    "type": 1,
                    "components": [
                        {"type": 2, "style": 1, "label": "Dal Tadka", "custom_id": "vote:dal", "disabled": false},
                        {"type": 2, "style": 4, "label": "Cancel my order", "custom_id": "cancel", "disabled": false}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_parse_button_actions() {
        assert_eq!(ButtonAction::parse("vote:dal"), ButtonAction::Vote("dal"));
        assert_eq!(ButtonAction::parse("cancel"), ButtonAction::Cancel);
        assert_eq!(ButtonAction::parse("vote:"), ButtonAction::Unknown);
        assert_eq!(ButtonAction::parse("Veg Thali"), ButtonAction::Unknown);
    }
}
