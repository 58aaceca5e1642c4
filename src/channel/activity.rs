//! Bot Framework activity payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity type for user messages.
pub const MESSAGE_TYPE: &str = "message";

/// Activity type for the "bot is composing" presence signal.
pub const TYPING_TYPE: &str = "typing";

/// Content type of Adaptive Card attachments.
pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";

/// A participant in a conversation (user or bot).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    /// Channel-specific participant id.
    pub id: String,

    /// Display name, if the channel provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Directory object id of the user (Teams only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

/// Reference to the conversation an activity belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
}

/// An activity received on the messaging endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub from: Option<ChannelAccount>,

    #[serde(default)]
    pub recipient: Option<ChannelAccount>,

    #[serde(default)]
    pub conversation: Option<ConversationAccount>,

    /// Base URL replies must be posted to.
    #[serde(default)]
    pub service_url: Option<String>,

    #[serde(default)]
    pub channel_id: Option<String>,

    /// Payload of an Adaptive Card `Action.Submit`.
    #[serde(default)]
    pub value: Option<Value>,
}

impl Activity {
    /// Returns true if this is a user message.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_TYPE
    }

    /// Returns the `action` field of a card submit payload, if any.
    #[must_use]
    pub fn submit_action(&self) -> Option<&str> {
        self.value.as_ref()?.get("action")?.as_str()
    }
}

/// A card or file attached to an outgoing activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    pub content: Value,
}

impl Attachment {
    /// Wraps an Adaptive Card document.
    #[must_use]
    pub fn adaptive_card(card: Value) -> Self {
        Self {
            content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_owned(),
            content: card,
        }
    }
}

/// An activity sent by the bot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingActivity {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// The bot account (recipient of the inbound activity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,

    /// The user account (sender of the inbound activity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl OutgoingActivity {
    /// Creates a plain text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::of_kind(MESSAGE_TYPE)
        }
    }

    /// Creates a typing presence signal.
    #[must_use]
    pub fn typing() -> Self {
        Self::of_kind(TYPING_TYPE)
    }

    /// Creates a message carrying a single attachment.
    #[must_use]
    pub fn attachment(attachment: Attachment) -> Self {
        Self {
            attachments: vec![attachment],
            ..Self::of_kind(MESSAGE_TYPE)
        }
    }

    fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            text: None,
            attachments: Vec::new(),
            from: None,
            recipient: None,
            conversation: None,
            reply_to_id: None,
        }
    }

    /// Addresses this activity as a reply to `incoming`.
    #[must_use]
    pub fn in_reply_to(mut self, incoming: &Activity) -> Self {
        self.from.clone_from(&incoming.recipient);
        self.recipient.clone_from(&incoming.from);
        self.conversation.clone_from(&incoming.conversation);
        self.reply_to_id.clone_from(&incoming.id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_teams_message() {
        let json = r#"{
            "type": "message",
            "id": "1700000000000",
            "text": "chart pie",
            "from": {"id": "29:abc", "name": "Ana", "aadObjectId": "00000000-1111"},
            "recipient": {"id": "28:bot", "name": "GuruTeam"},
            "conversation": {"id": "a:conv"},
            "serviceUrl": "https://smba.trafficmanager.net/amer/",
            "channelId": "msteams"
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert!(activity.is_message());
        assert_eq!(activity.text.as_deref(), Some("chart pie"));
        let from = activity.from.unwrap();
        assert_eq!(from.aad_object_id.as_deref(), Some("00000000-1111"));
        assert_eq!(activity.conversation.unwrap().id, "a:conv");
    }

    #[test]
    fn test_submit_action() {
        let json = r#"{"type": "message", "value": {"action": "show_charts_menu"}}"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.submit_action(), Some("show_charts_menu"));
        assert!(activity.text.is_none());
    }

    #[test]
    fn test_reply_swaps_accounts() {
        let incoming = Activity {
            kind: MESSAGE_TYPE.to_owned(),
            id: Some("42".to_owned()),
            from: Some(ChannelAccount {
                id: "user".to_owned(),
                ..ChannelAccount::default()
            }),
            recipient: Some(ChannelAccount {
                id: "bot".to_owned(),
                ..ChannelAccount::default()
            }),
            conversation: Some(ConversationAccount {
                id: "conv".to_owned(),
            }),
            ..Activity::default()
        };

        let reply = OutgoingActivity::text("hi").in_reply_to(&incoming);
        assert_eq!(reply.from.unwrap().id, "bot");
        assert_eq!(reply.recipient.unwrap().id, "user");
        assert_eq!(reply.reply_to_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_typing_serializes_without_text() {
        let value = serde_json::to_value(OutgoingActivity::typing()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "typing"}));
    }
}
