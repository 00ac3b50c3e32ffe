//! Bot Framework Direct Line v3 payloads.
//!
//! Only the fields the gateway reads are typed; everything else an activity
//! carries is kept in `extra` and passed back to clients unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sender id used for messages typed by the end user.
pub const USER_ID: &str = "user";

/// Response to `POST /conversations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectLineConversation {
    pub conversation_id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Sender or recipient of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One Direct Line activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// A plain text message from the end user.
    pub fn user_message(text: impl Into<String>) -> Self {
        Self {
            activity_type: "message".to_string(),
            id: None,
            from: Some(ChannelAccount {
                id: USER_ID.to_string(),
                name: None,
            }),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    /// Text of a bot-authored message, if this is one.
    pub fn bot_message_text(&self) -> Option<&str> {
        if self.activity_type != "message" {
            return None;
        }
        if self.from.as_ref().is_some_and(|from| from.id == USER_ID) {
            return None;
        }
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

/// Response to `GET /conversations/{id}/activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub watermark: Option<String>,
}

/// Response to `POST /conversations/{id}/activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: String,
}
