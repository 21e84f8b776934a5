//! Outbound wire events, one JSON object per WebSocket text frame,
//! tagged by the `event` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::MessageRow;

/// Serialized chat message as carried inside a `new_message` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePayload {
    pub id: i64,
    pub sender: i64,
    pub receiver: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl From<&MessageRow> for MessagePayload {
    fn from(row: &MessageRow) -> Self {
        Self {
            id: row.id,
            sender: row.sender,
            receiver: row.receiver,
            content: row.content.clone(),
            timestamp: row.timestamp,
            is_read: row.is_read,
        }
    }
}

/// Every event the server pushes to a client session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        message: MessagePayload,
    },
    TypingIndicator {
        user_id: i64,
        username: String,
        is_typing: bool,
    },
    FriendRequest {
        from_user: i64,
        request_id: i64,
    },
    FriendRequestAccepted {
        from_user: i64,
        to_user: i64,
        request_id: i64,
    },
    OnlineStatus {
        user_id: i64,
        username: String,
        is_online: bool,
    },
    NewMessageDot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_event_field() {
        let event = ServerEvent::TypingIndicator {
            user_id: 4,
            username: "alice".into(),
            is_typing: true,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "typing_indicator");
        assert_eq!(json["user_id"], 4);
        assert_eq!(json["is_typing"], true);
    }

    #[test]
    fn unread_dot_has_no_payload() {
        let json = serde_json::to_string(&ServerEvent::NewMessageDot).unwrap();
        assert_eq!(json, r#"{"event":"new_message_dot"}"#);
    }
}
