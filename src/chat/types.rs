//! Wire types for the chat boundary: room references, HTTP request/response
//! bodies, and the WebSocket frame shapes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::db::{MessageRecord, Room};

/// A validated reference to a room, parsed from the path of a request or a
/// WebSocket subscription. Only decimal room ids are accepted; free-text
/// identifiers are rejected rather than interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomRef(i64);

impl RoomRef {
    pub fn id(self) -> i64 {
        self.0
    }
}

/// Rejection for identifiers that are not room ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRoomRef;

impl FromStr for RoomRef {
    type Err = InvalidRoomRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i64>() {
            Ok(id) if id > 0 => Ok(RoomRef(id)),
            _ => Err(InvalidRoomRef),
        }
    }
}

/// Minimal sender info embedded in payloads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
}

/// A room as returned by the HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub id: i64,
    pub name: Option<String>,
    pub participants: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomPayload {
    pub fn new(room: Room, participants: Vec<UserSummary>) -> Self {
        Self {
            id: room.id,
            name: room.name,
            participants,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

/// A message as broadcast to sessions and returned from history.
///
/// Built from already-fetched plain data; constructing and serializing one
/// never touches the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    pub room: i64,
    pub sender: UserSummary,
    pub content: String,
    /// ISO-8601 / RFC 3339.
    pub timestamp: DateTime<Utc>,
}

impl From<MessageRecord> for MessagePayload {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            room: record.room_id,
            sender: UserSummary {
                id: record.sender_id,
                email: record.sender_email,
            },
            content: record.content,
            timestamp: record.created_at,
        }
    }
}

/// Inbound WebSocket frame: `{"message": <text>}`.
#[derive(Debug, Deserialize, Serialize)]
pub struct InboundFrame {
    pub message: String,
}

/// Per-session error frame: `{"error": <text>}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Body of `POST /api/chat/rooms`.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    /// The requester is always included, listed or not.
    #[serde(default)]
    pub participant_ids: Vec<i64>,
}

/// Body of `POST /api/chat/direct`.
#[derive(Debug, Deserialize, Serialize)]
pub struct DirectChatRequest {
    pub other_user_id: i64,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Response of the history endpoint: ascending page plus a continuation hint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessagePayload>,
    pub has_more: bool,
}

/// Response of `GET /api/chat/rooms`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn room_ref_accepts_decimal_ids() {
        assert_eq!("42".parse::<RoomRef>().unwrap().id(), 42);
    }

    #[test]
    fn room_ref_rejects_free_text_and_nonpositive_ids() {
        assert!("lobby".parse::<RoomRef>().is_err());
        assert!("".parse::<RoomRef>().is_err());
        assert!("1.5".parse::<RoomRef>().is_err());
        assert!("0".parse::<RoomRef>().is_err());
        assert!("-3".parse::<RoomRef>().is_err());
    }

    #[test]
    fn inbound_frame_shape() {
        let frame: InboundFrame = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(frame.message, "hi");

        assert!(serde_json::from_str::<InboundFrame>(r#"{"text":"hi"}"#).is_err());
    }

    #[test]
    fn message_payload_wire_shape() {
        let record = MessageRecord {
            id: 9,
            room_id: 3,
            sender_id: 1,
            sender_email: "a@example.com".to_string(),
            content: "hi".to_string(),
            created_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(MessagePayload::from(record)).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["room"], 3);
        assert_eq!(json["sender"]["id"], 1);
        assert_eq!(json["sender"]["email"], "a@example.com");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn error_frame_wire_shape() {
        let json = serde_json::to_string(&ErrorFrame {
            error: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }
}
