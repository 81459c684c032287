use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::MessageRecord;

/// Events sent FROM client TO server over the realtime channel.
///
/// Signaling payloads (`offer`, `answer`, `candidate`) are opaque: the relay
/// forwards whatever session-description or candidate structure the client
/// produced without inspecting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Persist a chat message and forward it to the recipient's connections.
    #[serde(rename_all = "camelCase")]
    SendMessage { to_user_id: String, message: String },

    /// Request the conversation with `to_user_id` (both directions), oldest
    /// first. `limit` caps the reply to the most recent N records; absent
    /// means all.
    #[serde(rename_all = "camelCase")]
    GetHistory {
        to_user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },

    #[serde(rename_all = "camelCase")]
    CallOffer { to_user_id: String, offer: Value },

    #[serde(rename_all = "camelCase")]
    CallAnswer { to_user_id: String, answer: Value },

    #[serde(rename_all = "camelCase")]
    IceCandidate { to_user_id: String, candidate: Value },
}

impl ClientEvent {
    /// The user this event is addressed to.
    pub fn recipient(&self) -> &str {
        match self {
            Self::SendMessage { to_user_id, .. }
            | Self::GetHistory { to_user_id, .. }
            | Self::CallOffer { to_user_id, .. }
            | Self::CallAnswer { to_user_id, .. }
            | Self::IceCandidate { to_user_id, .. } => to_user_id,
        }
    }
}

/// Events sent FROM server TO client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chat message arrived for this user.
    ReceiveMessage { sender: String, content: String },

    /// Reply to `get_history`: ordered records, oldest first.
    History(Vec<MessageRecord>),

    #[serde(rename_all = "camelCase")]
    CallOffer { from_user_id: String, offer: Value },

    #[serde(rename_all = "camelCase")]
    CallAnswer { from_user_id: String, answer: Value },

    #[serde(rename_all = "camelCase")]
    IceCandidate { from_user_id: String, candidate: Value },

    /// The sender's last event was rejected. Scoped to the offending
    /// connection only; never broadcast.
    Error { code: ErrorCode, message: String },
}

/// Why an inbound event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unparseable JSON or a missing/mistyped field.
    BadEvent,
    /// `toUserId` was present but empty.
    EmptyRecipient,
    /// The history store did not acknowledge the operation.
    PersistenceUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_source_wire_names() {
        let ev: ClientEvent = serde_json::from_value(serde_json::json!({
            "type": "send_message",
            "data": { "toUserId": "u2", "message": "hello" }
        }))
        .unwrap();
        match ev {
            ClientEvent::SendMessage { to_user_id, message } => {
                assert_eq!(to_user_id, "u2");
                assert_eq!(message, "hello");
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn get_history_limit_is_optional() {
        let ev: ClientEvent = serde_json::from_value(serde_json::json!({
            "type": "get_history",
            "data": { "toUserId": "u2" }
        }))
        .unwrap();
        match ev {
            ClientEvent::GetHistory { limit, .. } => assert!(limit.is_none()),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn missing_recipient_fails_to_parse() {
        let res = serde_json::from_value::<ClientEvent>(serde_json::json!({
            "type": "send_message",
            "data": { "message": "hello" }
        }));
        assert!(res.is_err());
    }

    #[test]
    fn server_events_use_source_wire_names() {
        let ev = ServerEvent::CallOffer {
            from_user_id: "u1".into(),
            offer: serde_json::json!({ "sdp": "v=0" }),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "call_offer");
        assert_eq!(json["data"]["fromUserId"], "u1");
        assert_eq!(json["data"]["offer"]["sdp"], "v=0");
    }

    #[test]
    fn error_event_wire_shape() {
        let ev = ServerEvent::Error {
            code: ErrorCode::PersistenceUnavailable,
            message: "history store unavailable".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["code"], "persistence_unavailable");
    }
}
