use engine::Vec2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::app::world::{GridCell, PlayerId};

pub(crate) const ID: &str = "id";
pub(crate) const POSITION_INIT: &str = "position-init";
pub(crate) const PLAYERS: &str = "players";
pub(crate) const ADD_PLAYER: &str = "add-player";
pub(crate) const REMOTE_POSITION: &str = "remote-position";
pub(crate) const PLAYER_LEFT: &str = "player-left";
pub(crate) const CHAT: &str = "chat";
pub(crate) const AUTH: &str = "auth";
pub(crate) const ERROR: &str = "error";
pub(crate) const CALL_CONSENT_REQ: &str = "callConsentReq";
pub(crate) const CALL_CONSENT_ANS: &str = "callConsentAns";

#[derive(Debug, Error)]
pub(crate) enum ProtocolError {
    #[error("malformed envelope{}: {source}", display_path(.path))]
    Envelope {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid '{message_type}' payload{}: {source}", display_path(.path))]
    Payload {
        message_type: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode '{message_type}': {source}")]
    Encode {
        message_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn display_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "messageType")]
    message_type: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// One inbound frame. Frames without a `data` field carry their payload
/// inline, next to `messageType`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Envelope {
    pub(crate) message_type: String,
    pub(crate) data: Value,
}

pub(crate) fn decode_envelope(line: &str) -> Result<Envelope, ProtocolError> {
    let mut deserializer = serde_json::Deserializer::from_str(line);
    let raw: RawEnvelope =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            ProtocolError::Envelope {
                path: error.path().to_string(),
                source: error.into_inner(),
            }
        })?;
    Ok(Envelope {
        message_type: raw.message_type,
        data: raw.data.unwrap_or(Value::Object(raw.rest)),
    })
}

pub(crate) fn decode_payload<T: DeserializeOwned>(
    message_type: &str,
    data: Value,
) -> Result<T, ProtocolError> {
    serde_path_to_error::deserialize(data).map_err(|error| ProtocolError::Payload {
        message_type: message_type.to_string(),
        path: error.path().to_string(),
        source: error.into_inner(),
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct IdPayload {
    pub(crate) id: PlayerId,
}

/// Spawn assignment in cell units. Servers may send fractional cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PositionInitPayload {
    pub(crate) position: Vec2,
}

impl PositionInitPayload {
    /// The assigned cell, snapped to the nearest whole cell.
    pub(crate) fn cell(&self) -> GridCell {
        GridCell::new(
            self.position.x.round() as i32,
            self.position.y.round() as i32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PlayerInfo {
    pub(crate) id: PlayerId,
    pub(crate) position: Vec2,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PlayersPayload {
    pub(crate) players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct RemotePositionPayload {
    pub(crate) id: PlayerId,
    pub(crate) position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PlayerLeftPayload {
    pub(crate) id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChatBody {
    Text(String),
    Entry {
        #[serde(default)]
        id: Option<PlayerId>,
        #[serde(default)]
        name: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ChatPayload {
    pub(crate) message: ChatBody,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

impl ChatPayload {
    /// Sender name and text, whichever shape the message arrived in.
    pub(crate) fn into_parts(self) -> (Option<String>, String) {
        match self.message {
            ChatBody::Text(text) => (self.name, text),
            ChatBody::Entry { id, name, message } => {
                let sender = name
                    .or(self.name)
                    .or_else(|| id.map(|id| id.to_string()));
                (sender, message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct AuthResultPayload {
    pub(crate) authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ErrorPayload {
    pub(crate) error: String,
}

/// `id` is the requesting player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct CallRequestPayload {
    pub(crate) id: PlayerId,
}

/// `id` is the answering player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct CallAnswerPayload {
    pub(crate) id: PlayerId,
    pub(crate) answer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "data")]
pub(crate) enum OutboundMessage {
    #[serde(rename = "auth")]
    Auth { jwt: String },
    #[serde(rename = "room")]
    Room {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    #[serde(rename = "position-init")]
    PositionInit { position: Vec2 },
    #[serde(rename = "position")]
    Position {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<PlayerId>,
        position: Vec2,
    },
    #[serde(rename = "chat")]
    Chat { message: String },
    /// `id` is the player being asked.
    #[serde(rename = "callConsentReq")]
    CallConsentReq { id: PlayerId },
    /// `id` is the player who asked.
    #[serde(rename = "callConsentAns")]
    CallConsentAns { id: PlayerId, answer: bool },
}

impl OutboundMessage {
    pub(crate) fn message_type(&self) -> &'static str {
        match self {
            OutboundMessage::Auth { .. } => AUTH,
            OutboundMessage::Room { .. } => "room",
            OutboundMessage::PositionInit { .. } => POSITION_INIT,
            OutboundMessage::Position { .. } => "position",
            OutboundMessage::Chat { .. } => CHAT,
            OutboundMessage::CallConsentReq { .. } => CALL_CONSENT_REQ,
            OutboundMessage::CallConsentAns { .. } => CALL_CONSENT_ANS,
        }
    }

    pub(crate) fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            message_type: self.message_type(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn enveloped_payload_is_read_from_data() {
        let envelope =
            decode_envelope(r#"{"messageType":"remote-position","data":{"id":3,"position":{"x":32,"y":16}}}"#)
                .expect("envelope");
        assert_eq!(envelope.message_type, REMOTE_POSITION);

        let payload: RemotePositionPayload =
            decode_payload(&envelope.message_type, envelope.data).expect("payload");
        assert_eq!(payload.id, PlayerId(3));
        assert_eq!(payload.position, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn flat_frame_uses_remaining_fields_as_payload() {
        let envelope = decode_envelope(r#"{"messageType":"auth","authenticated":true}"#)
            .expect("envelope");

        assert_eq!(envelope.data, json!({"authenticated": true}));
        let payload: AuthResultPayload =
            decode_payload(AUTH, envelope.data).expect("payload");
        assert!(payload.authenticated);
    }

    #[test]
    fn spawn_cell_accepts_whole_and_fractional_cells() {
        let whole: PositionInitPayload =
            decode_payload(POSITION_INIT, json!({"position": {"x": 3, "y": 4}})).expect("whole");
        assert_eq!(whole.cell(), GridCell::new(3, 4));

        let fractional: PositionInitPayload =
            decode_payload(POSITION_INIT, json!({"position": {"x": 5.5, "y": 2.4}}))
                .expect("fractional");
        assert_eq!(fractional.cell(), GridCell::new(6, 2));
    }

    #[test]
    fn missing_message_type_is_an_envelope_error() {
        let error = decode_envelope(r#"{"data":{}}"#).expect_err("no type");
        assert!(matches!(error, ProtocolError::Envelope { .. }));
    }

    #[test]
    fn payload_error_names_the_failing_field() {
        let error = decode_payload::<PlayersPayload>(
            PLAYERS,
            json!({"players": [{"id": 1, "position": {"x": 1, "y": 2}}, {"id": "two", "position": {"x": 0, "y": 0}}]}),
        )
        .expect_err("bad id");

        match error {
            ProtocolError::Payload { path, .. } => assert_eq!(path, "players[1].id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn chat_accepts_text_or_entry_object() {
        let text: ChatPayload =
            decode_payload(CHAT, json!({"message": "hello", "name": "ana"})).expect("text");
        assert_eq!(
            text.into_parts(),
            (Some("ana".to_string()), "hello".to_string())
        );

        let entry: ChatPayload =
            decode_payload(CHAT, json!({"message": {"id": 9, "message": "hey"}})).expect("entry");
        assert_eq!(entry.into_parts(), (Some("9".to_string()), "hey".to_string()));
    }

    #[test]
    fn outbound_messages_use_the_envelope_shape() {
        let encoded = OutboundMessage::Room {
            room_id: "r-1".to_string(),
        }
        .encode()
        .expect("encode");
        assert_eq!(
            serde_json::from_str::<Value>(&encoded).expect("json"),
            json!({"messageType": "room", "data": {"roomId": "r-1"}})
        );

        let position = OutboundMessage::Position {
            id: Some(PlayerId(2)),
            position: Vec2::new(48.0, 16.0),
        };
        assert_eq!(
            serde_json::to_value(&position).expect("json"),
            json!({"messageType": "position", "data": {"id": 2, "position": {"x": 48.0, "y": 16.0}}})
        );
    }
}
