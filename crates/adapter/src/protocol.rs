//! Protocol module - line-delimited JSON messages
//!
//! Every message is one JSON object per line, tagged by `type`. Field names are
//! camelCase.

use serde::{Deserialize, Serialize};
use tetris_arena_core::types::GameAction;
use tetris_arena_core::{GameStateSnapshot, PlayerId};
use tetris_arena_room::{RoomId, RoomInfo};

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Identity already validated by the authentication collaborator
    #[serde(rename_all = "camelCase")]
    Auth { user_id: String, username: String },
    ListRooms,
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    LeaveRoom,
    PlayerReady { ready: bool },
    GameAction { action: GameAction },
    SyncRoomState,
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: String },
    RoomList { rooms: Vec<RoomInfo> },
    RoomCreated { room: RoomInfo },
    JoinResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    RoomUpdated { room: RoomInfo },
    GameState { state: GameStateSnapshot },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        username: String,
        is_player: bool,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, username: String },
    ForceStart { message: String },
    #[serde(rename_all = "camelCase")]
    Started { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    GameOver { winner: PlayerId, player_name: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

pub fn parse_message(line: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(line)
}

/// Serialise a message as a single line without the trailing newline
pub fn encode_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            parse_message(r#"{"type":"auth","userId":"u1","username":"alice"}"#).unwrap(),
            ClientMessage::Auth {
                user_id: "u1".into(),
                username: "alice".into()
            }
        );
        assert_eq!(
            parse_message(r#"{"type":"createRoom"}"#).unwrap(),
            ClientMessage::CreateRoom { name: None }
        );
        assert_eq!(
            parse_message(r#"{"type":"gameAction","action":{"kind":"rotate"}}"#).unwrap(),
            ClientMessage::GameAction {
                action: GameAction::Rotate { clockwise: true }
            }
        );
        assert_eq!(
            parse_message(r#"{"type":"playerReady","ready":true}"#).unwrap(),
            ClientMessage::PlayerReady { ready: true }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert!(parse_message(r#"{"type":"chatMessage","message":"hi"}"#).is_err());
        assert!(parse_message(r#"{"type":"gameAction","action":{"kind":"hold"}}"#).is_err());
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn test_encode_server_messages() {
        let line = encode_message(&ServerMessage::JoinResult {
            success: true,
            reason: None,
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"joinResult","success":true}"#);

        let line = encode_message(&ServerMessage::GameOver {
            winner: "u1".into(),
            player_name: "alice".into(),
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"gameOver","winner":"u1","playerName":"alice"}"#);

        let value: serde_json::Value =
            serde_json::from_str(&encode_message(&ServerMessage::error("nope")).unwrap()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "nope");
    }
}
