//! Wire messages exchanged with the room server.
//!
//! Every WebSocket frame carries one CBOR-encoded `ProtocolMessage`.
//! Field names use camelCase on the wire.

use serde::{Deserialize, Serialize};

use super::room::{Room, RoomPatch};

/// Message types for the room protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProtocolMessage {
    /// Client asks for the current room
    #[serde(rename = "read")]
    Read {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    /// Client merges a patch into the room
    #[serde(rename = "write")]
    Write {
        #[serde(rename = "roomId")]
        room_id: String,
        patch: RoomPatch,
    },
    /// Client opens a push subscription on this connection
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    /// Server reply to `read` and `write`
    #[serde(rename = "room")]
    Room { room: Option<Room> },
    /// Server acknowledges a subscription
    #[serde(rename = "subscribed")]
    Subscribed {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    /// Server pushes a room change to a subscriber
    #[serde(rename = "changed")]
    Changed { room: Room },
    /// Error message from server
    #[serde(rename = "error")]
    Error { message: String },
}

impl ProtocolMessage {
    /// Encode message as CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode message from CBOR bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppData, Attraction, City, Coordinates};
    use chrono::Utc;

    fn sample_data() -> AppData {
        let attraction = Attraction::with_id("bund", "外滩")
            .with_coordinates(Coordinates::new(31.2397, 121.4905).unwrap());
        AppData::new(vec![
            City::with_id("shanghai", "上海").with_attractions(vec![attraction])
        ])
    }

    #[test]
    fn test_write_message_encode_decode() {
        let msg = ProtocolMessage::Write {
            room_id: "k3j9x2m1q".to_string(),
            patch: RoomPatch::propose("user-a", sample_data()),
        };

        let encoded = msg.encode().unwrap();
        let decoded = ProtocolMessage::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_room_reply_encode_decode() {
        let room = Room::apply(None, RoomPatch::join("user-a", sample_data()), Utc::now());
        let msg = ProtocolMessage::Room { room: Some(room) };
        let decoded = ProtocolMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);

        let empty = ProtocolMessage::Room { room: None };
        let decoded = ProtocolMessage::decode(&empty.encode().unwrap()).unwrap();
        assert_eq!(decoded, empty);
    }

    #[test]
    fn test_error_message_encode_decode() {
        let msg = ProtocolMessage::Error {
            message: "Invalid room ID".to_string(),
        };
        match ProtocolMessage::decode(&msg.encode().unwrap()).unwrap() {
            ProtocolMessage::Error { message } => assert_eq!(message, "Invalid room ID"),
            other => panic!("Expected Error message, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(ProtocolMessage::decode(&[0xff, 0x00, 0x13]).is_err());
    }
}
