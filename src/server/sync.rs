//! WebSocket room handler.
//!
//! Each connection may send any number of `read`/`write` requests and open
//! one subscription. Rooms live in a shared [`MemoryRoomStore`]; a write is
//! only committed and broadcast once [`ServerStorage`] has saved it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use triplog_core::sync::{ProtocolMessage, RoomEvent, RoomStore, Subscription};
use triplog_core::{MemoryRoomStore, RemoteError, Room, RoomPatch};

use super::storage::{ServerStorage, ServerStorageError};

/// Shared room state for all connections.
pub struct RoomHub {
    rooms: MemoryRoomStore,
    storage: ServerStorage,
}

impl RoomHub {
    /// Loads every stored room into memory.
    pub fn load(storage: ServerStorage) -> Result<Self, ServerStorageError> {
        let rooms = storage.load_all()?;
        tracing::info!("Loaded {} room(s)", rooms.len());

        Ok(Self {
            rooms: MemoryRoomStore::with_rooms(rooms),
            storage,
        })
    }

    pub async fn read(&self, room_id: &str) -> Result<Option<Room>, RemoteError> {
        self.rooms.read_room(room_id).await
    }

    /// Persists the patched room, then commits it.
    ///
    /// A failed save is reported to the client and leaves the room as it was.
    pub async fn write(&self, room_id: &str, patch: RoomPatch) -> Result<Room, RemoteError> {
        self.rooms
            .write_room_with(room_id, patch, |room| {
                self.storage.save(room_id, room).map_err(|e| {
                    tracing::error!("Failed to persist room {}: {}", room_id, e);
                    RemoteError::ServerError(format!("Failed to save room {}", room_id))
                })
            })
            .await
    }

    pub async fn subscribe(&self, room_id: &str) -> Result<Subscription, RemoteError> {
        self.rooms.subscribe_room(room_id).await
    }

    /// Handles one client request, returning the reply frame.
    ///
    /// A successful `subscribe` replaces the connection's subscription.
    pub async fn handle_request(
        &self,
        request: ProtocolMessage,
        subscription: &mut Option<Subscription>,
    ) -> ProtocolMessage {
        let result = match request {
            ProtocolMessage::Read { room_id } => self
                .read(&room_id)
                .await
                .map(|room| ProtocolMessage::Room { room }),
            ProtocolMessage::Write { room_id, patch } => {
                tracing::debug!("Write to room {}", room_id);
                self.write(&room_id, patch)
                    .await
                    .map(|room| ProtocolMessage::Room { room: Some(room) })
            }
            ProtocolMessage::Subscribe { room_id } => match self.subscribe(&room_id).await {
                Ok(sub) => {
                    tracing::debug!("Subscribed to room {}", room_id);
                    *subscription = Some(sub);
                    Ok(ProtocolMessage::Subscribed { room_id })
                }
                Err(e) => Err(e),
            },
            other => Err(RemoteError::ProtocolError(format!(
                "Unexpected message from client: {:?}",
                other
            ))),
        };

        result.unwrap_or_else(|e| ProtocolMessage::Error {
            message: e.to_string(),
        })
    }
}

/// Drives a single WebSocket connection until the client leaves.
pub async fn handle_socket(socket: WebSocket, hub: Arc<RoomHub>) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let reply = match incoming {
                    Some(Ok(Message::Binary(data))) => match ProtocolMessage::decode(&data) {
                        Ok(request) => hub.handle_request(request, &mut subscription).await,
                        Err(e) => ProtocolMessage::Error {
                            message: format!("Failed to decode message: {}", e),
                        },
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                };

                if send_message(&mut sender, &reply).await.is_err() {
                    break;
                }
            }
            event = next_event(&mut subscription) => {
                let frame = match event {
                    Some(RoomEvent::Changed(room)) => ProtocolMessage::Changed { room },
                    Some(RoomEvent::Error(e)) => {
                        subscription = None;
                        ProtocolMessage::Error { message: e.to_string() }
                    }
                    None => {
                        subscription = None;
                        continue;
                    }
                };

                if send_message(&mut sender, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Client disconnected");
}

/// Next subscription event; never resolves without a subscription.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<RoomEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

async fn send_message<S>(sender: &mut S, msg: &ProtocolMessage) -> Result<(), String>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let encoded = msg.encode().map_err(|e| e.to_string())?;
    sender
        .send(Message::Binary(encoded.into()))
        .await
        .map_err(|e| e.to_string())
}
