//! WebSocket client for the triplog room server.
//!
//! Reads and writes use one short-lived connection each: connect, send a
//! single request, wait for the reply, close. A subscription keeps its own
//! connection open and turns pushed `changed` frames into room events.

use std::time::Duration;

use futures::stream::{self, SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::RemoteError;
use super::protocol::ProtocolMessage;
use super::room::{Room, RoomPatch};
use super::store::{RoomEvent, RoomStore, Subscription};

/// Upper bound for connecting and for each request/reply exchange.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for the health probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSender = SplitSink<WsStream, Message>;
type WsReceiver = SplitStream<WsStream>;

/// Room store backed by a remote triplog server.
#[derive(Debug, Clone)]
pub struct WsRoomStore {
    server_url: String,
}

impl WsRoomStore {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn open(&self) -> Result<(WsSender, WsReceiver), RemoteError> {
        let ws_url = build_ws_url(&self.server_url);
        let (ws_stream, _) = timeout(REQUEST_TIMEOUT, connect_async(&ws_url))
            .await
            .map_err(|_| RemoteError::Timeout)?
            .map_err(|e| RemoteError::ConnectionError(e.to_string()))?;
        Ok(ws_stream.split())
    }

    /// Sends one request on a fresh connection and returns the reply.
    async fn request(&self, msg: ProtocolMessage) -> Result<ProtocolMessage, RemoteError> {
        let (mut sender, mut receiver) = self.open().await?;
        send_message(&mut sender, &msg).await?;

        let reply = timeout(REQUEST_TIMEOUT, next_message(&mut receiver))
            .await
            .map_err(|_| RemoteError::Timeout)?;

        // Close WebSocket gracefully
        let _ = sender.send(Message::Close(None)).await;

        match reply? {
            ProtocolMessage::Error { message } => Err(RemoteError::ServerError(message)),
            other => Ok(other),
        }
    }
}

impl RoomStore for WsRoomStore {
    async fn read_room(&self, room_id: &str) -> Result<Option<Room>, RemoteError> {
        let reply = self
            .request(ProtocolMessage::Read {
                room_id: room_id.to_string(),
            })
            .await?;

        match reply {
            ProtocolMessage::Room { room } => Ok(room),
            other => Err(unexpected(&other)),
        }
    }

    async fn write_room(&self, room_id: &str, patch: RoomPatch) -> Result<Room, RemoteError> {
        let reply = self
            .request(ProtocolMessage::Write {
                room_id: room_id.to_string(),
                patch,
            })
            .await?;

        match reply {
            ProtocolMessage::Room { room: Some(room) } => Ok(room),
            ProtocolMessage::Room { room: None } => Err(RemoteError::ProtocolError(
                "Server did not return the written room".to_string(),
            )),
            other => Err(unexpected(&other)),
        }
    }

    async fn subscribe_room(&self, room_id: &str) -> Result<Subscription, RemoteError> {
        let (mut sender, mut receiver) = self.open().await?;
        send_message(
            &mut sender,
            &ProtocolMessage::Subscribe {
                room_id: room_id.to_string(),
            },
        )
        .await?;

        let ack = timeout(REQUEST_TIMEOUT, next_message(&mut receiver))
            .await
            .map_err(|_| RemoteError::Timeout)??;
        match ack {
            ProtocolMessage::Subscribed { .. } => {}
            ProtocolMessage::Error { message } => return Err(RemoteError::ServerError(message)),
            other => return Err(unexpected(&other)),
        }

        // The sender half stays in the state so the connection lives as long
        // as the subscription.
        let events = stream::unfold(Some((sender, receiver)), |state| async move {
            let (sender, mut receiver) = state?;
            match next_message(&mut receiver).await {
                Ok(ProtocolMessage::Changed { room }) => {
                    Some((RoomEvent::Changed(room), Some((sender, receiver))))
                }
                Ok(ProtocolMessage::Error { message }) => {
                    Some((RoomEvent::Error(RemoteError::ServerError(message)), None))
                }
                Ok(other) => Some((RoomEvent::Error(unexpected(&other)), None)),
                Err(e) => Some((RoomEvent::Error(e), None)),
            }
        });

        Ok(Subscription::new(events))
    }
}

fn unexpected(msg: &ProtocolMessage) -> RemoteError {
    RemoteError::ProtocolError(format!("Unexpected message: {:?}", msg))
}

async fn send_message<S>(sender: &mut S, msg: &ProtocolMessage) -> Result<(), RemoteError>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let encoded = msg
        .encode()
        .map_err(|e| RemoteError::CborError(e.to_string()))?;

    sender
        .send(Message::Binary(encoded.into()))
        .await
        .map_err(|e| RemoteError::WebSocketError(e.to_string()))
}

/// Waits for the next protocol frame, skipping control frames.
async fn next_message<R>(receiver: &mut R) -> Result<ProtocolMessage, RemoteError>
where
    R: StreamExt<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => {
                return ProtocolMessage::decode(&data)
                    .map_err(|e| RemoteError::CborError(e.to_string()));
            }
            Ok(Message::Close(_)) => {
                return Err(RemoteError::ConnectionError(
                    "Server closed connection".to_string(),
                ));
            }
            Ok(_) => {
                // Ignore ping/pong and text frames
            }
            Err(e) => return Err(RemoteError::WebSocketError(e.to_string())),
        }
    }
    Err(RemoteError::ConnectionError(
        "Connection closed before reply".to_string(),
    ))
}

/// Builds the room WebSocket URL, converting http(s) to ws(s) if needed.
pub fn build_ws_url(server_url: &str) -> String {
    let base_url = if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
        format!("ws://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}/rooms", base_url.trim_end_matches('/'))
}

/// Builds an HTTP URL for a given path, converting ws(s) to http(s) if needed.
pub fn build_http_url(server_url: &str, path: &str) -> String {
    let base_url = if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Returns true if the server answers its health endpoint.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client
        .get(build_http_url(server_url, "/health"))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ws_url() {
        assert_eq!(build_ws_url("ws://localhost:8080"), "ws://localhost:8080/rooms");
        assert_eq!(build_ws_url("http://localhost:8080"), "ws://localhost:8080/rooms");
        assert_eq!(
            build_ws_url("https://trips.example.com/"),
            "wss://trips.example.com/rooms"
        );
        assert_eq!(build_ws_url("localhost:8080"), "ws://localhost:8080/rooms");
    }

    #[test]
    fn test_build_http_url() {
        assert_eq!(
            build_http_url("ws://localhost:8080", "/health"),
            "http://localhost:8080/health"
        );
        assert_eq!(
            build_http_url("wss://trips.example.com", "/health"),
            "https://trips.example.com/health"
        );
        assert_eq!(
            build_http_url("http://localhost:8080/", "/health"),
            "http://localhost:8080/health"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) on localhost is not expected to run a server
        let store = WsRoomStore::new("ws://127.0.0.1:9");
        let err = store.read_room("room1").await.unwrap_err();
        assert!(matches!(
            err,
            RemoteError::ConnectionError(_) | RemoteError::Timeout
        ));
        assert!(!check_server("http://127.0.0.1:9").await);
    }
}
