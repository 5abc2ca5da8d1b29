//! Sync error types.

use crate::storage::StorageError;

/// Failures reported by a remote room store.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Failed to connect to server
    ConnectionError(String),
    /// WebSocket error
    WebSocketError(String),
    /// Unexpected or malformed protocol message
    ProtocolError(String),
    /// CBOR encoding/decoding error
    CborError(String),
    /// Error reported by the server
    ServerError(String),
    /// Invalid room id
    InvalidRoomId(String),
    /// The store is unreachable
    Unavailable,
    /// No reply within the request timeout
    Timeout,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::ConnectionError(e) => write!(f, "Connection error: {}", e),
            RemoteError::WebSocketError(e) => write!(f, "WebSocket error: {}", e),
            RemoteError::ProtocolError(e) => write!(f, "Sync protocol error: {}", e),
            RemoteError::CborError(e) => write!(f, "CBOR error: {}", e),
            RemoteError::ServerError(e) => write!(f, "Server error: {}", e),
            RemoteError::InvalidRoomId(id) => write!(f, "Invalid room ID: {}", id),
            RemoteError::Unavailable => write!(f, "Sync server unavailable"),
            RemoteError::Timeout => write!(f, "Sync server did not respond in time"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Errors returned by the sync coordinator.
#[derive(Debug)]
pub enum SyncError {
    /// The remote room store failed
    Remote(RemoteError),
    /// Local persistence failed
    Storage(StorageError),
    /// Operation needs an active room connection
    NotConnected,
    /// Accept/reject called without an incoming request
    NoPendingRequest,
    /// A peer's request must be answered before sending a new one
    IncomingRequestPending,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Remote(e) => write!(f, "{}", e),
            SyncError::Storage(e) => write!(f, "{}", e),
            SyncError::NotConnected => write!(f, "Not connected to a sync room"),
            SyncError::NoPendingRequest => write!(f, "No sync request waiting for an answer"),
            SyncError::IncomingRequestPending => write!(
                f,
                "A sync request from your partner is waiting. Accept or reject it first."
            ),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Remote(e) => Some(e),
            SyncError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        SyncError::Remote(e)
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        SyncError::Storage(e)
    }
}
