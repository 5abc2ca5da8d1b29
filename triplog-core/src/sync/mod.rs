//! Room-based sync between two participants.
//!
//! ## Protocol
//!
//! Participants share a room record on a remote store:
//! 1. `connect` joins the room (creating it with the local snapshot if new)
//!    and subscribes to changes
//! 2. Every room change replaces local data, unless the other participant
//!    has a pending request, which is surfaced for accept/reject instead
//! 3. `direct_sync` overwrites the room snapshot, `request_sync` proposes
//!    one that the other side accepts or rejects
//!
//! Over the network, messages are CBOR-encoded WebSocket frames.

mod client;
mod coordinator;
mod error;
mod memory;
mod protocol;
mod room;
mod store;

pub use client::{build_http_url, build_ws_url, check_server, WsRoomStore, REQUEST_TIMEOUT};
pub use coordinator::{ConnectionState, SyncActivity, SyncCoordinator, SyncOutcome};
pub use error::{RemoteError, SyncError};
pub use memory::MemoryRoomStore;
pub use protocol::ProtocolMessage;
pub use room::{
    generate_room_id, is_valid_room_id, PendingRequestPatch, PendingSyncRequest, Room, RoomPatch,
};
pub use store::{RoomEvent, RoomStore, Subscription};
