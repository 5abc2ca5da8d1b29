//! Triplog Core Library
//!
//! Data model, default dataset merge, snapshot codec, local storage and
//! room sync shared by the triplog CLI and server.

pub mod codec;
pub mod merge;
pub mod models;
pub mod seed;
pub mod state;
pub mod storage;
pub mod sync;

pub use codec::{decode, decode_from_link, encode, encode_for_link, CodecError};
pub use merge::merge;
pub use models::{AppData, Attraction, AttractionUpdate, City, Coordinates, ModelError};
pub use seed::seed_data;
pub use state::{AppState, UpdateError};
pub use storage::{LocalStore, StorageError};
pub use sync::{
    check_server, ConnectionState, MemoryRoomStore, RemoteError, Room, RoomEvent, RoomPatch,
    RoomStore, SyncActivity, SyncCoordinator, SyncError, SyncOutcome, WsRoomStore,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
