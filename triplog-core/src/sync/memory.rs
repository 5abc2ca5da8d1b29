//! In-process room store with broadcast fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, RwLock};

use super::error::RemoteError;
use super::room::{is_valid_room_id, Room, RoomPatch};
use super::store::{RoomEvent, RoomStore, Subscription};

/// Channel capacity for room broadcasts.
const CHANNEL_CAPACITY: usize = 64;

struct RoomSlot {
    room: Option<Room>,
    tx: broadcast::Sender<Room>,
}

impl RoomSlot {
    fn new(room: Option<Room>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { room, tx }
    }
}

struct Inner {
    rooms: RwLock<HashMap<String, RoomSlot>>,
    available: AtomicBool,
}

/// Room store held entirely in memory.
///
/// Cloning shares the same rooms. Subscribers receive every committed write
/// in order; a slow subscriber that lags behind skips to the newest rooms.
#[derive(Clone)]
pub struct MemoryRoomStore {
    inner: Arc<Inner>,
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::with_rooms(HashMap::new())
    }

    /// Creates a store pre-populated with `rooms`.
    pub fn with_rooms(rooms: HashMap<String, Room>) -> Self {
        let rooms = rooms
            .into_iter()
            .map(|(id, room)| (id, RoomSlot::new(Some(room))))
            .collect();
        Self {
            inner: Arc::new(Inner {
                rooms: RwLock::new(rooms),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Switches the store on or offline. While offline every call fails
    /// with `RemoteError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of rooms that exist.
    pub async fn room_count(&self) -> usize {
        let rooms = self.inner.rooms.read().await;
        rooms.values().filter(|slot| slot.room.is_some()).count()
    }

    /// Like [`RoomStore::write_room`], but `persist` sees the new room first
    /// and nothing is committed or broadcast if it fails.
    pub async fn write_room_with<F>(
        &self,
        room_id: &str,
        patch: RoomPatch,
        persist: F,
    ) -> Result<Room, RemoteError>
    where
        F: FnOnce(&Room) -> Result<(), RemoteError>,
    {
        self.check(room_id)?;
        let mut rooms = self.inner.rooms.write().await;
        let slot = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomSlot::new(None));

        let room = Room::apply(slot.room.clone(), patch, Utc::now());
        persist(&room)?;
        slot.room = Some(room.clone());

        // No receivers is fine
        let _ = slot.tx.send(room.clone());
        Ok(room)
    }

    fn check(&self, room_id: &str) -> Result<(), RemoteError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable);
        }
        if !is_valid_room_id(room_id) {
            return Err(RemoteError::InvalidRoomId(room_id.to_string()));
        }
        Ok(())
    }
}

impl RoomStore for MemoryRoomStore {
    async fn read_room(&self, room_id: &str) -> Result<Option<Room>, RemoteError> {
        self.check(room_id)?;
        let rooms = self.inner.rooms.read().await;
        Ok(rooms.get(room_id).and_then(|slot| slot.room.clone()))
    }

    async fn write_room(&self, room_id: &str, patch: RoomPatch) -> Result<Room, RemoteError> {
        self.write_room_with(room_id, patch, |_| Ok(())).await
    }

    async fn subscribe_room(&self, room_id: &str) -> Result<Subscription, RemoteError> {
        self.check(room_id)?;
        let mut rooms = self.inner.rooms.write().await;
        let slot = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomSlot::new(None));

        // Subscribe under the lock so no write slips between the current
        // room and the first broadcast.
        let rx = slot.tx.subscribe();
        let current = slot.room.clone().map(RoomEvent::Changed);

        let updates = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(room) => return Some((RoomEvent::Changed(room), rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Subscription::new(stream::iter(current).chain(updates)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppData, City};

    fn data(name: &str) -> AppData {
        AppData::new(vec![City::with_id(name, name)])
    }

    #[tokio::test]
    async fn test_read_missing_room() {
        let store = MemoryRoomStore::new();
        assert!(store.read_room("nothing").await.unwrap().is_none());
        assert_eq!(store.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryRoomStore::new();
        let written = store
            .write_room("room1", RoomPatch::join("user-a", data("a")))
            .await
            .unwrap();
        let read = store.read_room("room1").await.unwrap().unwrap();

        assert_eq!(written, read);
        assert_eq!(read.snapshot, data("a"));
        assert_eq!(store.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_persist_commits_nothing() {
        let store = MemoryRoomStore::new();
        store
            .write_room("room1", RoomPatch::join("user-a", data("a")))
            .await
            .unwrap();

        let err = store
            .write_room_with("room1", RoomPatch::snapshot(data("b")), |room| {
                assert_eq!(room.snapshot, data("b"));
                Err(RemoteError::ServerError("disk full".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(err, RemoteError::ServerError("disk full".to_string()));
        let room = store.read_room("room1").await.unwrap().unwrap();
        assert_eq!(room.snapshot, data("a"));
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_updates() {
        let store = MemoryRoomStore::new();
        store
            .write_room("room1", RoomPatch::join("user-a", data("a")))
            .await
            .unwrap();

        let mut sub = store.subscribe_room("room1").await.unwrap();
        match sub.next().await {
            Some(RoomEvent::Changed(room)) => assert_eq!(room.snapshot, data("a")),
            other => panic!("Expected current room, got {:?}", other),
        }

        store
            .write_room("room1", RoomPatch::snapshot(data("b")))
            .await
            .unwrap();
        match sub.next().await {
            Some(RoomEvent::Changed(room)) => assert_eq!(room.snapshot, data("b")),
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribe_before_room_exists() {
        let store = MemoryRoomStore::new();
        let mut sub = store.subscribe_room("room1").await.unwrap();

        store
            .write_room("room1", RoomPatch::join("user-a", data("a")))
            .await
            .unwrap();
        match sub.next().await {
            Some(RoomEvent::Changed(room)) => assert_eq!(room.members, vec!["user-a"]),
            other => panic!("Expected created room, got {:?}", other),
        }
        // Subscribing alone does not create a room
        assert_eq!(store.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_rooms() {
        let store = MemoryRoomStore::new();
        let other = store.clone();
        store
            .write_room("room1", RoomPatch::join("user-a", data("a")))
            .await
            .unwrap();
        assert!(other.read_room("room1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryRoomStore::new();
        store.set_available(false);

        assert_eq!(
            store.read_room("room1").await.unwrap_err(),
            RemoteError::Unavailable
        );
        assert_eq!(
            store
                .write_room("room1", RoomPatch::snapshot(data("a")))
                .await
                .unwrap_err(),
            RemoteError::Unavailable
        );
        assert!(store.subscribe_room("room1").await.is_err());

        store.set_available(true);
        assert!(store.read_room("room1").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_room_id_rejected() {
        let store = MemoryRoomStore::new();
        let err = store.read_room("../secrets").await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRoomId(_)));
    }
}
