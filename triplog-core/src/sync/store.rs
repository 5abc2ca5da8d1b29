//! The remote room store abstraction shared by the in-process and
//! WebSocket implementations.

use std::future::Future;

use futures::stream::{BoxStream, Stream, StreamExt};

use super::error::RemoteError;
use super::room::{Room, RoomPatch};

/// Something a subscription can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// The room was written (or exists at subscribe time).
    Changed(Room),
    /// The subscription failed; no further events follow.
    Error(RemoteError),
}

/// A remote, subscribable room store.
pub trait RoomStore: Send + Sync {
    /// Reads the room, `None` if it does not exist.
    fn read_room(
        &self,
        room_id: &str,
    ) -> impl Future<Output = Result<Option<Room>, RemoteError>> + Send;

    /// Merges `patch` into the room (creating it if needed) and returns the
    /// committed record.
    fn write_room(
        &self,
        room_id: &str,
        patch: RoomPatch,
    ) -> impl Future<Output = Result<Room, RemoteError>> + Send;

    /// Opens a push subscription. The current room, if any, is delivered first.
    fn subscribe_room(
        &self,
        room_id: &str,
    ) -> impl Future<Output = Result<Subscription, RemoteError>> + Send;
}

/// A cancellable stream of room events.
pub struct Subscription {
    stream: Option<BoxStream<'static, RoomEvent>>,
}

impl Subscription {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = RoomEvent> + Send + 'static,
    {
        Self {
            stream: Some(stream.boxed()),
        }
    }

    /// Waits for the next event. Returns `None` once cancelled or closed.
    pub async fn next(&mut self) -> Option<RoomEvent> {
        let stream = self.stream.as_mut()?;
        let event = stream.next().await;
        if event.is_none() {
            self.stream = None;
        }
        event
    }

    /// Stops delivery immediately and releases the underlying stream.
    pub fn cancel(&mut self) {
        self.stream = None;
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;
    use chrono::Utc;

    fn room() -> Room {
        Room::apply(None, RoomPatch::join("user-a", AppData::default()), Utc::now())
    }

    #[tokio::test]
    async fn test_subscription_yields_then_closes() {
        let mut sub = Subscription::new(futures::stream::iter(vec![RoomEvent::Changed(room())]));
        assert!(matches!(sub.next().await, Some(RoomEvent::Changed(_))));
        assert!(sub.next().await.is_none());
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn test_cancelled_subscription_delivers_nothing() {
        let events = vec![RoomEvent::Changed(room()), RoomEvent::Changed(room())];
        let mut sub = Subscription::new(futures::stream::iter(events));
        sub.cancel();
        assert!(!sub.is_active());
        assert!(sub.next().await.is_none());
    }
}
