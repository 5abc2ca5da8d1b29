//! Per-participant sync state machine.
//!
//! A participant is either disconnected, connecting, or connected to one
//! room. While connected it may hold a request from the other participant
//! (`RequestPending`) or have sent one of its own (`RequestSent`).
//!
//! The coordinator owns the room subscription but never the app data; every
//! operation that reads or replaces local data takes the [`AppState`]
//! explicitly. Remote failures never change local data or the state.
//!
//! Live sync only replaces local data when the room snapshot differs from the
//! one this participant last adopted or wrote. Writes that touch only the
//! request slot or the member list leave unsynced local edits alone.

use crate::state::AppState;
use crate::storage::LocalStore;

use super::error::{RemoteError, SyncError};
use super::room::{generate_room_id, is_valid_room_id, PendingSyncRequest, RoomPatch};
use super::store::{RoomEvent, RoomStore, Subscription};

/// Connection state of a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { room_id: String },
    Connected { room_id: String, activity: SyncActivity },
}

/// Request handshake sub-state while connected.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncActivity {
    Idle,
    /// The other participant proposed a snapshot and waits for an answer
    RequestPending(PendingSyncRequest),
    /// This participant proposed a snapshot
    RequestSent,
}

/// What handling a room event did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The room snapshot replaced local data
    Applied { changed: bool },
    /// The room snapshot is the one already adopted; local data was kept
    Unchanged,
    /// A proposal from the other participant needs accept or reject
    IncomingRequest(PendingSyncRequest),
    /// The event arrived while not connected
    Ignored,
}

pub struct SyncCoordinator<S: RoomStore> {
    store: S,
    participant_id: String,
    state: ConnectionState,
    subscription: Option<Subscription>,
    /// Fingerprint of the room snapshot last adopted or written
    synced: Option<String>,
}

impl<S: RoomStore> SyncCoordinator<S> {
    pub fn new(store: S, participant_id: impl Into<String>) -> Self {
        Self {
            store,
            participant_id: participant_id.into(),
            state: ConnectionState::Disconnected,
            subscription: None,
            synced: None,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The room this participant is connected to.
    pub fn room_id(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Connected { room_id, .. } => Some(room_id),
            _ => None,
        }
    }

    /// The incoming request waiting for an answer, if any.
    pub fn pending_request(&self) -> Option<&PendingSyncRequest> {
        match &self.state {
            ConnectionState::Connected {
                activity: SyncActivity::RequestPending(req),
                ..
            } => Some(req),
            _ => None,
        }
    }

    /// Creates a fresh room seeded with the local snapshot and connects to it.
    pub async fn create_room(&mut self, app: &AppState) -> Result<String, SyncError> {
        let room_id = generate_room_id();
        self.connect(app, &room_id).await?;
        Ok(room_id)
    }

    /// Joins `room_id`, creating it with the local snapshot if it does not
    /// exist. An existing room snapshot is left alone; the first event then
    /// adopts it.
    ///
    /// On failure the participant ends up disconnected, but a previously
    /// saved room id is kept, so [`resume`](Self::resume) retries that room.
    pub async fn connect(&mut self, app: &AppState, room_id: &str) -> Result<(), SyncError> {
        self.open_room(app, room_id, None).await
    }

    /// Reconnects to the persisted room, if there is one.
    ///
    /// The last synced snapshot is remembered across restarts, so local
    /// edits survive the reconnect unless the room snapshot changed since.
    pub async fn resume(&mut self, app: &AppState) -> Result<Option<String>, SyncError> {
        match app.store().load_room_id()? {
            Some(room_id) => {
                let synced = app.store().load_synced_fingerprint()?;
                self.open_room(app, &room_id, synced).await?;
                Ok(Some(room_id))
            }
            None => Ok(None),
        }
    }

    async fn open_room(
        &mut self,
        app: &AppState,
        room_id: &str,
        synced: Option<String>,
    ) -> Result<(), SyncError> {
        if !is_valid_room_id(room_id) {
            return Err(RemoteError::InvalidRoomId(room_id.to_string()).into());
        }

        self.cancel_subscription();
        self.state = ConnectionState::Connecting {
            room_id: room_id.to_string(),
        };

        match self.open(app, room_id, synced.is_none()).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.synced = synced;
                self.state = ConnectionState::Connected {
                    room_id: room_id.to_string(),
                    activity: SyncActivity::Idle,
                };
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        app: &AppState,
        room_id: &str,
        fresh: bool,
    ) -> Result<Subscription, SyncError> {
        let join = RoomPatch::join(self.participant_id.clone(), app.data().clone());
        self.store.write_room(room_id, join).await?;

        let mut subscription = self.store.subscribe_room(room_id).await?;
        let saved = app.store().save_room_id(room_id).and_then(|()| {
            if fresh {
                app.store().clear_synced_fingerprint()
            } else {
                Ok(())
            }
        });
        if let Err(e) = saved {
            subscription.cancel();
            return Err(e.into());
        }
        Ok(subscription)
    }

    /// Waits for the next room event. `None` when not subscribed.
    pub async fn next_event(&mut self) -> Option<RoomEvent> {
        self.subscription.as_mut()?.next().await
    }

    /// Applies a room event to the local state.
    ///
    /// A pending request from the other participant is surfaced without
    /// applying anything. A room snapshot that differs from the last synced
    /// one replaces local data, last writer wins.
    pub fn handle_event(
        &mut self,
        app: &mut AppState,
        event: RoomEvent,
    ) -> Result<SyncOutcome, SyncError> {
        let activity = match &mut self.state {
            ConnectionState::Connected { activity, .. } => activity,
            _ => return Ok(SyncOutcome::Ignored),
        };

        let room = match event {
            RoomEvent::Changed(room) => room,
            RoomEvent::Error(e) => return Err(e.into()),
        };

        if let Some(req) = room.incoming_request(&self.participant_id) {
            *activity = SyncActivity::RequestPending(req.clone());
            return Ok(SyncOutcome::IncomingRequest(req.clone()));
        }

        let next_activity = if room.pending_request.is_some() {
            SyncActivity::RequestSent
        } else {
            SyncActivity::Idle
        };

        let fingerprint = room.snapshot.fingerprint();
        if self.synced.as_deref() == Some(fingerprint.as_str()) {
            *activity = next_activity;
            return Ok(SyncOutcome::Unchanged);
        }

        let changed = app.replace(room.snapshot)?;
        app.store().save_synced_fingerprint(&fingerprint)?;
        *activity = next_activity;
        self.synced = Some(fingerprint);
        Ok(SyncOutcome::Applied { changed })
    }

    /// Reads the room and refreshes the request sub-state. Local data is
    /// never touched, whatever the room snapshot holds.
    pub async fn check_request(&mut self) -> Result<Option<PendingSyncRequest>, SyncError> {
        let room_id = self.connected_room()?;
        let room = self.store.read_room(&room_id).await?;

        let incoming = room
            .as_ref()
            .and_then(|r| r.incoming_request(&self.participant_id))
            .cloned();
        let own_pending = room.as_ref().is_some_and(|r| r.pending_request.is_some());
        let next = match &incoming {
            Some(req) => SyncActivity::RequestPending(req.clone()),
            None if own_pending => SyncActivity::RequestSent,
            None => SyncActivity::Idle,
        };
        self.set_activity(next);
        Ok(incoming)
    }

    /// Overwrites the room snapshot with local data. No conflict detection.
    pub async fn direct_sync(&mut self, app: &AppState) -> Result<(), SyncError> {
        let room_id = self.connected_room()?;
        let room = self
            .store
            .write_room(&room_id, RoomPatch::snapshot(app.data().clone()))
            .await?;
        self.mark_synced(app.store(), room.snapshot.fingerprint())
    }

    /// Proposes local data to the other participant.
    pub async fn request_sync(&mut self, app: &AppState) -> Result<(), SyncError> {
        let room_id = self.connected_room()?;
        if self.pending_request().is_some() {
            return Err(SyncError::IncomingRequestPending);
        }

        let patch = RoomPatch::propose(self.participant_id.clone(), app.data().clone());
        self.store.write_room(&room_id, patch).await?;
        self.set_activity(SyncActivity::RequestSent);
        Ok(())
    }

    /// Accepts the incoming proposal: commits it to the room, then locally.
    ///
    /// The request stays pending here until local data is replaced, so if
    /// the local write fails after the room was updated, accepting again
    /// retries both steps. Returns true if local data changed.
    pub async fn accept_sync(&mut self, app: &mut AppState) -> Result<bool, SyncError> {
        let room_id = self.connected_room()?;
        let proposal = self
            .pending_request()
            .map(|req| req.proposed_snapshot.clone())
            .ok_or(SyncError::NoPendingRequest)?;
        let fingerprint = proposal.fingerprint();

        self.store
            .write_room(&room_id, RoomPatch::accept(proposal.clone()))
            .await?;
        let changed = app.replace(proposal)?;

        self.set_activity(SyncActivity::Idle);
        self.mark_synced(app.store(), fingerprint)?;
        Ok(changed)
    }

    /// Declines the incoming proposal. The room snapshot is untouched.
    pub async fn reject_sync(&mut self) -> Result<(), SyncError> {
        let room_id = self.connected_room()?;
        if self.pending_request().is_none() {
            return Err(SyncError::NoPendingRequest);
        }

        self.store
            .write_room(&room_id, RoomPatch::clear_request())
            .await?;
        self.set_activity(SyncActivity::Idle);
        Ok(())
    }

    /// Leaves the room locally. The room and its members are untouched.
    pub fn disconnect(&mut self, app: &AppState) -> Result<(), SyncError> {
        let cleared = app
            .store()
            .clear_room_id()
            .and_then(|()| app.store().clear_synced_fingerprint());
        self.cancel_subscription();
        self.synced = None;
        self.state = ConnectionState::Disconnected;
        cleared.map_err(SyncError::from)
    }

    fn connected_room(&self) -> Result<String, SyncError> {
        self.room_id()
            .map(str::to_string)
            .ok_or(SyncError::NotConnected)
    }

    fn set_activity(&mut self, next: SyncActivity) {
        if let ConnectionState::Connected { activity, .. } = &mut self.state {
            *activity = next;
        }
    }

    fn mark_synced(&mut self, store: &LocalStore, fingerprint: String) -> Result<(), SyncError> {
        store.save_synced_fingerprint(&fingerprint)?;
        self.synced = Some(fingerprint);
        Ok(())
    }

    fn cancel_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppData, City};
    use crate::storage::LocalStore;
    use crate::sync::MemoryRoomStore;
    use std::time::Duration;
    use tempfile::TempDir;

    const SETTLE: Duration = Duration::from_millis(50);

    fn data(names: &[&str]) -> AppData {
        AppData::new(names.iter().map(|n| City::with_id(*n, *n)).collect())
    }

    fn app_in(dir: &TempDir, data: AppData) -> AppState {
        let store = LocalStore::new(dir.path().to_path_buf());
        store.save_data(&data).unwrap();
        AppState::from_parts(store, data)
    }

    /// Handles events until none arrive for a short while.
    async fn settle(
        coord: &mut SyncCoordinator<MemoryRoomStore>,
        app: &mut AppState,
    ) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(SETTLE, coord.next_event()).await {
            outcomes.push(coord.handle_event(app, event).unwrap());
        }
        outcomes
    }

    struct Pair {
        store: MemoryRoomStore,
        room_id: String,
        a: SyncCoordinator<MemoryRoomStore>,
        app_a: AppState,
        b: SyncCoordinator<MemoryRoomStore>,
        app_b: AppState,
        _dirs: (TempDir, TempDir),
    }

    /// A creates a room with its data, B joins, both settle.
    async fn connected_pair() -> Pair {
        let store = MemoryRoomStore::new();
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let mut app_a = app_in(&dir_a, data(&["beijing"]));
        let mut app_b = app_in(&dir_b, data(&["shanghai"]));

        let mut a = SyncCoordinator::new(store.clone(), "user-a");
        let mut b = SyncCoordinator::new(store.clone(), "user-b");

        let room_id = a.create_room(&app_a).await.unwrap();
        b.connect(&app_b, &room_id).await.unwrap();
        settle(&mut a, &mut app_a).await;
        settle(&mut b, &mut app_b).await;

        Pair {
            store,
            room_id,
            a,
            app_a,
            b,
            app_b,
            _dirs: (dir_a, dir_b),
        }
    }

    #[tokio::test]
    async fn test_connect_creates_room_and_persists_id() {
        let p = connected_pair().await;

        let room = p.store.read_room(&p.room_id).await.unwrap().unwrap();
        assert_eq!(room.snapshot, data(&["beijing"]));
        assert_eq!(room.members, vec!["user-a", "user-b"]);

        // Joining never overwrites the room; B adopted it instead
        assert_eq!(p.app_b.data(), &data(&["beijing"]));
        assert_eq!(
            p.app_b.store().load_room_id().unwrap().as_deref(),
            Some(p.room_id.as_str())
        );
        assert_eq!(
            p.a.state(),
            &ConnectionState::Connected {
                room_id: p.room_id.clone(),
                activity: SyncActivity::Idle
            }
        );
    }

    #[tokio::test]
    async fn test_request_then_reject_changes_nothing() {
        let mut p = connected_pair().await;
        let room_before = p.store.read_room(&p.room_id).await.unwrap().unwrap();

        p.app_b
            .update(|d| d.add_city("tokyo").map(|_| ()))
            .unwrap();
        let b_before = p.app_b.data().clone();
        let a_before = p.app_a.data().clone();

        p.b.request_sync(&p.app_b).await.unwrap();
        assert_eq!(p.b.state(), &ConnectionState::Connected {
            room_id: p.room_id.clone(),
            activity: SyncActivity::RequestSent,
        });

        let outcomes = settle(&mut p.a, &mut p.app_a).await;
        assert!(matches!(
            outcomes.last(),
            Some(SyncOutcome::IncomingRequest(req)) if req.from_participant == "user-b"
        ));
        assert_eq!(p.app_a.data(), &a_before);

        p.a.reject_sync().await.unwrap();

        let room_after = p.store.read_room(&p.room_id).await.unwrap().unwrap();
        assert_eq!(room_after.snapshot, room_before.snapshot);
        assert!(room_after.pending_request.is_none());
        assert_eq!(p.app_a.data(), &a_before);
        assert!(p.a.pending_request().is_none());

        // B sees its own request come and go without losing its edits
        let outcomes = settle(&mut p.b, &mut p.app_b).await;
        assert!(outcomes.iter().all(|o| *o == SyncOutcome::Unchanged));
        assert_eq!(p.app_b.data(), &b_before);
        assert_eq!(p.app_b.store().load_data().unwrap().as_ref(), Some(&b_before));
        assert_eq!(p.b.state(), &ConnectionState::Connected {
            room_id: p.room_id.clone(),
            activity: SyncActivity::Idle,
        });
    }

    #[tokio::test]
    async fn test_request_then_accept_adopts_proposal() {
        let mut p = connected_pair().await;
        p.app_b
            .update(|d| d.add_city("tokyo").map(|_| ()))
            .unwrap();
        let proposal = p.app_b.data().clone();

        p.b.request_sync(&p.app_b).await.unwrap();
        settle(&mut p.a, &mut p.app_a).await;

        // Waiting for the answer keeps the requester's data as it was
        settle(&mut p.b, &mut p.app_b).await;
        assert_eq!(p.app_b.data(), &proposal);

        assert!(p.a.accept_sync(&mut p.app_a).await.unwrap());
        assert_eq!(p.app_a.data(), &proposal);
        assert_eq!(p.app_a.store().load_data().unwrap().as_ref(), Some(&proposal));

        let room = p.store.read_room(&p.room_id).await.unwrap().unwrap();
        assert_eq!(room.snapshot, proposal);
        assert!(room.pending_request.is_none());

        settle(&mut p.b, &mut p.app_b).await;
        assert_eq!(p.app_b.data(), &proposal);

        // A's own accept comes back without another replace
        let outcomes = settle(&mut p.a, &mut p.app_a).await;
        assert!(outcomes.iter().all(|o| *o == SyncOutcome::Unchanged));
        assert_eq!(p.app_a.data(), &proposal);
    }

    #[tokio::test]
    async fn test_direct_sync_overwrites_unsaved_edits() {
        let mut p = connected_pair().await;

        p.app_a
            .update(|d| d.add_city("kyoto").map(|_| ()))
            .unwrap();
        p.a.direct_sync(&p.app_a).await.unwrap();

        // B edits locally before handling the change
        p.app_b
            .update(|d| d.add_city("seoul").map(|_| ()))
            .unwrap();

        let outcomes = settle(&mut p.b, &mut p.app_b).await;
        assert!(outcomes.contains(&SyncOutcome::Applied { changed: true }));
        assert_eq!(p.app_b.data(), p.app_a.data());

        // The writer keeps its own data when the change echoes back
        let a_before = p.app_a.data().clone();
        let outcomes = settle(&mut p.a, &mut p.app_a).await;
        assert!(outcomes.iter().all(|o| *o == SyncOutcome::Unchanged));
        assert_eq!(p.app_a.data(), &a_before);
    }

    #[tokio::test]
    async fn test_member_writes_keep_unsynced_edits() {
        let mut p = connected_pair().await;
        p.app_a
            .update(|d| d.add_city("kyoto").map(|_| ()))
            .unwrap();
        let a_before = p.app_a.data().clone();

        // A third participant joining rewrites only the member list
        let dir = TempDir::new().unwrap();
        let app_c = app_in(&dir, data(&["seoul"]));
        let mut c = SyncCoordinator::new(p.store.clone(), "user-c");
        c.connect(&app_c, &p.room_id).await.unwrap();

        let outcomes = settle(&mut p.a, &mut p.app_a).await;
        assert_eq!(outcomes, vec![SyncOutcome::Unchanged]);
        assert_eq!(p.app_a.data(), &a_before);
    }

    #[tokio::test]
    async fn test_request_refused_while_incoming_pending() {
        let mut p = connected_pair().await;
        p.b.request_sync(&p.app_b).await.unwrap();
        settle(&mut p.a, &mut p.app_a).await;

        let err = p.a.request_sync(&p.app_a).await.unwrap_err();
        assert!(matches!(err, SyncError::IncomingRequestPending));
    }

    #[tokio::test]
    async fn test_answer_without_request() {
        let mut p = connected_pair().await;
        assert!(matches!(
            p.a.accept_sync(&mut p.app_a).await.unwrap_err(),
            SyncError::NoPendingRequest
        ));
        assert!(matches!(
            p.a.reject_sync().await.unwrap_err(),
            SyncError::NoPendingRequest
        ));
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir, data(&["beijing"]));
        let mut coord = SyncCoordinator::new(MemoryRoomStore::new(), "user-a");

        assert!(matches!(
            coord.direct_sync(&app).await.unwrap_err(),
            SyncError::NotConnected
        ));
        assert!(matches!(
            coord.request_sync(&app).await.unwrap_err(),
            SyncError::NotConnected
        ));
        assert!(coord.next_event().await.is_none());
        assert!(matches!(
            coord.check_request().await.unwrap_err(),
            SyncError::NotConnected
        ));

        let room = crate::sync::Room::apply(
            None,
            RoomPatch::snapshot(data(&["x"])),
            chrono::Utc::now(),
        );
        let outcome = coord.handle_event(&mut app, RoomEvent::Changed(room)).unwrap();
        assert_eq!(outcome, SyncOutcome::Ignored);
        assert_eq!(app.data(), &data(&["beijing"]));
    }

    #[tokio::test]
    async fn test_failed_connect_stays_disconnected() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, data(&["beijing"]));
        let store = MemoryRoomStore::new();
        store.set_available(false);
        let mut coord = SyncCoordinator::new(store.clone(), "user-a");

        let err = coord.connect(&app, "room1").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(RemoteError::Unavailable)));
        assert_eq!(coord.state(), &ConnectionState::Disconnected);
        assert!(app.store().load_room_id().unwrap().is_none());
        assert!(coord.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_saved_room() {
        let mut p = connected_pair().await;

        p.store.set_available(false);
        assert!(p.a.connect(&p.app_a, "other-room").await.is_err());
        assert_eq!(p.a.state(), &ConnectionState::Disconnected);
        assert_eq!(
            p.app_a.store().load_room_id().unwrap().as_deref(),
            Some(p.room_id.as_str())
        );

        p.store.set_available(true);
        let resumed = p.a.resume(&p.app_a).await.unwrap();
        assert_eq!(resumed.as_deref(), Some(p.room_id.as_str()));
    }

    #[tokio::test]
    async fn test_invalid_room_id_rejected() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir, data(&["beijing"]));
        let mut coord = SyncCoordinator::new(MemoryRoomStore::new(), "user-a");

        let err = coord.connect(&app, "../../etc").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(RemoteError::InvalidRoomId(_))));
        assert_eq!(coord.state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let mut p = connected_pair().await;
        let state_before = p.b.state().clone();
        let data_before = p.app_b.data().clone();

        p.store.set_available(false);
        assert!(matches!(
            p.b.direct_sync(&p.app_b).await.unwrap_err(),
            SyncError::Remote(RemoteError::Unavailable)
        ));
        assert!(p.b.request_sync(&p.app_b).await.is_err());

        assert_eq!(p.b.state(), &state_before);
        assert_eq!(p.app_b.data(), &data_before);
    }

    #[tokio::test]
    async fn test_failed_accept_keeps_request() {
        let mut p = connected_pair().await;
        p.b.request_sync(&p.app_b).await.unwrap();
        settle(&mut p.a, &mut p.app_a).await;
        let data_before = p.app_a.data().clone();

        p.store.set_available(false);
        assert!(p.a.accept_sync(&mut p.app_a).await.is_err());
        assert!(p.a.pending_request().is_some());
        assert_eq!(p.app_a.data(), &data_before);
    }

    #[tokio::test]
    async fn test_accept_retries_after_local_write_failure() {
        let mut p = connected_pair().await;
        p.app_b
            .update(|d| d.add_city("tokyo").map(|_| ()))
            .unwrap();
        let proposal = p.app_b.data().clone();
        p.b.request_sync(&p.app_b).await.unwrap();
        settle(&mut p.a, &mut p.app_a).await;
        let data_before = p.app_a.data().clone();

        // A directory in place of the temp file makes the snapshot save fail
        let blocker = p.app_a.store().data_dir().join("trip-app-data.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let err = p.a.accept_sync(&mut p.app_a).await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
        assert!(p.a.pending_request().is_some());
        assert_eq!(p.app_a.data(), &data_before);

        std::fs::remove_dir(&blocker).unwrap();
        assert!(p.a.accept_sync(&mut p.app_a).await.unwrap());
        assert_eq!(p.app_a.data(), &proposal);
        assert!(p.a.pending_request().is_none());
    }

    #[tokio::test]
    async fn test_error_event_leaves_state_unchanged() {
        let mut p = connected_pair().await;
        let state_before = p.a.state().clone();
        let data_before = p.app_a.data().clone();

        let err = p
            .a
            .handle_event(&mut p.app_a, RoomEvent::Error(RemoteError::Unavailable))
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(RemoteError::Unavailable)));
        assert_eq!(p.a.state(), &state_before);
        assert_eq!(p.app_a.data(), &data_before);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_subscription() {
        let mut p = connected_pair().await;
        p.a.disconnect(&p.app_a).unwrap();

        assert_eq!(p.a.state(), &ConnectionState::Disconnected);
        assert!(p.app_a.store().load_room_id().unwrap().is_none());

        // Writes after disconnect are not delivered
        p.b.direct_sync(&p.app_b).await.unwrap();
        assert!(p.a.next_event().await.is_none());

        // The room and its members are untouched
        let room = p.store.read_room(&p.room_id).await.unwrap().unwrap();
        assert_eq!(room.members, vec!["user-a", "user-b"]);
    }

    #[tokio::test]
    async fn test_resume_reconnects_to_saved_room() {
        let p = connected_pair().await;

        let mut again = SyncCoordinator::new(p.store.clone(), "user-a");
        let resumed = again.resume(&p.app_a).await.unwrap();
        assert_eq!(resumed.as_deref(), Some(p.room_id.as_str()));
        assert_eq!(again.room_id(), Some(p.room_id.as_str()));

        let dir = TempDir::new().unwrap();
        let fresh = app_in(&dir, data(&["beijing"]));
        let mut idle = SyncCoordinator::new(p.store.clone(), "user-c");
        assert_eq!(idle.resume(&fresh).await.unwrap(), None);
        assert_eq!(idle.state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_pending_request_survives_reconnect() {
        let mut p = connected_pair().await;
        p.b.request_sync(&p.app_b).await.unwrap();

        p.a.disconnect(&p.app_a).unwrap();
        p.a.connect(&p.app_a, &p.room_id).await.unwrap();
        let outcomes = settle(&mut p.a, &mut p.app_a).await;

        assert!(matches!(
            outcomes.first(),
            Some(SyncOutcome::IncomingRequest(_))
        ));
        assert!(p.a.pending_request().is_some());
    }

    #[tokio::test]
    async fn test_resume_keeps_unsynced_local_edits() {
        let mut p = connected_pair().await;
        p.app_b
            .update(|d| d.add_city("tokyo").map(|_| ()))
            .unwrap();
        let b_before = p.app_b.data().clone();

        // A later run reconnects with a fresh coordinator
        let mut again = SyncCoordinator::new(p.store.clone(), "user-b");
        again.resume(&p.app_b).await.unwrap();
        let event = again.next_event().await.unwrap();
        let outcome = again.handle_event(&mut p.app_b, event).unwrap();

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(p.app_b.data(), &b_before);
        assert_eq!(again.check_request().await.unwrap(), None);
        assert_eq!(p.app_b.data(), &b_before);
    }

    #[tokio::test]
    async fn test_resume_adopts_changes_made_while_away() {
        let mut p = connected_pair().await;

        p.app_a
            .update(|d| d.add_city("kyoto").map(|_| ()))
            .unwrap();
        p.a.direct_sync(&p.app_a).await.unwrap();

        let mut again = SyncCoordinator::new(p.store.clone(), "user-b");
        again.resume(&p.app_b).await.unwrap();
        let outcomes = settle(&mut again, &mut p.app_b).await;

        assert_eq!(outcomes.first(), Some(&SyncOutcome::Applied { changed: true }));
        assert_eq!(p.app_b.data(), p.app_a.data());
    }

    #[tokio::test]
    async fn test_check_request_leaves_local_data_alone() {
        let mut p = connected_pair().await;
        p.b.request_sync(&p.app_b).await.unwrap();

        p.app_a
            .update(|d| d.add_city("kyoto").map(|_| ()))
            .unwrap();
        let a_before = p.app_a.data().clone();

        let mut again = SyncCoordinator::new(p.store.clone(), "user-a");
        again.resume(&p.app_a).await.unwrap();
        let req = again.check_request().await.unwrap().unwrap();

        assert_eq!(req.from_participant, "user-b");
        assert_eq!(again.pending_request(), Some(&req));
        assert_eq!(p.app_a.data(), &a_before);

        // The requester's own request reads as sent, not incoming
        assert_eq!(p.b.check_request().await.unwrap(), None);
        assert_eq!(p.b.state(), &ConnectionState::Connected {
            room_id: p.room_id.clone(),
            activity: SyncActivity::RequestSent,
        });

        again.reject_sync().await.unwrap();
        assert_eq!(again.check_request().await.unwrap(), None);
        assert_eq!(p.app_a.data(), &a_before);
    }
}
