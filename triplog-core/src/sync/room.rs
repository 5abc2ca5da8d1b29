//! Shared room record and the patches that update it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::AppData;

/// Length of generated room ids.
const ROOM_ID_LEN: usize = 9;

const ROOM_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// The rendezvous record shared by the participants of one room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub snapshot: AppData,
    /// Assigned by the store on every write
    pub updated_at: DateTime<Utc>,
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<PendingSyncRequest>,
}

/// A proposed snapshot waiting for the other participant's consent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncRequest {
    pub from_participant: String,
    pub proposed_snapshot: AppData,
    /// Assigned by the store
    pub requested_at: DateTime<Utc>,
}

/// What a write does to the pending request slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PendingRequestPatch {
    #[default]
    Keep,
    #[serde(rename_all = "camelCase")]
    Propose {
        from_participant: String,
        proposed_snapshot: AppData,
    },
    Clear,
}

/// A partial write. Each field group merges independently of the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    /// Replaces the room snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<AppData>,
    /// Snapshot used only when the write creates the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_snapshot: Option<AppData>,
    /// Participant appended to `members` if not already present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_member: Option<String>,
    #[serde(default)]
    pub pending_request: PendingRequestPatch,
}

impl RoomPatch {
    /// Joins `participant`, creating the room with `local` if it does not exist.
    pub fn join(participant: impl Into<String>, local: AppData) -> Self {
        Self {
            initial_snapshot: Some(local),
            add_member: Some(participant.into()),
            ..Default::default()
        }
    }

    /// Overwrites the room snapshot.
    pub fn snapshot(data: AppData) -> Self {
        Self {
            snapshot: Some(data),
            ..Default::default()
        }
    }

    /// Proposes `data` without touching the room snapshot.
    pub fn propose(participant: impl Into<String>, data: AppData) -> Self {
        Self {
            pending_request: PendingRequestPatch::Propose {
                from_participant: participant.into(),
                proposed_snapshot: data,
            },
            ..Default::default()
        }
    }

    /// Commits an accepted proposal and clears the request in the same write.
    pub fn accept(data: AppData) -> Self {
        Self {
            snapshot: Some(data),
            pending_request: PendingRequestPatch::Clear,
            ..Default::default()
        }
    }

    /// Clears the pending request.
    pub fn clear_request() -> Self {
        Self {
            pending_request: PendingRequestPatch::Clear,
            ..Default::default()
        }
    }
}

impl Room {
    /// Applies `patch` to an existing room, or creates one, stamping `now`.
    pub fn apply(existing: Option<Room>, patch: RoomPatch, now: DateTime<Utc>) -> Room {
        let mut room = match existing {
            Some(room) => room,
            None => Room {
                snapshot: patch.initial_snapshot.clone().unwrap_or_default(),
                updated_at: now,
                members: Vec::new(),
                pending_request: None,
            },
        };

        if let Some(snapshot) = patch.snapshot {
            room.snapshot = snapshot;
        }
        if let Some(member) = patch.add_member {
            if !room.members.contains(&member) {
                room.members.push(member);
            }
        }
        match patch.pending_request {
            PendingRequestPatch::Keep => {}
            PendingRequestPatch::Propose {
                from_participant,
                proposed_snapshot,
            } => {
                room.pending_request = Some(PendingSyncRequest {
                    from_participant,
                    proposed_snapshot,
                    requested_at: now,
                });
            }
            PendingRequestPatch::Clear => room.pending_request = None,
        }

        room.updated_at = now;
        room
    }

    /// The pending request, if it was sent by someone other than `participant`.
    pub fn incoming_request(&self, participant: &str) -> Option<&PendingSyncRequest> {
        self.pending_request
            .as_ref()
            .filter(|req| req.from_participant != participant)
    }
}

/// Generates a short room id to share with a partner.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
        .collect()
}

/// Room ids double as file names on the server, so they are kept to a safe alphabet.
pub fn is_valid_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id.len() <= 64
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
