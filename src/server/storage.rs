//! Server-side room storage.
//!
//! Rooms are stored as JSON files:
//! ```text
//! <DATA_DIR>/
//!   rooms/
//!     <room_id>.json
//! ```
//!
//! All rooms are loaded into memory at start-up; every committed write is
//! saved back here.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use triplog_core::sync::is_valid_room_id;
use triplog_core::Room;

/// Subdirectory of the data directory holding room files.
const ROOMS_DIR: &str = "rooms";

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// A room file could not be parsed.
    ParseError(PathBuf, serde_json::Error),
    /// Invalid room ID (e.g., contains path separators).
    InvalidRoomId(String),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::ParseError(path, e) => {
                write!(f, "Failed to load room {}: {}", path.display(), e)
            }
            ServerStorageError::InvalidRoomId(id) => {
                write!(f, "Invalid room ID: {}", id)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::ParseError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// File storage for room records.
#[derive(Debug, Clone)]
pub struct ServerStorage {
    rooms_dir: PathBuf,
}

impl ServerStorage {
    /// Creates a new server storage instance under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            rooms_dir: data_dir.as_ref().join(ROOMS_DIR),
        }
    }

    /// Validates a room ID to prevent path traversal attacks.
    fn validate_room_id(room_id: &str) -> Result<(), ServerStorageError> {
        if !is_valid_room_id(room_id) || room_id.starts_with('.') {
            return Err(ServerStorageError::InvalidRoomId(room_id.to_string()));
        }
        Ok(())
    }

    /// Returns the full path for a room.
    fn room_path(&self, room_id: &str) -> PathBuf {
        self.rooms_dir.join(format!("{}.json", room_id))
    }

    /// Loads a room.
    ///
    /// Returns `Ok(None)` if the room doesn't exist yet.
    pub fn load(&self, room_id: &str) -> Result<Option<Room>, ServerStorageError> {
        Self::validate_room_id(room_id)?;
        let path = self.room_path(room_id);

        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| ServerStorageError::ParseError(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::IoError(path, e)),
        }
    }

    /// Loads every stored room, keyed by room ID.
    ///
    /// Files that are not room files are skipped.
    pub fn load_all(&self) -> Result<HashMap<String, Room>, ServerStorageError> {
        let entries = match fs::read_dir(&self.rooms_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(ServerStorageError::IoError(self.rooms_dir.clone(), e)),
        };

        let mut rooms = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| ServerStorageError::IoError(self.rooms_dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let room_id = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(id) if Self::validate_room_id(id).is_ok() => id.to_string(),
                _ => continue,
            };
            if let Some(room) = self.load(&room_id)? {
                rooms.insert(room_id, room);
            }
        }

        Ok(rooms)
    }

    /// Saves a room, creating the rooms directory if needed.
    pub fn save(&self, room_id: &str, room: &Room) -> Result<(), ServerStorageError> {
        Self::validate_room_id(room_id)?;

        fs::create_dir_all(&self.rooms_dir)
            .map_err(|e| ServerStorageError::IoError(self.rooms_dir.clone(), e))?;

        let path = self.room_path(room_id);
        let json = serde_json::to_string_pretty(room)
            .map_err(|e| ServerStorageError::ParseError(path.clone(), e))?;

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &path).map_err(|e| ServerStorageError::IoError(path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use triplog_core::{seed_data, RoomPatch};

    fn setup() -> (ServerStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ServerStorage::new(temp_dir.path());
        (storage, temp_dir)
    }

    fn sample_room() -> Room {
        Room::apply(None, RoomPatch::join("user-a", seed_data()), Utc::now())
    }

    #[test]
    fn test_validate_room_id() {
        // Valid
        assert!(ServerStorage::validate_room_id("k3j9x2m1q").is_ok());
        assert!(ServerStorage::validate_room_id("our-trip").is_ok());
        assert!(ServerStorage::validate_room_id("room_123").is_ok());

        // Invalid
        assert!(ServerStorage::validate_room_id("").is_err());
        assert!(ServerStorage::validate_room_id("../evil").is_err());
        assert!(ServerStorage::validate_room_id("foo/bar").is_err());
        assert!(ServerStorage::validate_room_id("foo\\bar").is_err());
        assert!(ServerStorage::validate_room_id(".hidden").is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let (storage, _temp) = setup();
        assert!(storage.load("room1").unwrap().is_none());
        assert!(storage.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (storage, temp) = setup();
        let room = sample_room();

        storage.save("room1", &room).unwrap();

        assert!(temp.path().join("rooms").join("room1.json").exists());
        assert_eq!(storage.load("room1").unwrap(), Some(room));
    }

    #[test]
    fn test_load_all_skips_other_files() {
        let (storage, temp) = setup();
        storage.save("room1", &sample_room()).unwrap();
        storage.save("room2", &sample_room()).unwrap();
        fs::write(temp.path().join("rooms").join("notes.txt"), "hello").unwrap();

        let rooms = storage.load_all().unwrap();
        assert_eq!(rooms.len(), 2);
        assert!(rooms.contains_key("room1"));
        assert!(rooms.contains_key("room2"));
    }

    #[test]
    fn test_corrupted_room_file() {
        let (storage, temp) = setup();
        let dir = temp.path().join("rooms");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("room1.json"), "{not json").unwrap();

        assert!(matches!(
            storage.load("room1"),
            Err(ServerStorageError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_invalid_room_id_rejected_on_save() {
        let (storage, _temp) = setup();
        assert!(matches!(
            storage.save("../escape", &sample_room()),
            Err(ServerStorageError::InvalidRoomId(_))
        ));
    }
}
