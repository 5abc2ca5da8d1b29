//! Local durable storage for a single participant.
//!
//! Storage layout:
//! ```text
//! ~/.local/share/triplog/
//! ├── trip-app-data.json     # encoded AppData snapshot
//! ├── room_id                # active sync room (absent when disconnected)
//! ├── synced_fingerprint     # room snapshot last adopted or written
//! └── participant_id         # generated once, never changes
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::codec::{self, CodecError};
use crate::models::AppData;

/// Filename for the encoded snapshot.
const DATA_FILE: &str = "trip-app-data.json";

/// Filename for the active room id.
const ROOM_ID_FILE: &str = "room_id";

/// Filename for the fingerprint of the last synced room snapshot.
const SYNCED_FILE: &str = "synced_fingerprint";

/// Filename for the participant id.
const PARTICIPANT_ID_FILE: &str = "participant_id";

/// File-backed key store for the snapshot, room id and participant id.
#[derive(Clone, Debug)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    /// Creates a new store rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Full path of the snapshot file.
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE)
    }

    /// Loads the stored snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been saved yet.
    pub fn load_data(&self) -> Result<Option<AppData>, StorageError> {
        let path = self.data_path();

        match fs::read_to_string(&path) {
            Ok(text) => codec::decode(&text)
                .map(Some)
                .map_err(|e| StorageError::Corrupted(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Persists the whole snapshot, replacing the previous one.
    pub fn save_data(&self, data: &AppData) -> Result<(), StorageError> {
        self.write_atomic(&self.data_path(), codec::encode(data).as_bytes())
    }

    /// Loads the active room id, if any.
    pub fn load_room_id(&self) -> Result<Option<String>, StorageError> {
        self.read_key(ROOM_ID_FILE)
    }

    /// Saves the active room id.
    pub fn save_room_id(&self, room_id: &str) -> Result<(), StorageError> {
        self.write_atomic(&self.data_dir.join(ROOM_ID_FILE), room_id.as_bytes())
    }

    /// Removes the active room id. Missing file is not an error.
    pub fn clear_room_id(&self) -> Result<(), StorageError> {
        self.remove_key(ROOM_ID_FILE)
    }

    /// Fingerprint of the room snapshot this participant last adopted or wrote.
    pub fn load_synced_fingerprint(&self) -> Result<Option<String>, StorageError> {
        self.read_key(SYNCED_FILE)
    }

    pub fn save_synced_fingerprint(&self, fingerprint: &str) -> Result<(), StorageError> {
        self.write_atomic(&self.data_dir.join(SYNCED_FILE), fingerprint.as_bytes())
    }

    pub fn clear_synced_fingerprint(&self) -> Result<(), StorageError> {
        self.remove_key(SYNCED_FILE)
    }

    /// Returns the stable participant id, generating and saving it on first use.
    pub fn participant_id(&self) -> Result<String, StorageError> {
        if let Some(id) = self.read_key(PARTICIPANT_ID_FILE)? {
            return Ok(id);
        }

        let id = generate_participant_id();
        self.write_atomic(&self.data_dir.join(PARTICIPANT_ID_FILE), id.as_bytes())?;
        Ok(id)
    }

    fn read_key(&self, name: &str) -> Result<Option<String>, StorageError> {
        let path = self.data_dir.join(name);

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let value = contents.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(value.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    fn remove_key(&self, name: &str) -> Result<(), StorageError> {
        let path = self.data_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Writes through a temp file so a crash never leaves a half-written key.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| StorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, path).map_err(|e| StorageError::IoError(path.to_path_buf(), e))?;

        Ok(())
    }
}

/// Generates a participant id of the form `user-<uuid>`.
pub fn generate_participant_id() -> String {
    format!("user-{}", Uuid::new_v4().simple())
}

/// Errors that can occur during local storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The stored snapshot could not be decoded.
    Corrupted(PathBuf, CodecError),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::Corrupted(path, e) => {
                write!(f, "Failed to load {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::Corrupted(_, e) => Some(e),
        }
    }
}
