//! Application state container.
//!
//! Holds the current snapshot together with the store it is persisted to.
//! Every change goes through [`AppState::update`] or [`AppState::replace`],
//! which write the whole snapshot before the in-memory copy is swapped.

use crate::merge::merge;
use crate::models::{AppData, ModelError};
use crate::storage::{LocalStore, StorageError};

#[derive(Debug)]
pub struct AppState {
    store: LocalStore,
    data: AppData,
}

impl AppState {
    /// Loads the stored snapshot merged with `seed`.
    ///
    /// On first run nothing is stored yet; the seed itself is persisted.
    pub fn load(store: LocalStore, seed: &AppData) -> Result<Self, StorageError> {
        let data = match store.load_data()? {
            Some(stored) => merge(seed, &stored),
            None => {
                store.save_data(seed)?;
                seed.clone()
            }
        };

        Ok(Self { store, data })
    }

    /// Wraps already-loaded data without touching disk.
    pub fn from_parts(store: LocalStore, data: AppData) -> Self {
        Self { store, data }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Applies `f` to a copy of the data, persists it, then commits.
    ///
    /// Nothing changes (in memory or on disk) if `f` or the save fails.
    pub fn update<T, F>(&mut self, f: F) -> Result<T, UpdateError>
    where
        F: FnOnce(&mut AppData) -> Result<T, ModelError>,
    {
        let mut next = self.data.clone();
        let result = f(&mut next).map_err(UpdateError::Model)?;
        self.store.save_data(&next).map_err(UpdateError::Storage)?;
        self.data = next;
        Ok(result)
    }

    /// Replaces the whole snapshot. Returns true if the content changed.
    pub fn replace(&mut self, data: AppData) -> Result<bool, StorageError> {
        let changed = data != self.data;
        self.store.save_data(&data)?;
        self.data = data;
        Ok(changed)
    }
}

/// Errors from [`AppState::update`].
#[derive(Debug)]
pub enum UpdateError {
    Model(ModelError),
    Storage(StorageError),
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::Model(e) => write!(f, "{}", e),
            UpdateError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpdateError::Model(e) => Some(e),
            UpdateError::Storage(e) => Some(e),
        }
    }
}
