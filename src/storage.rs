use crate::ranking::Ranking;
use gloo_storage::errors::StorageError;
use gloo_storage::{LocalStorage, Storage};
use log::warn;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Browser(#[from] StorageError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// Somewhere a list of identifiers can be kept between page loads.
pub trait OrderBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<String>>, StoreError>;
    fn write(&mut self, key: &str, order: &[String]) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageBackend;

impl OrderBackend for LocalStorageBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<String>>, StoreError> {
        match LocalStorage::get::<Vec<String>>(key) {
            Ok(order) => Ok(Some(order)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, order: &[String]) -> Result<(), StoreError> {
        LocalStorage::set(key, order)?;
        Ok(())
    }
}

/// Keeps serialized entries in memory. Raw entries may be malformed on purpose.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&mut self, key: &str, raw: &str) {
        self.entries.insert(key.to_owned(), raw.to_owned());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl OrderBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<String>>, StoreError> {
        match self.entries.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, key: &str, order: &[String]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::QuotaExceeded);
        }
        let raw = serde_json::to_string(order)?;
        self.entries.insert(key.to_owned(), raw);
        Ok(())
    }
}

#[derive(Debug)]
pub struct OrderStore<B> {
    backend: B,
    key: String,
}

impl<B: OrderBackend> OrderStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The stored ranking, if one exists and is a permutation of `expected`.
    pub fn load(&self, expected: &HashSet<String>) -> Option<Ranking> {
        let stored = match self.backend.read(&self.key) {
            Ok(Some(order)) => order,
            Ok(None) => return None,
            Err(err) => {
                warn!("Could not read stored advisor order: {}", err);
                return None;
            }
        };

        match Ranking::validated(stored, expected) {
            Ok(ranking) => Some(ranking),
            Err(err) => {
                warn!("Ignoring stale advisor order: {}", err);
                None
            }
        }
    }

    pub fn save(&mut self, ranking: &Ranking) {
        if ranking.is_empty() {
            return;
        }
        if let Err(err) = self.backend.write(&self.key, ranking.ids()) {
            warn!("Could not persist advisor order: {}", err);
        }
    }
}
