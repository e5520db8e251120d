//! Key-value stores
//!
//! Both targets expose the same flat, typed key-value shape:
//!
//! - [`ConfigStore`] - the global store, one toml file per named profile
//! - [`EmbeddedStore`] - scoped to one document and saved inside it
//!
//! Readers must not assume a key exists: documents saved by older setups may
//! lack keys for axes added later, so every read returns an `Option`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to encode store: {0}")]
    Encode(String),

    #[error("Failed to decode store: {0}")]
    Decode(String),
}

/// Typed store entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Int(i64),
    Float(f64),
    String(String),
}

pub trait KeyValueStore {
    fn has_key(&self, key: &str) -> bool;
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn set_string(&mut self, key: &str, value: &str);
    fn set_int(&mut self, key: &str, value: i64);
    fn set_float(&mut self, key: &str, value: f64);
    fn remove_key(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Stores keeping their entries in an ordered map
pub trait MapBacked {
    fn entries(&self) -> &BTreeMap<String, StoreValue>;
    fn entries_mut(&mut self) -> &mut BTreeMap<String, StoreValue>;
}

impl<T: MapBacked> KeyValueStore for T {
    fn has_key(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.entries().get(key)? {
            StoreValue::String(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries().get(key)? {
            StoreValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    // Integers written by hand are accepted where floats are expected
    fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries().get(key)? {
            StoreValue::Float(value) => Some(*value),
            StoreValue::Int(value) => Some(*value as f64),
            StoreValue::String(_) => None,
        }
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.entries_mut()
            .insert(key.to_string(), StoreValue::String(value.to_string()));
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries_mut()
            .insert(key.to_string(), StoreValue::Int(value));
    }

    fn set_float(&mut self, key: &str, value: f64) {
        self.entries_mut()
            .insert(key.to_string(), StoreValue::Float(value));
    }

    fn remove_key(&mut self, key: &str) {
        self.entries_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}

/// Global store backed by a toml file
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    path: PathBuf,
    entries: BTreeMap<String, StoreValue>,
    // Set when an unreadable file could not be moved out of the way
    read_only: bool,
}

impl MapBacked for ConfigStore {
    fn entries(&self) -> &BTreeMap<String, StoreValue> {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut BTreeMap<String, StoreValue> {
        &mut self.entries
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            read_only: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// `<file>.bak` next to the store file
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Reads the store, a missing file gives an empty store
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?
        {
            info!("No store at {}, starting empty", path.display());
            return Ok(Self::new(path));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| PersistenceError::Io(format!("{}: {}", path.display(), e)))?;
        let entries: BTreeMap<String, StoreValue> = toml::from_str(&content)
            .map_err(|e| PersistenceError::Decode(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded {} entries from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries,
            read_only: false,
        })
    }

    /// Like [`ConfigStore::load`], but an unreadable file gives an empty store.
    ///
    /// A file that fails to decode is moved to [`ConfigStore::backup_path`]
    /// first, so a later save never replaces it. When it cannot be moved, or
    /// cannot be read at all, the store refuses to save.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = match Self::load(path.clone()).await {
            Ok(store) => return store,
            Err(e) => {
                warn!("Ignoring unreadable store, starting empty: {}", e);
                Self::new(path)
            }
        };

        let backup = store.backup_path();
        match tokio::fs::rename(&store.path, &backup).await {
            Ok(()) => warn!(
                "Moved unreadable store {} to {}",
                store.path.display(),
                backup.display()
            ),
            Err(e) => {
                error!(
                    "Could not move unreadable store {} aside, keeping it untouched: {}",
                    store.path.display(),
                    e
                );
                store.read_only = true;
            }
        }
        store
    }

    pub async fn save(&self) -> Result<(), PersistenceError> {
        if self.read_only {
            return Err(PersistenceError::Io(format!(
                "{}: unreadable store left in place, not overwriting it",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let content = toml::to_string_pretty(&self.entries)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| PersistenceError::Io(format!("{}: {}", self.path.display(), e)))?;
        info!("Saved {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

/// Store embedded in a document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedStore {
    entries: BTreeMap<String, StoreValue>,
}

impl MapBacked for EmbeddedStore {
    fn entries(&self) -> &BTreeMap<String, StoreValue> {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut BTreeMap<String, StoreValue> {
        &mut self.entries
    }
}

impl EmbeddedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
