//! File-backed key-value store with browser local-storage semantics
//!
//! The file holds a JSON object mapping string keys to string values.
//! Writes replace the whole file (temp file + rename), so concurrent
//! processes sharing a file see last-write-wins behaviour.

use crate::error::{ChatError, Result};
use crate::session::{Session, SessionMap};
use crate::storage::SessionBackend;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// String key-value store persisted to a single JSON file
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Persistence` if the file exists but cannot be
    /// read or is not a JSON object of strings
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking every later write.
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable local storage file: {}", e);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    /// Remove `key`; missing keys are ignored
    pub fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ChatError::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                ))
                .into())
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            ChatError::Persistence(format!("Failed to parse {}: {}", self.path.display(), e))
                .into()
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create local storage directory")
                    .map_err(|e| ChatError::Persistence(e.to_string()))?;
            }
        }

        let serialized = serde_json::to_string(entries)
            .map_err(|e| ChatError::Persistence(format!("Serialization failed: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized)
            .context("Failed to write local storage file")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path)
            .context("Failed to replace local storage file")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// Session backend storing the whole mapping as JSON under one key
///
/// Every upsert and remove is a read-modify-write of the entire mapping.
/// Removing the last session drops the key altogether.
pub struct LocalStorageBackend {
    storage: LocalStorage,
    key: String,
}

impl LocalStorageBackend {
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::storage::{LocalStorage, LocalStorageBackend, SessionBackend};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = LocalStorage::new(dir.path().join("local_storage.json"));
    /// let backend = LocalStorageBackend::new(storage, "kfupm_sessions");
    /// assert!(backend.load_all().unwrap().is_empty());
    /// ```
    pub fn new(storage: LocalStorage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn write_map(&self, map: &SessionMap) -> Result<()> {
        let serialized = serde_json::to_string(map)
            .map_err(|e| ChatError::Persistence(format!("Serialization failed: {}", e)))?;
        self.storage.set_item(&self.key, &serialized)
    }

    fn current_map(&self) -> SessionMap {
        self.load_all().unwrap_or_else(|e| {
            tracing::warn!("Rewriting unreadable session mapping: {}", e);
            SessionMap::new()
        })
    }
}

impl SessionBackend for LocalStorageBackend {
    fn load_all(&self) -> Result<SessionMap> {
        match self.storage.get_item(&self.key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ChatError::Persistence(format!("Failed to load sessions: {}", e)).into()
            }),
            None => Ok(SessionMap::new()),
        }
    }

    fn upsert(&mut self, session: &Session) -> Result<()> {
        let mut map = self.current_map();
        map.insert(session.clone());
        self.write_map(&map)
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let mut map = self.current_map();
        if map.remove(id).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            self.storage.remove_item(&self.key)
        } else {
            self.write_map(&map)
        }
    }

    fn describe(&self) -> String {
        format!("local storage {} (key {})", self.storage.path().display(), self.key)
    }
}
