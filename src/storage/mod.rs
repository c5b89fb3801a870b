//! Persistence backends for chat sessions
//!
//! The session store talks to storage through [`SessionBackend`], which
//! offers single-session upsert semantics. Three backends are provided:
//!
//! - [`LocalStorageBackend`]: a file-backed string key-value store holding
//!   the whole session mapping as JSON under one key (`kfupm_sessions`).
//!   Every write rewrites the full mapping.
//! - [`SqliteBackend`]: one row per session in an SQLite database.
//! - [`MemoryBackend`]: in-process only, used for ephemeral runs and tests.

use crate::config::{StorageBackendKind, StorageConfig};
use crate::error::Result;
use crate::session::{Session, SessionMap};

pub mod local_storage;
pub mod memory;
pub mod sqlite;

pub use local_storage::{LocalStorage, LocalStorageBackend};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Storage seam for the session store
///
/// Implementations must return sessions from [`load_all`](Self::load_all)
/// in insertion order, and an upsert of an existing id must keep that
/// session's position.
pub trait SessionBackend: Send {
    /// Read every persisted session
    fn load_all(&self) -> Result<SessionMap>;

    /// Insert or replace one session
    fn upsert(&mut self, session: &Session) -> Result<()>;

    /// Remove one session; removing an unknown id is not an error
    fn remove(&mut self, id: &str) -> Result<()>;

    /// Short human-readable location, used in log lines
    fn describe(&self) -> String;
}

/// Build the backend selected by the storage configuration
///
/// # Errors
///
/// Returns error if the data directory cannot be determined or the
/// backing file cannot be prepared
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn SessionBackend>> {
    let backend: Box<dyn SessionBackend> = match config.backend {
        StorageBackendKind::LocalStorage => {
            let path = config.resolved_path()?;
            Box::new(LocalStorageBackend::new(
                LocalStorage::new(path),
                config.key.clone(),
            ))
        }
        StorageBackendKind::Sqlite => Box::new(SqliteBackend::new_with_path(config.resolved_path()?)?),
        StorageBackendKind::Memory => Box::new(MemoryBackend::new()),
    };

    tracing::info!("Using session storage: {}", backend.describe());
    Ok(backend)
}
