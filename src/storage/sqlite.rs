use crate::error::{ChatError, Result};
use crate::session::{Session, SessionMap};
use crate::storage::SessionBackend;
use anyhow::Context;
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// SQLite session backend
///
/// One row per session, keyed by id. Rows are returned in rowid order,
/// and an upsert of an existing id updates the row in place, so the
/// insertion order survives updates.
pub struct SqliteBackend {
    db_path: PathBuf,
}

impl SqliteBackend {
    /// Create a backend that uses the specified database path
    ///
    /// The parent directory is created if needed and the schema is
    /// initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::storage::{SessionBackend, SqliteBackend};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let backend = SqliteBackend::new_with_path(dir.path().join("sessions.db")).unwrap();
    /// assert!(backend.load_all().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create parent directory for database")
                    .map_err(|e| ChatError::Persistence(e.to_string()))?;
            }
        }

        let backend = Self { db_path };
        backend.init()?;
        Ok(backend)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ChatError::Persistence(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data JSON NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| ChatError::Persistence(e.to_string()))?;

        Ok(())
    }
}

impl SessionBackend for SqliteBackend {
    fn load_all(&self) -> Result<SessionMap> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare("SELECT id, data FROM sessions ORDER BY rowid ASC")
            .context("Failed to prepare statement")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let data: String = row.get(1)?;
                Ok((id, data))
            })
            .context("Failed to query sessions")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        let mut map = SessionMap::new();
        for row in rows {
            let (id, data) = row
                .context("Failed to read session row")
                .map_err(|e| ChatError::Persistence(e.to_string()))?;
            let mut session: Session = serde_json::from_str(&data)
                .context("Failed to deserialize session")
                .map_err(|e| ChatError::Persistence(e.to_string()))?;
            session.id = id;
            map.insert(session);
        }

        Ok(map)
    }

    fn upsert(&mut self, session: &Session) -> Result<()> {
        let conn = self.open()?;

        let data = serde_json::to_string(session)
            .context("Failed to serialize session")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;

        conn.execute(
            "INSERT INTO sessions (id, title, created_at, updated_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at,
                data = excluded.data",
            params![
                session.id,
                session.title,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
                data
            ],
        )
        .context("Failed to upsert session")
        .map_err(|e| ChatError::Persistence(e.to_string()))?;

        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM sessions WHERE id = ?", params![id])
            .context("Failed to delete session")
            .map_err(|e| ChatError::Persistence(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite {}", self.db_path.display())
    }
}
