use crate::error::{ChatError, Result};
use crate::session::{Session, SessionMap};
use crate::storage::SessionBackend;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-process session backend
///
/// Clones share the same underlying map, so a test can keep a handle to
/// inspect what was persisted. Writes can be made to fail on demand with
/// [`set_fail_writes`](Self::set_fail_writes).
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    sessions: Arc<Mutex<SessionMap>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing mapping
    pub fn with_sessions(sessions: SessionMap) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Copy of the currently persisted mapping
    pub fn snapshot(&self) -> SessionMap {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent upsert/remove fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChatError::Persistence("memory backend is read-only".to_string()).into());
        }
        Ok(())
    }
}

impl SessionBackend for MemoryBackend {
    fn load_all(&self) -> Result<SessionMap> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .map_err(|_| ChatError::Persistence("memory backend lock poisoned".to_string()).into())
    }

    fn upsert(&mut self, session: &Session) -> Result<()> {
        self.check_writable()?;
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ChatError::Persistence("memory backend lock poisoned".to_string()))?;
        sessions.insert(session.clone());
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        self.check_writable()?;
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ChatError::Persistence("memory backend lock poisoned".to_string()))?;
        sessions.remove(id);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory (not persisted)".to_string()
    }
}
