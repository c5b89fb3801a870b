//! Session store
//!
//! Owns the ordered mapping from session id to conversation state and the
//! active-session pointer. Every mutation is written through a
//! [`SessionBackend`]; write failures are logged and never roll back the
//! in-memory change.

use crate::storage::SessionBackend;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub mod types;
pub use types::{
    format_session_time, truncate_title, Message, Role, Session, SessionMap, Source,
    PLACEHOLDER_TITLE,
};

/// Which remaining session counts as "most recent"
///
/// Used to pick the session activated at startup and after the active
/// session is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackOrder {
    /// The last-inserted session, regardless of activity
    #[default]
    Insertion,
    /// The session with the latest `updated_at`
    LastUpdated,
}

impl FallbackOrder {
    /// The session this order treats as most recent
    pub fn most_recent(self, sessions: &SessionMap) -> Option<&Session> {
        match self {
            Self::Insertion => sessions.last_inserted(),
            Self::LastUpdated => sessions.last_updated(),
        }
    }
}

/// Interactive yes/no confirmation supplied by the front-end
pub trait Confirm {
    /// Ask `prompt`; `true` means proceed
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirmer that approves everything (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Prompt shown before deleting a session
pub const DELETE_PROMPT: &str = "Delete this conversation?";
/// Prompt shown before clearing a session
pub const CLEAR_PROMPT: &str = "Clear this conversation?";

/// Result of [`SessionStore::delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined the confirmation
    Declined,
    /// No session with that id
    NotFound,
    /// The session was removed
    Deleted {
        /// Session that became active because the deleted one was active
        activated: Option<String>,
        /// Whether a fresh session had to be created
        created: bool,
    },
}

/// Mapping of session id to session, plus the active-session pointer
pub struct SessionStore {
    sessions: SessionMap,
    active: Option<String>,
    backend: Box<dyn SessionBackend>,
    fallback: FallbackOrder,
    last_issued_ms: i64,
    synced: bool,
    /// Writes that failed and are retried before the next one
    pending: Vec<PendingWrite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingWrite {
    Upsert(String),
    Remove(String),
}

impl PendingWrite {
    fn session_id(&self) -> &str {
        match self {
            Self::Upsert(id) | Self::Remove(id) => id,
        }
    }
}

impl SessionStore {
    /// Load the store from `backend` and pick the active session
    ///
    /// If the backend holds no sessions a fresh one is created; otherwise
    /// the most recent session under `fallback` becomes active.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::session::{FallbackOrder, SessionStore};
    /// use kfupm_chat::storage::MemoryBackend;
    ///
    /// let store = SessionStore::open(Box::new(MemoryBackend::new()), FallbackOrder::Insertion);
    /// assert_eq!(store.len(), 1);
    /// assert!(store.active().unwrap().messages.is_empty());
    /// ```
    pub fn open(backend: Box<dyn SessionBackend>, fallback: FallbackOrder) -> Self {
        let mut store = Self {
            sessions: SessionMap::new(),
            active: None,
            backend,
            fallback,
            last_issued_ms: 0,
            synced: true,
            pending: Vec::new(),
        };
        store.load();

        match store.most_recent_id() {
            Some(id) => {
                store.active = Some(id);
            }
            None => {
                store.create();
            }
        }

        store
    }

    /// Replace the in-memory mapping with what the backend holds
    ///
    /// On failure the mapping resets to empty; the failure is logged only.
    pub fn load(&mut self) {
        self.sessions = match self.backend.load_all() {
            Ok(sessions) => {
                tracing::debug!(
                    "Loaded {} sessions from {}",
                    sessions.len(),
                    self.backend.describe()
                );
                sessions
            }
            Err(e) => {
                tracing::error!("Failed to load sessions: {}", e);
                SessionMap::new()
            }
        };

        if let Some(active) = &self.active {
            if !self.sessions.contains(active) {
                self.active = None;
            }
        }
    }

    /// Create an empty session, make it active and return its id
    pub fn create(&mut self) -> String {
        let now = Utc::now();
        let id = self.allocate_id(now.timestamp_millis());
        self.sessions.insert(Session::new(id.clone(), now));
        self.persist(&id);
        self.active = Some(id.clone());
        tracing::debug!("Created session {}", id);
        id
    }

    /// Make `id` the active session; returns `false` if it does not exist
    pub fn switch_to(&mut self, id: &str) -> bool {
        if !self.sessions.contains(id) {
            tracing::debug!("Ignoring switch to unknown session {}", id);
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    /// Delete a session after interactive confirmation
    ///
    /// If the deleted session was active, the most recent remaining one is
    /// activated, or a new session is created when none remain.
    pub fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> DeleteOutcome {
        if !self.sessions.contains(id) {
            return DeleteOutcome::NotFound;
        }
        if !confirm.confirm(DELETE_PROMPT) {
            return DeleteOutcome::Declined;
        }

        self.sessions.remove(id);
        self.queue(PendingWrite::Remove(id.to_string()));
        self.flush();
        tracing::debug!("Deleted session {}", id);

        if self.active.as_deref() != Some(id) {
            return DeleteOutcome::Deleted {
                activated: None,
                created: false,
            };
        }

        match self.most_recent_id() {
            Some(next) => {
                self.active = Some(next.clone());
                DeleteOutcome::Deleted {
                    activated: Some(next),
                    created: false,
                }
            }
            None => {
                let fresh = self.create();
                DeleteOutcome::Deleted {
                    activated: Some(fresh),
                    created: true,
                }
            }
        }
    }

    /// Append a message to a session and persist it
    ///
    /// Returns `false` if the session does not exist.
    pub fn append_message(&mut self, session_id: &str, message: Message) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::warn!("Dropping message for unknown session {}", session_id);
            return false;
        };
        session.messages.push(message);
        session.touch(Utc::now());
        self.persist(session_id);
        true
    }

    /// Empty a session and reset its title after interactive confirmation
    ///
    /// Returns `true` if the session was cleared.
    pub fn clear(&mut self, session_id: &str, confirm: &dyn Confirm) -> bool {
        if !self.sessions.contains(session_id) || !confirm.confirm(CLEAR_PROMPT) {
            return false;
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.messages.clear();
            session.title = PLACEHOLDER_TITLE.to_string();
            session.touch(Utc::now());
        }
        self.persist(session_id);
        true
    }

    /// Title the session from `text` while it still has the placeholder
    ///
    /// Returns `true` if the title changed.
    pub fn set_title_if_placeholder(
        &mut self,
        session_id: &str,
        text: &str,
        max_chars: usize,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        if !session.has_placeholder_title() {
            return false;
        }
        session.title = truncate_title(text, max_chars);
        session.touch(Utc::now());
        self.persist(session_id);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// The active session
    pub fn active(&self) -> Option<&Session> {
        self.active.as_deref().and_then(|id| self.sessions.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Sessions in insertion order
    pub fn list(&self) -> impl DoubleEndedIterator<Item = &Session> {
        self.sessions.iter()
    }

    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn fallback_order(&self) -> FallbackOrder {
        self.fallback
    }

    /// Whether every mutation so far has reached the backend
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn most_recent_id(&self) -> Option<String> {
        self.fallback
            .most_recent(&self.sessions)
            .map(|s| s.id.clone())
    }

    /// Millisecond timestamp id, bumped past any id already issued or stored
    fn allocate_id(&mut self, now_ms: i64) -> String {
        let mut candidate = now_ms.max(self.last_issued_ms + 1);
        while self.sessions.contains(&candidate.to_string()) {
            candidate += 1;
        }
        self.last_issued_ms = candidate;
        candidate.to_string()
    }

    fn persist(&mut self, session_id: &str) {
        if !self.sessions.contains(session_id) {
            return;
        }
        self.queue(PendingWrite::Upsert(session_id.to_string()));
        self.flush();
    }

    /// Queue a write, superseding any queued write for the same session
    fn queue(&mut self, write: PendingWrite) {
        self.pending
            .retain(|queued| queued.session_id() != write.session_id());
        self.pending.push(write);
    }

    /// Apply queued writes in order, keeping the ones that fail
    ///
    /// A failed write stays queued, so a later successful save cannot
    /// leave the backend behind the in-memory mapping.
    fn flush(&mut self) {
        let mut failed = Vec::new();
        for write in std::mem::take(&mut self.pending) {
            let result = match &write {
                PendingWrite::Upsert(id) => match self.sessions.get(id) {
                    Some(session) => self.backend.upsert(session),
                    None => continue,
                },
                PendingWrite::Remove(id) => self.backend.remove(id),
            };
            if let Err(e) = result {
                tracing::error!("Failed to save sessions: {}", e);
                failed.push(write);
            }
        }
        self.synced = failed.is_empty();
        self.pending = failed;
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("active", &self.active)
            .field("backend", &self.backend.describe())
            .field("fallback", &self.fallback)
            .field("synced", &self.synced)
            .field("pending", &self.pending.len())
            .finish()
    }
}
