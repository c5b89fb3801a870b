use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Title given to every session until its first exchange completes
pub const PLACEHOLDER_TITLE: &str = "New Conversation";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person using the client
    User,
    /// Returned by the chat service
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A titled hyperlink cited alongside an assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Human-readable link text
    pub title: String,
    /// Target URL
    pub url: String,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub role: Role,
    /// Raw text (markdown for assistant messages)
    pub content: String,
    /// Cited sources, empty for user messages
    #[serde(default)]
    pub sources: Vec<Source>,
    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a user message stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::session::{Message, Role};
    ///
    /// let msg = Message::user("What programs does the university offer?");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.sources.is_empty());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates an assistant message carrying its cited sources
    pub fn assistant(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
            timestamp: Utc::now(),
        }
    }
}

/// A persisted conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier, derived from the creation time in milliseconds
    pub id: String,
    /// Display title
    pub title: String,
    /// Messages in insertion order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time, never earlier than `created_at`
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session with the placeholder title
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: PLACEHOLDER_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the title has not been assigned from a first exchange yet
    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }

    /// Bumps `updated_at`, keeping it at or after `created_at`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Most recent message authored by the user, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }
}

/// Ordered mapping from session id to session
///
/// Iteration order is insertion order. On the wire it is a JSON object
/// keyed by session id whose key order is the insertion order, which is
/// the layout the browser store used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMap {
    sessions: Vec<Session>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Inserts a session, replacing an existing entry in place
    ///
    /// A replaced entry keeps its original position.
    pub fn insert(&mut self, session: Session) {
        match self.position(&session.id) {
            Some(idx) => self.sessions[idx] = session,
            None => self.sessions.push(session),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.position(id).map(|idx| self.sessions.remove(idx))
    }

    /// Sessions in insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Session> {
        self.sessions.iter()
    }

    /// Session ids in insertion order
    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.id.clone()).collect()
    }

    /// The last-inserted session
    pub fn last_inserted(&self) -> Option<&Session> {
        self.sessions.last()
    }

    /// The session with the latest `updated_at`; ties go to the later insert
    pub fn last_updated(&self) -> Option<&Session> {
        self.sessions.iter().max_by_key(|s| s.updated_at)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }
}

impl Serialize for SessionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sessions.len()))?;
        for session in &self.sessions {
            map.serialize_entry(&session.id, session)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SessionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SessionMapVisitor;

        impl<'de> Visitor<'de> for SessionMapVisitor {
            type Value = SessionMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of session id to session")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<SessionMap, A::Error> {
                let mut map = SessionMap::new();
                while let Some((key, mut session)) = access.next_entry::<String, Session>()? {
                    // The key is authoritative.
                    session.id = key;
                    map.insert(session);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(SessionMapVisitor)
    }
}

/// First `max_chars` characters of `text`, used for session titles
pub fn truncate_title(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Sidebar-style label for how long ago a session was updated
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use kfupm_chat::session::format_session_time;
///
/// let now = Utc::now();
/// assert_eq!(format_session_time(now, now), "Just now");
/// assert_eq!(format_session_time(now - Duration::minutes(5), now), "5m ago");
/// ```
pub fn format_session_time(updated: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - updated;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        updated.format("%Y-%m-%d").to_string()
    }
}
