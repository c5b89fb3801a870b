//! Display surface of the conversation
//!
//! The controller never draws anything itself; it drives a [`ChatView`].
//! The terminal front-end implements it in `commands::terminal_view`; tests
//! use a recording implementation.

use crate::markdown::Block;
use crate::session::{format_session_time, Session, Source};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Thumbs up or down on an assistant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    Up,
    Down,
}

impl Rating {
    /// Wire value: +1 or -1
    pub fn value(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Parse "up"/"down" (or "+1"/"-1")
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "+1" | "1" | "👍" => Some(Self::Up),
            "down" | "-1" | "👎" => Some(Self::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A source as displayed: 1-based position in the deduplicated list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedSource {
    pub number: usize,
    pub title: String,
    pub url: String,
}

/// Number sources for display, dropping repeated URLs
///
/// The first occurrence of a URL keeps its place; numbering is contiguous.
///
/// # Examples
///
/// ```
/// use kfupm_chat::conversation::number_sources;
/// use kfupm_chat::session::Source;
///
/// let numbered = number_sources(&[
///     Source::new("Catalog", "https://example.edu/catalog"),
///     Source::new("Catalog again", "https://example.edu/catalog"),
///     Source::new("Calendar", "https://example.edu/calendar"),
/// ]);
/// assert_eq!(numbered.len(), 2);
/// assert_eq!(numbered[1].number, 2);
/// assert_eq!(numbered[1].title, "Calendar");
/// ```
pub fn number_sources(sources: &[Source]) -> Vec<NumberedSource> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|source| seen.insert(source.url.as_str()))
        .enumerate()
        .map(|(index, source)| NumberedSource {
            number: index + 1,
            title: source.title.clone(),
            url: source.url.clone(),
        })
        .collect()
}

/// An assistant message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    /// Display id used to address the rating controls
    pub message_id: String,
    /// Raw reply text
    pub content: String,
    /// Reply after the markdown block pass
    pub blocks: Vec<Block>,
    pub sources: Vec<NumberedSource>,
}

/// One sidebar entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    /// "Just now", "5m ago", ... or a date
    pub time_label: String,
    pub message_count: usize,
    pub active: bool,
}

/// Sidebar entries for `sessions`, most recently created first
///
/// `sessions` must yield in insertion order.
pub fn summarize_sessions<'a>(
    sessions: impl DoubleEndedIterator<Item = &'a Session>,
    active: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<SessionSummary> {
    sessions
        .rev()
        .map(|session| SessionSummary {
            id: session.id.clone(),
            title: session.title.clone(),
            time_label: format_session_time(session.updated_at, now),
            message_count: session.messages.len(),
            active: active == Some(session.id.as_str()),
        })
        .collect()
}

/// Display surface driven by the conversation controller
///
/// Methods take `&self`; implementations use interior mutability. They are
/// called from async code and must not block.
pub trait ChatView: Send + Sync {
    /// Remove every rendered message (before a history replay)
    fn clear_messages(&self);

    /// Greeting shown for an empty session
    fn show_welcome(&self);

    /// User text, shown verbatim
    fn show_user_message(&self, text: &str);

    /// Assistant reply with its rating controls
    fn show_assistant_message(&self, reply: &RenderedReply);

    /// Transient indicator while a request is outstanding
    fn show_loading(&self);

    fn hide_loading(&self);

    /// Error block for a failed exchange
    fn show_error(&self, reason: &str);

    /// Status line; an empty `text` clears it
    fn set_status(&self, text: &str, kind: StatusKind);

    /// Enable or disable the input controls
    fn set_input_enabled(&self, enabled: bool);

    fn clear_input(&self);

    /// Disable both rating controls of one message and mark the chosen one
    fn disable_rating(&self, message_id: &str, chosen: Rating);

    /// Sidebar refresh
    fn show_sessions(&self, sessions: &[SessionSummary]);

    fn show_search_state(&self, enabled: bool);
}
