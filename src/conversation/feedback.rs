use super::view::Rating;
use rand::Rng;
use std::collections::HashMap;

/// Generate a display id for an assistant message
///
/// Format: `msg_<unix millis>_<9 lowercase base36 chars>`.
pub fn generate_message_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("msg_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Rating state of one rendered assistant message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingState {
    /// Controls enabled
    Open,
    /// A submission is outstanding
    Pending(Rating),
    /// Controls disabled; `Rating` is the one marked active
    Rated(Rating),
}

#[derive(Debug, Clone)]
struct Entry {
    assistant_text: String,
    state: RatingState,
}

/// Why a rating could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingRefused {
    UnknownMessage,
    /// Controls already disabled or a submission is in flight
    Locked,
}

/// Rating controls of the assistant messages currently on display
///
/// Keyed by display id. Replaying a session clears the ledger, so ids of
/// messages no longer shown stop accepting ratings.
#[derive(Debug, Default)]
pub struct FeedbackLedger {
    entries: HashMap<String, Entry>,
}

impl FeedbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly rendered assistant message
    pub fn register(&mut self, message_id: impl Into<String>, assistant_text: impl Into<String>) {
        self.entries.insert(
            message_id.into(),
            Entry {
                assistant_text: assistant_text.into(),
                state: RatingState::Open,
            },
        );
    }

    /// Lock the controls for a submission and return the assistant text
    pub fn begin(&mut self, message_id: &str, rating: Rating) -> Result<String, RatingRefused> {
        let entry = self
            .entries
            .get_mut(message_id)
            .ok_or(RatingRefused::UnknownMessage)?;
        if entry.state != RatingState::Open {
            return Err(RatingRefused::Locked);
        }
        entry.state = RatingState::Pending(rating);
        Ok(entry.assistant_text.clone())
    }

    /// Submission accepted: controls stay disabled
    pub fn complete(&mut self, message_id: &str) {
        if let Some(entry) = self.entries.get_mut(message_id) {
            if let RatingState::Pending(rating) = entry.state {
                entry.state = RatingState::Rated(rating);
            }
        }
    }

    /// Submission failed: controls become usable again
    pub fn abort(&mut self, message_id: &str) {
        if let Some(entry) = self.entries.get_mut(message_id) {
            if matches!(entry.state, RatingState::Pending(_)) {
                entry.state = RatingState::Open;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn state(&self, message_id: &str) -> Option<&RatingState> {
        self.entries.get(message_id).map(|entry| &entry.state)
    }
}
