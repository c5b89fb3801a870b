//! Conversation controller
//!
//! Validates user input, forwards it to the chat service, renders the
//! outcome through the markdown converter into a [`ChatView`], and records
//! both sides of the exchange in the [`SessionStore`].
//!
//! At most one send is outstanding at a time. The controller is shared
//! through an `Arc`; the store lock is never held across an await.

use crate::client::{ChatRequest, ChatService, FeedbackRequest, GENERIC_SERVER_ERROR};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::markdown;
use crate::session::{Confirm, DeleteOutcome, Message, Role, SessionStore, Source};

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod feedback;
pub mod view;

pub use feedback::{generate_message_id, FeedbackLedger, RatingRefused, RatingState};
pub use view::{
    number_sources, summarize_sessions, ChatView, NumberedSource, Rating, RenderedReply,
    SessionSummary, StatusKind,
};

/// Status text while a request is outstanding
pub const STATUS_PROCESSING: &str = "Processing...";
/// Status text after a failed exchange
pub const STATUS_ERROR: &str = "Error occurred";

/// What happened to a [`Conversation::send`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input or another send in flight; nothing happened
    Ignored,
    /// Input failed validation; no request was made
    Rejected(String),
    /// The reply was rendered and recorded
    Replied { message_id: String },
    /// The request failed; the reason was shown in an error block
    Failed(String),
}

/// What happened to a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Accepted by the service; controls disabled
    Recorded,
    /// The message is not on display
    UnknownMessage,
    /// The message was already rated or a rating is in flight
    AlreadyRated,
    /// The service rejected it or could not be reached; logged only
    Failed,
}

/// Clears the single-flight flag and re-enables input however the send ends
struct InFlight<'a> {
    flag: &'a AtomicBool,
    view: &'a dyn ChatView,
    input_disabled: bool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, view: &'a dyn ChatView) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag,
                view,
                input_disabled: false,
            })
    }

    fn disable_input(&mut self) {
        self.view.set_input_enabled(false);
        self.input_disabled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.input_disabled {
            self.view.set_input_enabled(true);
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Application state of one chat front-end
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use kfupm_chat::client::HttpChatClient;
/// use kfupm_chat::config::Config;
/// use kfupm_chat::conversation::{ChatView, Conversation};
/// use kfupm_chat::session::SessionStore;
/// use kfupm_chat::storage::open_backend;
///
/// # async fn example(view: Arc<dyn ChatView>) -> anyhow::Result<()> {
/// let config = Config::default();
/// let backend = open_backend(&config.storage)?;
/// let store = SessionStore::open(backend, config.storage.fallback_order);
/// let service = Arc::new(HttpChatClient::new(&config.api)?);
/// let conversation = Arc::new(Conversation::new(store, service, view, &config.chat));
/// conversation.send("When does the semester start?").await;
/// # Ok(())
/// # }
/// ```
pub struct Conversation {
    store: Mutex<SessionStore>,
    service: Arc<dyn ChatService>,
    view: Arc<dyn ChatView>,
    ledger: Mutex<FeedbackLedger>,
    in_flight: AtomicBool,
    search_enabled: AtomicBool,
    max_message_chars: usize,
    title_max_chars: usize,
}

impl Conversation {
    pub fn new(
        store: SessionStore,
        service: Arc<dyn ChatService>,
        view: Arc<dyn ChatView>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            service,
            view,
            ledger: Mutex::new(FeedbackLedger::new()),
            in_flight: AtomicBool::new(false),
            search_enabled: AtomicBool::new(config.search_enabled),
            max_message_chars: config.max_message_chars,
            title_max_chars: config.title_max_chars,
        }
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ledger(&self) -> MutexGuard<'_, FeedbackLedger> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Draw the active session and the sidebar (startup)
    pub fn restore_view(&self) {
        self.view.show_search_state(self.search_enabled());
        self.render_active_session();
        self.refresh_sessions();
    }

    /// Send one user message and wait for the reply
    ///
    /// Empty input and input arriving while another send is outstanding
    /// are ignored. Over-long input is rejected with a status message and
    /// no request. Otherwise the user message is recorded immediately and
    /// exactly one request is made; on success the assistant reply is
    /// recorded too, on failure only an error block is shown.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }

        let Some(mut guard) = InFlight::acquire(&self.in_flight, self.view.as_ref()) else {
            tracing::debug!("Send ignored: request already in flight");
            return SendOutcome::Ignored;
        };

        if message.chars().count() > self.max_message_chars {
            let reason = ChatError::Validation(format!(
                "Message too long (max {} characters)",
                self.max_message_chars
            ))
            .to_string();
            self.view.set_status(&reason, StatusKind::Error);
            return SendOutcome::Rejected(reason);
        }

        self.view.clear_input();
        self.view.show_user_message(message);

        let session_id = {
            let mut store = self.store();
            let id = match store.active_id().map(str::to_string) {
                Some(id) => id,
                None => store.create(),
            };
            store.append_message(&id, Message::user(message));
            id
        };

        self.view.show_loading();
        guard.disable_input();
        self.view.set_status(STATUS_PROCESSING, StatusKind::Info);

        let request = ChatRequest {
            message: message.to_string(),
            use_search: self.search_enabled(),
        };
        tracing::info!(
            session = %session_id,
            use_search = request.use_search,
            "Sending message ({} chars)",
            message.chars().count()
        );

        let result = self.service.chat(&request).await;
        self.view.hide_loading();

        match result {
            Ok(reply) => {
                let rendered = self.render_reply(&reply.reply, &reply.sources);
                self.view.show_assistant_message(&rendered);

                {
                    let mut store = self.store();
                    store.set_title_if_placeholder(&session_id, message, self.title_max_chars);
                    store.append_message(&session_id, Message::assistant(reply.reply, reply.sources));
                }
                self.refresh_sessions();
                self.view.set_status("", StatusKind::Info);

                SendOutcome::Replied {
                    message_id: rendered.message_id,
                }
            }
            Err(e) => {
                let reason = failure_reason(&e);
                tracing::error!("Chat request failed: {:#}", e);
                self.view.show_error(&reason);
                self.view.set_status(STATUS_ERROR, StatusKind::Error);
                SendOutcome::Failed(reason)
            }
        }
    }

    /// Rate an assistant message currently on display
    ///
    /// The paired user message is the most recent user message of the
    /// active session. Failures are logged only.
    pub async fn submit_feedback(&self, message_id: &str, rating: Rating) -> FeedbackOutcome {
        let assistant_text = match self.ledger().begin(message_id, rating) {
            Ok(text) => text,
            Err(RatingRefused::UnknownMessage) => {
                tracing::debug!("Ignoring rating for unknown message {}", message_id);
                return FeedbackOutcome::UnknownMessage;
            }
            Err(RatingRefused::Locked) => return FeedbackOutcome::AlreadyRated,
        };

        let (session_id, user_message) = {
            let store = self.store();
            let active = store.active();
            (
                active.map(|s| s.id.clone()).unwrap_or_default(),
                active
                    .and_then(|s| s.last_user_message())
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
            )
        };

        let request = FeedbackRequest {
            message_id: message_id.to_string(),
            rating: rating.value(),
            user_message,
            assistant_message: assistant_text,
            session_id,
        };

        match self.service.feedback(&request).await {
            Ok(()) => {
                self.ledger().complete(message_id);
                self.view.disable_rating(message_id, rating);
                tracing::info!("Feedback submitted for {} ({})", message_id, rating);
                FeedbackOutcome::Recorded
            }
            Err(e) => {
                self.ledger().abort(message_id);
                tracing::error!("Error submitting feedback: {}", e);
                FeedbackOutcome::Failed
            }
        }
    }

    /// Submit a rating in the background
    pub fn spawn_feedback(
        self: &Arc<Self>,
        message_id: impl Into<String>,
        rating: Rating,
    ) -> tokio::task::JoinHandle<FeedbackOutcome> {
        let conversation = Arc::clone(self);
        let message_id = message_id.into();
        tokio::spawn(async move { conversation.submit_feedback(&message_id, rating).await })
    }

    /// Flip the web-search flag sent with each message
    pub fn toggle_search(&self) -> bool {
        let enabled = !self.search_enabled.fetch_xor(true, Ordering::AcqRel);
        tracing::info!("Search {}", if enabled { "enabled" } else { "disabled" });
        self.view.show_search_state(enabled);
        enabled
    }

    pub fn set_search(&self, enabled: bool) {
        self.search_enabled.store(enabled, Ordering::Release);
        self.view.show_search_state(enabled);
    }

    pub fn search_enabled(&self) -> bool {
        self.search_enabled.load(Ordering::Acquire)
    }

    /// Whether a send is outstanding
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a new empty session and show it
    pub fn new_session(&self) -> String {
        let id = self.store().create();
        self.render_active_session();
        self.refresh_sessions();
        id
    }

    /// Show another session; returns `false` for unknown ids
    pub fn switch_session(&self, id: &str) -> bool {
        if !self.store().switch_to(id) {
            return false;
        }
        self.render_active_session();
        self.refresh_sessions();
        true
    }

    /// Delete a session after confirmation
    pub fn delete_session(&self, id: &str, confirm: &dyn Confirm) -> DeleteOutcome {
        let outcome = self.store().delete(id, confirm);
        if let DeleteOutcome::Deleted { activated, .. } = &outcome {
            if activated.is_some() {
                self.render_active_session();
            }
            self.refresh_sessions();
        }
        outcome
    }

    /// Empty the active session after confirmation
    pub fn clear_session(&self, confirm: &dyn Confirm) -> bool {
        let cleared = {
            let mut store = self.store();
            match store.active_id().map(str::to_string) {
                Some(id) => store.clear(&id, confirm),
                None => false,
            }
        };
        if cleared {
            self.render_active_session();
            self.refresh_sessions();
        }
        cleared
    }

    /// Sidebar entries, most recently created first
    pub fn session_summaries(&self, now: DateTime<Utc>) -> Vec<SessionSummary> {
        let store = self.store();
        summarize_sessions(store.list(), store.active_id(), now)
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.store().active_id().map(str::to_string)
    }

    /// Run `f` against the session store
    pub fn with_store<R>(&self, f: impl FnOnce(&SessionStore) -> R) -> R {
        f(&self.store())
    }

    fn refresh_sessions(&self) {
        let summaries = self.session_summaries(Utc::now());
        self.view.show_sessions(&summaries);
    }

    /// Replay the active session into the view
    fn render_active_session(&self) {
        let messages: Vec<Message> = self
            .store()
            .active()
            .map(|session| session.messages.clone())
            .unwrap_or_default();

        self.ledger().clear();
        self.view.clear_messages();

        if messages.is_empty() {
            self.view.show_welcome();
            return;
        }

        for message in messages {
            match message.role {
                Role::User => self.view.show_user_message(&message.content),
                Role::Assistant => {
                    let rendered = self.render_reply(&message.content, &message.sources);
                    self.view.show_assistant_message(&rendered);
                }
            }
        }
    }

    fn render_reply(&self, content: &str, sources: &[Source]) -> RenderedReply {
        let message_id = generate_message_id();
        self.ledger().register(message_id.clone(), content);
        RenderedReply {
            message_id,
            content: content.to_string(),
            blocks: markdown::parse_blocks(content),
            sources: number_sources(sources),
        }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("store", &*self.store())
            .field("in_flight", &self.is_processing())
            .field("search_enabled", &self.search_enabled())
            .finish()
    }
}

/// Text for the error block of a failed exchange
fn failure_reason(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ChatError>() {
        Some(chat_error) if chat_error.is_user_visible() => chat_error.to_string(),
        _ => GENERIC_SERVER_ERROR.to_string(),
    }
}
