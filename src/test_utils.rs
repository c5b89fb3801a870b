//! Test utilities for kfupm-chat
//!
//! This module provides a recording [`ChatView`], a scripted
//! [`ChatService`], and temporary directory helpers.

use crate::client::{ChatReply, ChatRequest, ChatService, FeedbackRequest};
use crate::config::Config;
use crate::conversation::{ChatView, Rating, RenderedReply, SessionSummary, StatusKind};
use crate::error::{ChatError, Result};
use crate::session::Source;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Assert that an error's message contains the expected string
///
/// # Panics
///
/// Panics if the result is Ok or if the error message doesn't contain the
/// expected string
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                msg,
                expected
            );
        }
    }
}

/// Config pointing at a throwaway local-storage file
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.path = Some(dir.path().join("local_storage.json"));
    config.api.api_key = Some("test-key".to_string());
    config.chat.typing_delay_ms = 0;
    config
}

/// Everything a [`RecordingView`] was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Cleared,
    Welcome,
    User(String),
    Assistant(RenderedReply),
    Loading(bool),
    Error(String),
    Status(String, StatusKind),
    Input(bool),
    InputCleared,
    RatingDisabled(String, Rating),
    Sessions(Vec<SessionSummary>),
    Search(bool),
}

/// [`ChatView`] that records calls instead of drawing
#[derive(Debug)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    input_enabled: AtomicBool,
}

impl Default for RecordingView {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            input_enabled: AtomicBool::new(true),
        }
    }
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Forget recorded events
    pub fn reset(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled.load(Ordering::SeqCst)
    }

    pub fn last_reply(&self) -> Option<RenderedReply> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Assistant(reply) => Some(reply),
            _ => None,
        })
    }

    pub fn disabled_ratings(&self) -> Vec<(String, Rating)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::RatingDisabled(id, rating) => Some((id, rating)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChatView for RecordingView {
    fn clear_messages(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn show_welcome(&self) {
        self.push(ViewEvent::Welcome);
    }

    fn show_user_message(&self, text: &str) {
        self.push(ViewEvent::User(text.to_string()));
    }

    fn show_assistant_message(&self, reply: &RenderedReply) {
        self.push(ViewEvent::Assistant(reply.clone()));
    }

    fn show_loading(&self) {
        self.push(ViewEvent::Loading(true));
    }

    fn hide_loading(&self) {
        self.push(ViewEvent::Loading(false));
    }

    fn show_error(&self, reason: &str) {
        self.push(ViewEvent::Error(reason.to_string()));
    }

    fn set_status(&self, text: &str, kind: StatusKind) {
        self.push(ViewEvent::Status(text.to_string(), kind));
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.input_enabled.store(enabled, Ordering::SeqCst);
        self.push(ViewEvent::Input(enabled));
    }

    fn clear_input(&self) {
        self.push(ViewEvent::InputCleared);
    }

    fn disable_rating(&self, message_id: &str, chosen: Rating) {
        self.push(ViewEvent::RatingDisabled(message_id.to_string(), chosen));
    }

    fn show_sessions(&self, sessions: &[SessionSummary]) {
        self.push(ViewEvent::Sessions(sessions.to_vec()));
    }

    fn show_search_state(&self, enabled: bool) {
        self.push(ViewEvent::Search(enabled));
    }
}

enum Script {
    Reply(ChatReply),
    Server { status: u16, message: String },
}

/// [`ChatService`] with a canned answer
///
/// A gated service parks every chat call until [`release`](Self::release)
/// is called, which lets tests observe the in-flight state.
pub struct ScriptedService {
    script: Script,
    gate: Option<Semaphore>,
    called: Notify,
    fail_feedback: bool,
    chat_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    feedback: Mutex<Vec<FeedbackRequest>>,
}

impl ScriptedService {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            gate: None,
            called: Notify::new(),
            fail_feedback: false,
            chat_calls: AtomicUsize::new(0),
            feedback_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::with_script(Script::Reply(ChatReply {
            reply: reply.to_string(),
            sources: Vec::new(),
        }))
    }

    pub fn server_error(status: u16, message: &str) -> Self {
        Self::with_script(Script::Server {
            status,
            message: message.to_string(),
        })
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        if let Script::Reply(reply) = &mut self.script {
            reply.sources = sources;
        }
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_failing_feedback(mut self) -> Self {
        self.fail_feedback = true;
        self
    }

    /// Let one parked chat call complete
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Wait until a chat call has started
    pub async fn wait_for_call(&self) {
        self.called.notified().await;
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn feedback_calls(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn last_feedback(&self) -> Option<FeedbackRequest> {
        self.feedback.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatService for ScriptedService {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.called.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ChatError::Network(e.to_string()))?
                .forget();
        }

        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Server { status, message } => Err(ChatError::Server {
                status: *status,
                message: message.clone(),
            }
            .into()),
        }
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<()> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        self.feedback.lock().unwrap().push(request.clone());
        if self.fail_feedback {
            return Err(ChatError::Feedback("scripted failure".to_string()).into());
        }
        Ok(())
    }
}
