use kfupm_chat::client::HttpChatClient;
use kfupm_chat::config::{ApiConfig, ChatConfig};
use kfupm_chat::conversation::{
    ChatView, Conversation, Rating, RenderedReply, SessionSummary, StatusKind,
};
use kfupm_chat::session::{FallbackOrder, SessionStore};
use kfupm_chat::storage::{LocalStorage, LocalStorageBackend};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[allow(dead_code)]
pub const STORAGE_KEY: &str = "kfupm_sessions";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Store over a local-storage file in `dir`
#[allow(dead_code)]
pub fn local_store(dir: &Path) -> SessionStore {
    let storage = LocalStorage::new(dir.join("local_storage.json"));
    SessionStore::open(
        Box::new(LocalStorageBackend::new(storage, STORAGE_KEY)),
        FallbackOrder::Insertion,
    )
}

/// Conversation over a local-storage file, talking to `base_url`
#[allow(dead_code)]
pub fn http_conversation(dir: &Path, base_url: &str) -> (Arc<Conversation>, Arc<CollectingView>) {
    let api = ApiConfig {
        local_base_url: base_url.to_string(),
        api_key: Some("test-key".to_string()),
        ..ApiConfig::default()
    };
    let client = HttpChatClient::new(&api).expect("failed to build client");
    let view = Arc::new(CollectingView::default());
    let conversation = Arc::new(Conversation::new(
        local_store(dir),
        Arc::new(client),
        view.clone(),
        &ChatConfig::default(),
    ));
    (conversation, view)
}

/// View that keeps what the integration tests look at
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct CollectingView {
    replies: Mutex<Vec<RenderedReply>>,
    errors: Mutex<Vec<String>>,
    statuses: Mutex<Vec<(String, StatusKind)>>,
    disabled: Mutex<Vec<(String, Rating)>>,
    input: Mutex<Vec<bool>>,
}

#[allow(dead_code)]
impl CollectingView {
    pub fn replies(&self) -> Vec<RenderedReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, StatusKind)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn disabled(&self) -> Vec<(String, Rating)> {
        self.disabled.lock().unwrap().clone()
    }

    /// Whether the last input toggle left the input enabled
    pub fn input_enabled(&self) -> bool {
        self.input.lock().unwrap().last().copied().unwrap_or(true)
    }
}

impl ChatView for CollectingView {
    fn clear_messages(&self) {}

    fn show_welcome(&self) {}

    fn show_user_message(&self, _text: &str) {}

    fn show_assistant_message(&self, reply: &RenderedReply) {
        self.replies.lock().unwrap().push(reply.clone());
    }

    fn show_loading(&self) {}

    fn hide_loading(&self) {}

    fn show_error(&self, reason: &str) {
        self.errors.lock().unwrap().push(reason.to_string());
    }

    fn set_status(&self, text: &str, kind: StatusKind) {
        self.statuses.lock().unwrap().push((text.to_string(), kind));
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.input.lock().unwrap().push(enabled);
    }

    fn clear_input(&self) {}

    fn disable_rating(&self, message_id: &str, chosen: Rating) {
        self.disabled
            .lock()
            .unwrap()
            .push((message_id.to_string(), chosen));
    }

    fn show_sessions(&self, _sessions: &[SessionSummary]) {}

    fn show_search_state(&self, _enabled: bool) {}
}
