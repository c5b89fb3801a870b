//! Integration tests for session persistence
//!
//! Exercises the session store against the file-backed backends: reopening
//! a store must yield the same mapping, in the same order.

mod common;

use kfupm_chat::config::{StorageBackendKind, StorageConfig};
use kfupm_chat::session::{AssumeYes, DeleteOutcome, FallbackOrder, Message, SessionStore, Source};
use kfupm_chat::storage::{open_backend, LocalStorage, SessionBackend, SqliteBackend};
use std::path::Path;
use tempfile::TempDir;

fn sqlite_store(dir: &Path, fallback: FallbackOrder) -> SessionStore {
    let backend = SqliteBackend::new_with_path(dir.join("sessions.db")).expect("open sqlite");
    SessionStore::open(Box::new(backend), fallback)
}

/// Three sessions; the first one gets a full exchange after the others exist
fn populate(store: &mut SessionStore) -> Vec<String> {
    let first = store.active_id().expect("fresh store has a session").to_string();
    let second = store.create();
    let third = store.create();

    store.append_message(&first, Message::user("Where is the library?"));
    store.set_title_if_placeholder(&first, "Where is the library?", 50);
    store.append_message(
        &first,
        Message::assistant(
            "Building 8.",
            vec![Source::new("Library", "https://library.kfupm.edu.sa")],
        ),
    );

    vec![first, second, third]
}

fn ids(store: &SessionStore) -> Vec<String> {
    store.list().map(|s| s.id.clone()).collect()
}

#[test]
fn test_local_storage_round_trip_keeps_order_and_content() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = common::local_store(dir.path());
    let created = populate(&mut store);
    let before = store.sessions().clone();

    let reopened = common::local_store(dir.path());
    assert_eq!(ids(&reopened), created);
    assert_eq!(reopened.sessions(), &before);

    let first = reopened.get(&created[0]).expect("first session");
    assert_eq!(first.title, "Where is the library?");
    assert_eq!(first.messages[1].sources[0].url, "https://library.kfupm.edu.sa");
}

#[test]
fn test_sqlite_round_trip_keeps_order_and_content() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = sqlite_store(dir.path(), FallbackOrder::Insertion);
    let created = populate(&mut store);
    let before = store.sessions().clone();

    let reopened = sqlite_store(dir.path(), FallbackOrder::Insertion);
    assert_eq!(ids(&reopened), created);
    assert_eq!(reopened.sessions(), &before);
}

#[test]
fn test_reopen_activates_most_recent_by_configured_order() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = sqlite_store(dir.path(), FallbackOrder::Insertion);
    let created = populate(&mut store);

    let by_insertion = sqlite_store(dir.path(), FallbackOrder::Insertion);
    assert_eq!(by_insertion.active_id(), Some(created[2].as_str()));

    // The first session was updated last
    let by_activity = sqlite_store(dir.path(), FallbackOrder::LastUpdated);
    assert_eq!(by_activity.active_id(), Some(created[0].as_str()));
}

#[test]
fn test_local_storage_file_layout() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = common::local_store(dir.path());
    let created = populate(&mut store);

    let storage = LocalStorage::new(dir.path().join("local_storage.json"));
    let raw = storage
        .get_item(common::STORAGE_KEY)
        .expect("readable file")
        .expect("sessions key present");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("mapping is JSON");

    let object = value.as_object().expect("mapping is an object");
    let keys: Vec<&String> = object.keys().collect();
    assert_eq!(keys.len(), 3);
    let session = &object[&created[0]];
    assert_eq!(session["id"], created[0].as_str());
    assert_eq!(session["title"], "Where is the library?");
    assert!(session["createdAt"].is_string());
    assert!(session["updatedAt"].is_string());
    assert_eq!(session["messages"][0]["role"], "user");
    assert_eq!(session["messages"][1]["role"], "assistant");
}

#[test]
fn test_deleting_active_session_activates_most_recent_remaining() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = common::local_store(dir.path());
    let created = populate(&mut store);
    assert_eq!(store.active_id(), Some(created[2].as_str()));

    let outcome = store.delete(&created[2], &AssumeYes);
    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            activated: Some(created[1].clone()),
            created: false,
        }
    );
    assert_eq!(store.len(), 2);

    let reopened = common::local_store(dir.path());
    assert_eq!(ids(&reopened), created[..2].to_vec());
}

#[test]
fn test_deleting_only_session_creates_fresh_one() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = sqlite_store(dir.path(), FallbackOrder::Insertion);
    let only = store.active_id().expect("fresh store has a session").to_string();

    match store.delete(&only, &AssumeYes) {
        DeleteOutcome::Deleted {
            activated: Some(fresh),
            created: true,
        } => {
            assert_ne!(fresh, only);
            assert_eq!(store.active_id(), Some(fresh.as_str()));
        }
        other => panic!("Expected a fresh session, got {:?}", other),
    }

    let reopened = sqlite_store(dir.path(), FallbackOrder::Insertion);
    assert_eq!(reopened.len(), 1);
    assert!(reopened.get(&only).is_none());
}

#[test]
fn test_declined_delete_keeps_everything() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let mut store = common::local_store(dir.path());
    let created = populate(&mut store);

    let decline = |_: &str| false;
    assert_eq!(store.delete(&created[0], &decline), DeleteOutcome::Declined);

    let reopened = common::local_store(dir.path());
    assert_eq!(ids(&reopened), created);
}

#[test]
fn test_corrupt_local_storage_starts_fresh() {
    let dir = TempDir::new().expect("failed to create tempdir");
    std::fs::write(
        dir.path().join("local_storage.json"),
        r#"{"kfupm_sessions": "not json at all"}"#,
    )
    .expect("write corrupt file");

    let store = common::local_store(dir.path());
    assert_eq!(store.len(), 1);
    assert!(store.active().expect("fresh session").messages.is_empty());
}

#[test]
fn test_open_backend_from_config() {
    let dir = TempDir::new().expect("failed to create tempdir");
    let config = StorageConfig {
        backend: StorageBackendKind::Sqlite,
        path: Some(dir.path().join("nested").join("sessions.db")),
        ..StorageConfig::default()
    };

    let mut backend = open_backend(&config).expect("open backend");
    assert!(backend.load_all().expect("load").is_empty());

    let mut store = SessionStore::open(open_backend(&config).expect("open"), config.fallback_order);
    let id = store.create();
    backend.remove("missing").expect("removing unknown id is fine");

    let loaded = backend.load_all().expect("load");
    assert!(loaded.get(&id).is_some());
    assert_eq!(loaded.len(), 2);
}
