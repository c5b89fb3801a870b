//! End-to-end tests for the `kfupm-chat` binary

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: [&str; 7] = [
    "KFUPM_CHAT_ENV",
    "KFUPM_CHAT_BASE_URL",
    "KFUPM_CHAT_API_KEY",
    "KFUPM_CHAT_STORAGE_BACKEND",
    "KFUPM_CHAT_STORAGE_PATH",
    "KFUPM_CHAT_TYPING_DELAY_MS",
    "KFUPM_CHAT_SEARCH",
];

/// Binary pointed at a missing config file and a storage file in `dir`
fn kfupm_chat(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kfupm-chat").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1")
        .arg("--config")
        .arg(dir.join("missing.yaml"))
        .arg("--storage-path")
        .arg(dir.join("local_storage.json"));
    cmd
}

#[test]
fn test_render_from_stdin() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path())
        .arg("render")
        .write_stdin("## Hours\nOpen **daily**\n\n- one\n- two\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<h2>Hours</h2><p>Open <strong>daily</strong></p><ul><li>one</li><li>two</li></ul>",
        ));
}

#[test]
fn test_render_from_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("answer.md");
    std::fs::write(&input, "Use `<b>` tags").unwrap();

    kfupm_chat(dir.path())
        .arg("render")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("<code>&lt;b&gt;</code>"));
}

#[test]
fn test_render_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path())
        .arg("render")
        .arg(dir.path().join("absent.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_sessions_list_on_empty_store() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path())
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversations found."));

    // Listing does not create anything
    assert!(!dir.path().join("local_storage.json").exists());
}

#[test]
fn test_sessions_new_list_and_delete() {
    let dir = TempDir::new().unwrap();

    let output = kfupm_chat(dir.path())
        .args(["sessions", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created session"))
        .get_output()
        .stdout
        .clone();
    let id = String::from_utf8(output)
        .unwrap()
        .trim()
        .rsplit(' ')
        .next()
        .unwrap()
        .to_string();

    kfupm_chat(dir.path())
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("New Conversation"));

    kfupm_chat(dir.path())
        .args(["sessions", "show", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no messages)"));

    kfupm_chat(dir.path())
        .args(["sessions", "delete", id.as_str(), "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted session {}", id)));
}

#[test]
fn test_sessions_list_marks_session_chat_would_resume() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path()).args(["sessions", "new"]).assert().success();
    kfupm_chat(dir.path()).args(["sessions", "new"]).assert().success();

    let store = common::local_store(dir.path());
    let ids: Vec<String> = store.list().map(|s| s.id.clone()).collect();
    assert_eq!(ids.len(), 2);

    kfupm_chat(dir.path())
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{} *", ids[1])))
        .stdout(predicate::str::contains(format!("{} *", ids[0])).not());
}

#[test]
fn test_sessions_delete_declined_on_stdin() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path()).args(["sessions", "new"]).assert().success();

    let id = common::local_store(dir.path())
        .active_id()
        .unwrap()
        .to_string();

    kfupm_chat(dir.path())
        .args(["sessions", "delete", id.as_str()])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Delete this conversation?"))
        .stdout(predicate::str::contains("Cancelled."));

    assert!(common::local_store(dir.path()).get(&id).is_some());
}

#[test]
fn test_sessions_show_unknown_id_fails() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path())
        .args(["sessions", "show", "123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown session: 123"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (dir, config_path) = common::temp_config_file(
        r#"
chat:
  max_message_chars: 0
"#,
    );

    let mut cmd = Command::cargo_bin("kfupm-chat").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("--storage-path")
        .arg(dir.path().join("local_storage.json"))
        .args(["sessions", "list"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_ask_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    kfupm_chat(dir.path())
        .args(["ask", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing credentials"));
}

#[test]
fn test_ask_rejects_overlong_message() {
    let dir = TempDir::new().unwrap();
    let message = "x".repeat(2001);
    kfupm_chat(dir.path())
        .env("KFUPM_CHAT_API_KEY", "test-key")
        .args(["ask", message.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Message too long (max 2000 characters)",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_prints_reply_and_records_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reply": "KFUPM is in **Dhahran**.",
            "sources": [{"title": "About", "url": "https://www.kfupm.edu.sa/about"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dir_path = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        kfupm_chat(&dir_path)
            .env("KFUPM_CHAT_BASE_URL", uri)
            .env("KFUPM_CHAT_API_KEY", "test-key")
            .args(["ask", "Where is KFUPM?"])
            .assert()
            .success()
            .stdout(predicate::str::contains("KFUPM is in Dhahran."))
            .stdout(predicate::str::contains(
                "[1] About https://www.kfupm.edu.sa/about",
            ));
    })
    .await
    .unwrap();

    let store = common::local_store(dir.path());
    let session = store.active().unwrap();
    assert_eq!(session.title, "Where is KFUPM?");
    assert_eq!(session.messages.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Index offline"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dir_path = dir.path().to_path_buf();
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        kfupm_chat(&dir_path)
            .env("KFUPM_CHAT_BASE_URL", uri)
            .env("KFUPM_CHAT_API_KEY", "test-key")
            .args(["ask", "Hello"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Index offline"));
    })
    .await
    .unwrap();
}
