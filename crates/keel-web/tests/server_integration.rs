//! Integration tests for the keel-web server.
//!
//! These tests start a real axum server on a random port, backed by a
//! scripted provider, and exercise the REST endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use keel::chat::ChatService;
use keel::provider::{ProviderChunk, ScriptedProvider};
use keel::registry::ModelRegistry;
use keel::store::{ConversationStore, InMemoryStore};
use keel::{ChatConfig, Message, MessageRole};
use keel_web::{WebConfig, spawn_web};

struct TestServer {
    base: String,
    store: Arc<InMemoryStore>,
}

/// Helper: spawn a test server on port 0 (random available port).
async fn spawn_test_server(provider: ScriptedProvider, static_dir: Option<PathBuf>) -> TestServer {
    let store = Arc::new(InMemoryStore::new());
    let registry =
        ModelRegistry::new("test").register("test", "Test Model", "scripted", Arc::new(provider));
    let chat = ChatService::new(store.clone(), registry, ChatConfig::default());

    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        static_dir,
    };
    let addr = spawn_web(Arc::new(chat), config).await.unwrap();
    TestServer {
        base: format!("http://{addr}"),
        store,
    }
}

async fn post(base: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

/// Parse `data:` frames out of an SSE body.
fn sse_frames(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

// ── Models ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_models_lists_registry() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;

    let resp = reqwest::get(format!("{}/api/models", server.base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["default"], "test");
    assert_eq!(json["models"]["test"]["name"], "Test Model");
    assert_eq!(json["models"]["test"]["backend"], "scripted");
}

// ── Chat ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_streams_content_and_records_reply() {
    let server = spawn_test_server(ScriptedProvider::new().reply("Hello world"), None).await;

    let resp = post(
        &server.base,
        "/api/chat",
        serde_json::json!({"message": "hi", "session_id": "s1"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let frames = sse_frames(&resp.text().await.unwrap());
    let text: String = frames
        .iter()
        .map(|f| f["content"].as_str().unwrap())
        .collect();
    assert_eq!(text, "Hello world");

    let conv = server.store.get("s1");
    assert_eq!(conv.len(), 3);
    assert_eq!(conv[0].role, MessageRole::System);
    assert_eq!(conv[1], Message::user("hi"));
    assert_eq!(conv[2], Message::assistant("Hello world"));
}

#[tokio::test]
async fn provider_error_sends_error_frame_and_records_nothing() {
    let provider = ScriptedProvider::new().chunks(vec![
        ProviderChunk::Content("partial".into()),
        ProviderChunk::Error("model not loaded".into()),
    ]);
    let server = spawn_test_server(provider, None).await;

    let resp = post(&server.base, "/api/chat", serde_json::json!({"message": "hi"})).await;
    let frames = sse_frames(&resp.text().await.unwrap());

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["content"], "partial");
    assert_eq!(frames[1]["error"], "Model error: model not loaded");

    let conv = server.store.get("default");
    assert!(conv.iter().all(|m| m.role != MessageRole::Assistant));
}

#[tokio::test]
async fn unknown_model_is_bad_request() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;

    let resp = post(
        &server.base,
        "/api/chat",
        serde_json::json!({"message": "hi", "model": "gpt-9"}),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid model selection");
    assert!(server.store.get("default").is_empty());
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;

    let resp = post(&server.base, "/api/chat", serde_json::json!({"message": "   "})).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn malformed_body_is_json_bad_request() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;

    for path in ["/api/chat", "/api/clear"] {
        let resp = reqwest::Client::new()
            .post(format!("{}{path}", server.base))
            .header("content-type", "application/json")
            .body("{\"message\": ")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{path}");
        let json: serde_json::Value = resp.json().await.unwrap();
        assert!(!json["error"].as_str().unwrap().is_empty(), "{path}");
    }
}

// ── Clear ────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_empties_session() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;
    server.store.append("s1", Message::user("old"));

    let resp = post(&server.base, "/api/clear", serde_json::json!({"session_id": "s1"})).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "success");
    assert!(server.store.get("s1").is_empty());
}

// ── Static files ─────────────────────────────────────────────────────

#[tokio::test]
async fn static_dir_served_as_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>keel</h1>").unwrap();
    let server = spawn_test_server(ScriptedProvider::new(), Some(dir.path().to_path_buf())).await;

    let resp = reqwest::get(format!("{}/index.html", server.base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<h1>keel</h1>");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let server = spawn_test_server(ScriptedProvider::new(), None).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/models", server.base))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
