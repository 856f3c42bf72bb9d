//! End-to-end transport tests: real axum server, real SSE consumption.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use finguru::chat::{StreamChunk, UserSettings};
use finguru::client::ChatApi;
use finguru::config::{ServerConfig, UpstreamConfig};
use finguru::error::UpstreamError;
use finguru::relay::{ChatRequest, RelayService};
use finguru::server::RelayServer;
use finguru::test_utils::{FakeBackend, FakeTurn};
use finguru::tts::NullSynthesizer;
use std::sync::Arc;

async fn start_server(script: Vec<FakeTurn>) -> RelayServer {
    let backend = Arc::new(FakeBackend::new(script));
    let relay = Arc::new(RelayService::new(backend, &UpstreamConfig::default()));
    let config = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
    };
    RelayServer::start(relay, Arc::new(NullSynthesizer), &config)
        .await
        .expect("server starts")
}

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_owned(),
        history: Vec::new(),
        user_settings: UserSettings::default(),
        image_url: None,
    }
}

async fn collect(api: &ChatApi, req: ChatRequest) -> Vec<StreamChunk> {
    let mut rx = api.send_message(req);
    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }
    chunks
}

#[tokio::test]
async fn frames_in_equal_chunks_out_in_order() {
    let server = start_server(vec![FakeTurn::fragments(&["Hello", " world"])]).await;
    let api = ChatApi::new(format!("http://{}", server.addr()));

    let chunks = collect(&api, request("hi there")).await;
    assert_eq!(
        chunks,
        vec![
            StreamChunk::Text {
                text: "Hello".into()
            },
            StreamChunk::Text {
                text: " world".into()
            },
        ]
    );
}

#[tokio::test]
async fn lockdown_travels_end_to_end() {
    let server = start_server(vec![FakeTurn::fragments(&["[LOCK", "DOWN_COMMAND]"])]).await;
    let api = ChatApi::new(format!("http://{}", server.addr()));

    let chunks = collect(&api, request("what are you feeling?")).await;
    assert_eq!(chunks, vec![StreamChunk::Lockdown]);
}

#[tokio::test]
async fn upstream_error_travels_as_error_chunk() {
    let server = start_server(vec![FakeTurn::Fail(UpstreamError::RateLimited(
        "HTTP 429".into(),
    ))])
    .await;
    let api = ChatApi::new(format!("http://{}", server.addr()));

    let chunks = collect(&api, request("hello")).await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0],
        StreamChunk::Error {
            text: "I'm experiencing high traffic right now. Please try again in a moment.".into()
        }
    );
}

#[tokio::test]
async fn raw_sse_body_has_done_sentinel_and_ordered_frames() {
    let server = start_server(vec![FakeTurn::fragments(&["one", "two"])]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", server.addr()))
        .json(&request("hi"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.starts_with("text/event-stream"));

    let body = response.text().await.unwrap();
    let one = body.find("data: {\"text\":\"one\"}").unwrap();
    let two = body.find("data: {\"text\":\"two\"}").unwrap();
    let done = body.find("data: [DONE]").unwrap();
    assert!(one < two);
    assert!(two < done);
}

#[tokio::test]
async fn malformed_body_answers_500_json_before_streaming() {
    let server = start_server(vec![]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", server.addr()))
        .header("content-type", "application/json")
        .body("this is not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        payload["error"],
        "An error occurred while processing your request."
    );
    assert!(payload["details"].is_string());
}

#[tokio::test]
async fn client_surfaces_unreachable_backend_as_error_chunk() {
    // Nothing is listening on this port.
    let api = ChatApi::new("http://127.0.0.1:9");
    let chunks = collect(&api, request("hello?")).await;
    assert_eq!(chunks.len(), 1);
    assert!(matches!(
        &chunks[0],
        StreamChunk::Error { text } if text.contains("backend server")
    ));
}

#[tokio::test]
async fn tts_requires_text() {
    let server = start_server(vec![]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/text-to-speech", server.addr()))
        .json(&serde_json::json!({ "voice": "Kore" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "Text is required");
}

#[tokio::test]
async fn tts_without_provider_answers_500() {
    let server = start_server(vec![]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/text-to-speech", server.addr()))
        .json(&serde_json::json!({ "text": "Hello there", "voice": "Kore" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["error"], "Failed to generate audio");
}

#[tokio::test]
async fn chat_api_tts_helper_returns_none_without_provider() {
    let server = start_server(vec![]).await;
    let api = ChatApi::new(format!("http://{}", server.addr()));
    assert!(api.text_to_speech("Hello there", Some("Kore")).await.is_none());
}

#[tokio::test]
async fn root_answers_liveness_line() {
    let server = start_server(vec![]).await;
    let body = reqwest::get(format!("http://{}/", server.addr()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("running"));
}
