// ABOUTME: Integration tests for the downstream HTTP surface against a mock upstream
// ABOUTME: Exercises health, simple chat, model list and OpenAI-compatible completions
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glm_relay::config::ServerConfig;
use glm_relay::server::{router, AppState};

const AUTH_PATH: &str = "/api/v1/auths/";
const CHAT_PATH: &str = "/api/v2/chat/completions";

fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let frame = json!({"data": {"delta_content": delta}});
        body.push_str(&format!("data: {frame}\n"));
    }
    body.push_str("data: [DONE]\n");
    body
}

async fn mock_upstream(deltas: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "guest-token",
            "id": "guest-id",
            "name": "Guest",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse_body(deltas), "text/event-stream"),
        )
        .mount(&server)
        .await;
    server
}

fn app_for(server: &MockServer) -> axum::Router {
    let config = ServerConfig {
        upstream_base_url: server.uri(),
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(config).expect("state"));
    router(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn health_reports_session_user_and_model() {
    let server = mock_upstream(&["ok"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["user"], "Guest");
    assert_eq!(body["model"], "glm-5");
}

#[tokio::test]
async fn health_is_503_when_no_session_can_be_acquired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = app_for(&server);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SESSION_UNAVAILABLE");
}

#[tokio::test]
async fn model_list_exposes_the_fixed_catalog() {
    let server = mock_upstream(&[]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["glm-5", "glm-4.7", "glm-4.5"]);
    assert_eq!(body["data"][0]["object"], "model");
    assert_eq!(body["data"][0]["owned_by"], "z-ai");
}

#[tokio::test]
async fn simple_chat_aggregates_the_streamed_reply() {
    // The empty delta is dropped, not rendered.
    let server = mock_upstream(&["4", ""]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json("/chat", json!({"message": "2+2?"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["reply"], "4");
    assert_eq!(body["model"], "glm-5");
}

#[tokio::test]
async fn text_on_a_final_upstream_frame_reaches_both_surfaces() {
    // A legal upstream frame may carry content and the finish marker at
    // once; the text must survive in streaming and non-streaming form alike.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "guest-token",
            "id": "guest-id",
            "name": "Guest",
        })))
        .mount(&server)
        .await;
    let frame = json!({"choices": [{"delta": {"content": "4"}, "finish_reason": "stop"}]});
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(format!("data: {frame}\n"), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let aggregated = app_for(&server)
        .oneshot(post_json("/chat", json!({"message": "2+2?"})))
        .await
        .unwrap();
    assert_eq!(json_body(aggregated).await["reply"], "4");

    let streamed = app_for(&server)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "messages": [{"role": "user", "content": "2+2?"}],
                "stream": true,
            }),
        ))
        .await
        .unwrap();
    let bytes = to_bytes(streamed.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let content: String = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|payload| serde_json::from_str::<Value>(payload).ok())
        .filter_map(|v| {
            v["choices"][0]["delta"]["content"]
                .as_str()
                .map(str::to_owned)
        })
        .collect();
    assert_eq!(content, "4");
}

#[tokio::test]
async fn streaming_and_aggregated_replies_carry_the_same_text() {
    let server = mock_upstream(&["The answer ", "is ", "4"]).await;

    let aggregated = app_for(&server)
        .oneshot(post_json("/chat", json!({"message": "2+2?"})))
        .await
        .unwrap();
    let reply = json_body(aggregated).await["reply"]
        .as_str()
        .unwrap()
        .to_owned();

    let streamed = app_for(&server)
        .oneshot(post_json("/chat", json!({"message": "2+2?", "stream": true})))
        .await
        .unwrap();
    let bytes = to_bytes(streamed.into_body(), usize::MAX).await.unwrap();

    assert_eq!(reply, String::from_utf8(bytes.to_vec()).unwrap());
    assert_eq!(reply, "The answer is 4");
}

#[tokio::test]
async fn simple_chat_streaming_returns_plain_text_chunks() {
    let server = mock_upstream(&["a", "b", "c"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json("/chat", json!({"message": "hi", "stream": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .starts_with("text/plain"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"abc");
}

#[tokio::test]
async fn chat_completions_returns_openai_shape_with_usage() {
    let server = mock_upstream(&["Paris"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "model": "glm-4.7",
                "messages": [{"role": "user", "content": "Capital of France?"}],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "glm-4.7");
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Paris");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["prompt_tokens"], 3);
    assert_eq!(body["usage"]["completion_tokens"], 1);
    assert_eq!(body["usage"]["total_tokens"], 4);
}

#[tokio::test]
async fn unknown_model_falls_back_to_the_default() {
    let server = mock_upstream(&["hello"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "model": "gpt-nonsense",
                "messages": [{"role": "user", "content": "hi"}],
            }),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["model"], "glm-5");

    let requests = server.received_requests().await.expect("recording on");
    let chat = requests
        .iter()
        .find(|r| r.url.path() == CHAT_PATH)
        .expect("chat request");
    let upstream_body: Value = serde_json::from_slice(&chat.body).unwrap();
    assert_eq!(upstream_body["model"], "glm-5");
}

#[tokio::test]
async fn empty_messages_are_a_bad_request() {
    let server = mock_upstream(&[]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"messages": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn system_messages_are_merged_into_the_first_user_turn() {
    let server = mock_upstream(&["Bonjour"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "messages": [
                    {"role": "system", "content": "Reply in French"},
                    {"role": "user", "content": "Hello"},
                ],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let requests = server.received_requests().await.expect("recording on");
    let chat = requests
        .iter()
        .find(|r| r.url.path() == CHAT_PATH)
        .expect("chat request");
    let upstream_body: Value = serde_json::from_slice(&chat.body).unwrap();

    let messages = upstream_body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(
        messages[0]["content"],
        "[System instructions]\nReply in French\n\nHello"
    );
    // The signature covers the merged prompt, not the raw user text.
    assert_eq!(
        upstream_body["signature_prompt"],
        "[System instructions]\nReply in French\n\nHello"
    );
}

#[tokio::test]
async fn streaming_completions_emit_sse_chunks_and_done() {
    let server = mock_upstream(&["4"]).await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "messages": [{"role": "user", "content": "2+2?"}],
                "stream": true,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let payloads: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert!(payloads.len() >= 3, "content, finish and [DONE]: {text}");
    assert_eq!(*payloads.last().unwrap(), "[DONE]");

    let first: Value = serde_json::from_str(payloads[0]).unwrap();
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["choices"][0]["delta"]["content"], "4");

    let finish: Value = serde_json::from_str(payloads[payloads.len() - 2]).unwrap();
    assert_eq!(finish["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn upstream_rejection_surfaces_with_passed_through_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "guest-token",
            "id": "guest-id",
            "name": "Guest",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;
    let app = app_for(&server);

    let response = app
        .oneshot(post_json("/chat", json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}
