//! `OllamaClient` against a mock `/api/generate` endpoint.

use jarvis::config::LlmConfig;
use jarvis::error::AssistantError;
use jarvis::llm::{LanguageModel, OllamaClient};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    let config = LlmConfig {
        base_url: server.uri(),
        model: "phi3:mini".to_owned(),
        connect_timeout_secs: 5,
        request_timeout_secs: 5,
        ..LlmConfig::default()
    };
    OllamaClient::new(&config).unwrap()
}

#[tokio::test]
async fn sends_non_streaming_request_and_trims_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "phi3:mini",
            "prompt": "User: hi\n\nJarvis:",
            "system": "Be brief.",
            "stream": false
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "  Good evening.\n", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .generate("User: hi\n\nJarvis:", Some("Be brief."))
        .await
        .unwrap();
    assert_eq!(reply, "Good evening.");
}

#[tokio::test]
async fn omits_system_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "ok"})),
        )
        .mount(&server)
        .await;

    client_for(&server).generate("ping", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("system").is_none());
}

#[tokio::test]
async fn server_error_surfaces_as_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("ping", None).await.unwrap_err();
    match err {
        AssistantError::Llm(msg) => assert!(msg.contains("model not loaded")),
        other => panic!("unexpected error: {other}"),
    }
}
