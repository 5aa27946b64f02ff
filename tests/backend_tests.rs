//! HTTP backend tests against a mock server.
//!
//! Covers the Ollama and Gemini model clients, the Tavily search client and
//! a full pipeline run over a mocked Ollama server.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use triad::llm::{GeminiClient, OllamaClient};
use triad::tools::{SearchRouter, TavilyClient};
use triad::types::{AppError, Credentials, ErrorKind, SearchMode};
use triad::utils::toml_config::PacingConfig;
use triad::{LLMClient, MemorySink, ResearchPipeline, RunToken, SearchPort, TriadConfig};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3.2",
        "created_at": "2024-01-01T00:00:00Z",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

fn gemini_reply(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts.iter().map(|t| json!({ "text": t })).collect();
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
}

// ============= Ollama =============

#[tokio::test]
async fn test_ollama_chat_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("Hello there")))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri());
    let text = client.generate("llama3.2", "Say hello").await.unwrap();

    assert_eq!(text, "Hello there");
    assert_eq!(client.provider_name(), "ollama");
}

#[tokio::test]
async fn test_ollama_missing_model_hints_at_pull() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "model 'gemma3' not found" })),
        )
        .mount(&server)
        .await;

    let err = OllamaClient::new(server.uri())
        .generate("gemma3", "hi")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("ollama pull gemma3"));
}

#[tokio::test]
async fn test_ollama_unreachable_server() {
    let err = OllamaClient::new("http://127.0.0.1:1")
        .generate("llama3.2", "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::LocalBackendUnreachable { .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
    let message = err.to_string();
    assert!(message.contains("http://127.0.0.1:1"));
    assert!(message.contains("OLLAMA_ORIGINS"));
}

#[tokio::test]
async fn test_ollama_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("   ")))
        .mount(&server)
        .await;

    let err = OllamaClient::new(server.uri())
        .generate("llama3.2", "hi")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyResponse);
}

// ============= Gemini =============

#[tokio::test]
async fn test_gemini_concatenates_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "gm-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(&["Part one. ", "Part two."])))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "gm-key").unwrap();
    let text = client.generate("gemini-2.5-flash", "hi").await.unwrap();

    assert_eq!(text, "Part one. Part two.");
}

#[tokio::test]
async fn test_gemini_invalid_key_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = GeminiClient::new(server.uri(), "bad")
        .unwrap()
        .generate("gemini-2.5-flash", "hi")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn test_gemini_server_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "backend overloaded" }
        })))
        .mount(&server)
        .await;

    let err = GeminiClient::new(server.uri(), "gm-key")
        .unwrap()
        .generate("gemini-2.5-flash", "hi")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("backend overloaded"));
}

#[tokio::test]
async fn test_gemini_without_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = GeminiClient::new(server.uri(), "gm-key")
        .unwrap()
        .generate("gemini-2.5-flash", "hi")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmptyResponse);
}

// ============= Tavily =============

#[tokio::test]
async fn test_tavily_maps_content_to_snippet() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "api_key": "tvly-key",
            "query": "battery chemistry",
            "max_results": 3,
            "search_depth": "basic"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "battery chemistry",
            "results": [
                { "title": "Li-ion", "url": "https://a.test", "content": "Lithium details", "score": 0.9 },
                { "title": "Sodium", "url": "https://b.test", "content": "Sodium details", "score": 0.7 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TavilyClient::new(server.uri())
        .with_max_results(3)
        .with_search_depth("basic");
    let results = client.search("tvly-key", "battery chemistry").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Li-ion");
    assert_eq!(results[0].url, "https://a.test");
    assert_eq!(results[0].snippet, "Lithium details");
}

#[tokio::test]
async fn test_tavily_error_detail_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "upstream exploded" })),
        )
        .mount(&server)
        .await;

    let err = TavilyClient::new(server.uri())
        .search("tvly-key", "anything")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn test_rejected_search_key_falls_back_to_standin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Unauthorized" })))
        .expect(1)
        .mount(&server)
        .await;

    let router = SearchRouter::new(TavilyClient::new(server.uri()))
        .with_standin_delays(Duration::ZERO, Duration::ZERO);
    let credentials = Credentials::new().with(Credentials::SEARCH_API_KEY, "tvly-revoked");

    let results = router
        .search("anything", SearchMode::Remote, &credentials, &RunToken::new())
        .await
        .unwrap();

    assert_eq!(results, triad::tools::search::remote_standin_results());
}

// ============= Full pipeline =============

#[tokio::test]
async fn test_pipeline_over_mocked_ollama() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("research sub-topics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ollama_reply(r#"Sure: ["Battery storage", "Grid policy"]"#)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("You are a specialized academic researcher"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ollama_reply("Storage is growing [1].")),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("You are a professional research writer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ollama_reply("# Microgrids\n\nText.\n\n## Sources\n1. x")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = TriadConfig::default();
    config.providers.local.base_url = server.uri();
    config.research.search_mode = SearchMode::Local;
    config.pacing = PacingConfig::immediate();

    let credentials = Credentials::new();
    let run = config
        .run_configuration(Some("Solar microgrids"), None, credentials.clone())
        .unwrap();
    let pipeline = ResearchPipeline::from_config(&config, &credentials).unwrap();
    let sink = Arc::new(MemorySink::new());

    let outcome = pipeline.run(&run, &RunToken::new(), sink.clone()).await;

    assert_eq!(
        outcome.report(),
        Some("# Microgrids\n\nText.\n\n## Sources\n1. x")
    );
    let messages = sink.messages();
    assert!(messages.contains(&"Research assignments generated: 2 tasks.".to_string()));
    assert!(messages
        .iter()
        .any(|m| m == "[Battery storage] Executing simulated search..."));
    // Two local documents per assignment.
    assert!(messages.contains(
        &"All research agents have completed their tasks. Total sources collected: 4.".to_string()
    ));
}

#[tokio::test]
async fn test_pipeline_reports_unreachable_local_server() {
    let mut config = TriadConfig::default();
    config.providers.local.base_url = "http://127.0.0.1:1".to_string();
    config.pacing = PacingConfig::immediate();

    let credentials = Credentials::new();
    let run = config.run_configuration(None, None, credentials.clone()).unwrap();
    let pipeline = ResearchPipeline::from_config(&config, &credentials).unwrap();
    let sink = Arc::new(MemorySink::new());

    let outcome = pipeline.run(&run, &RunToken::new(), sink.clone()).await;

    match outcome {
        triad::RunOutcome::Failed { error, detail } => {
            assert_eq!(error, ErrorKind::Transport);
            assert!(detail.contains("Ollama"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
