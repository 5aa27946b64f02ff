use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Client for a local Ollama server's non-streaming chat endpoint.
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unreachable(&self) -> AppError {
        AppError::LocalBackendUnreachable {
            base_url: self.base_url.clone(),
        }
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    tracing::warn!(base_url = %self.base_url, error = %e, "Ollama server unreachable");
                    self.unreachable()
                } else {
                    AppError::Transport(format!("Ollama request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response.".to_string());
            if text.contains("not found") {
                return Err(AppError::Transport(format!(
                    "Model '{model}' not found on local Ollama server. \
                     Please ensure you have pulled the model (e.g., 'ollama pull {model}')."
                )));
            }
            return Err(AppError::Transport(format!(
                "Ollama API error ({}): {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::Transport(format!(
                "Received an unexpected response format from Ollama API: {}",
                e
            ))
        })?;

        match parsed.message {
            Some(message) if !message.content.trim().is_empty() => Ok(message.content),
            _ => Err(AppError::EmptyResponse(format!(
                "Ollama returned no content for model '{}'",
                model
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
