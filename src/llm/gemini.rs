use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

/// Client for the hosted Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`AppError::Auth`] if `api_key` is blank.
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Auth(
                "no API key was provided for the hosted model provider".to_string(),
            ));
        }
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

fn is_rejected_key(status: StatusCode, body: &str) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || body.contains("API key not valid")
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if is_rejected_key(status, &text) {
                return Err(AppError::Auth(
                    "the provided Gemini API key is not valid. Please check it and try again."
                        .to_string(),
                ));
            }
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AppError::Transport(format!(
                "Gemini API error ({}): {}",
                status, detail
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AppError::Transport(format!("Unexpected response format from Gemini API: {}", e))
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::EmptyResponse(format!(
                "Gemini returned no text for model '{}'",
                model
            )));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
