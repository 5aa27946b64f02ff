//! Model invocation abstractions
//!
//! Two layers:
//! - [`LLMClient`] is one concrete backend (Ollama, Gemini) that turns a
//!   prompt into text for a named model.
//! - [`ModelPort`] is what the pipeline calls. It takes a [`ModelBinding`]
//!   and a [`RunToken`], routes to the right backend, enforces the credential
//!   requirement and races the call against cancellation.

use crate::research::RunToken;
use crate::types::{AppError, Credentials, ModelBinding, ModelProvider, Result};
use crate::utils::TriadConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion for `prompt` with `model`
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Short provider name used in logs and error messages
    fn provider_name(&self) -> &'static str;
}

/// Provider-agnostic model invocation used by the pipeline stages.
#[async_trait]
pub trait ModelPort: Send + Sync {
    /// Generate text for `prompt` with the binding's backend and model.
    ///
    /// Resolves to [`AppError::Cancelled`] if `token` fires first.
    async fn invoke(&self, binding: &ModelBinding, prompt: &str, token: &RunToken)
        -> Result<String>;
}

/// Provider selection for runtime client construction
#[derive(Debug, Clone)]
pub enum Provider {
    /// Local Ollama server
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Local {
    ///     base_url: "http://localhost:11434".to_string(),
    /// };
    /// ```
    Local { base_url: String },

    /// Hosted Gemini API
    Hosted { api_base: String, api_key: String },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Auth`] for a hosted provider with a blank key.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::Local { base_url } => {
                Ok(Arc::new(super::ollama::OllamaClient::new(base_url.clone())))
            }
            Provider::Hosted { api_base, api_key } => Ok(Arc::new(
                super::gemini::GeminiClient::new(api_base.clone(), api_key.clone())?,
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Local { .. } => "Ollama",
            Provider::Hosted { .. } => "Gemini",
        }
    }
}

fn connect(provider: Provider) -> Result<Arc<dyn LLMClient>> {
    let client = provider.create_client()?;
    tracing::debug!(provider = provider.name(), "model client ready");
    Ok(client)
}

/// Routes each binding to its provider's client.
pub struct ModelRouter {
    local: Option<Arc<dyn LLMClient>>,
    hosted: Option<Arc<dyn LLMClient>>,
    /// Environment variable named in missing-credential errors
    hosted_key_env: String,
    call_timeout: Option<Duration>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            local: None,
            hosted: None,
            hosted_key_env: "GEMINI_API_KEY".to_string(),
            call_timeout: None,
        }
    }

    /// Build the router from configuration. The hosted client is only
    /// created when its credential is present.
    pub fn from_config(config: &TriadConfig, credentials: &Credentials) -> Result<Self> {
        let local = connect(Provider::Local {
            base_url: config.providers.local.base_url.clone(),
        })?;

        let hosted = credentials
            .get(Credentials::HOSTED_API_KEY)
            .map(|key| {
                connect(Provider::Hosted {
                    api_base: config.providers.hosted.api_base.clone(),
                    api_key: key.to_string(),
                })
            })
            .transpose()?;
        if hosted.is_none() {
            tracing::debug!(
                env = %config.providers.hosted.api_key_env,
                "no hosted API key, hosted bindings will fail"
            );
        }

        Ok(Self {
            local: Some(local),
            hosted,
            hosted_key_env: config.providers.hosted.api_key_env.clone(),
            call_timeout: config.pacing.call_timeout(),
        })
    }

    pub fn with_local(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.local = Some(client);
        self
    }

    pub fn with_hosted(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.hosted = Some(client);
        self
    }

    pub fn with_hosted_key_env(mut self, env: impl Into<String>) -> Self {
        self.hosted_key_env = env.into();
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    fn client_for(&self, provider: ModelProvider) -> Result<&Arc<dyn LLMClient>> {
        match provider {
            ModelProvider::Local => self.local.as_ref().ok_or_else(|| {
                AppError::Configuration("no local model backend configured".to_string())
            }),
            ModelProvider::Hosted => self.hosted.as_ref().ok_or_else(|| {
                AppError::Auth(format!(
                    "a hosted model is selected but no API key was provided. \
                     Set the {} environment variable or select a local model.",
                    self.hosted_key_env
                ))
            }),
        }
    }
}

#[async_trait]
impl ModelPort for ModelRouter {
    async fn invoke(
        &self,
        binding: &ModelBinding,
        prompt: &str,
        token: &RunToken,
    ) -> Result<String> {
        token.check()?;
        let client = self.client_for(binding.provider)?;

        tracing::debug!(
            provider = client.provider_name(),
            model = %binding.model,
            prompt_chars = prompt.len(),
            "invoking model"
        );

        let call = async {
            match self.call_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, client.generate(&binding.model, prompt)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(AppError::Transport(format!(
                            "{} call to model '{}' timed out after {:?}",
                            client.provider_name(),
                            binding.model,
                            limit
                        ))),
                    }
                }
                None => client.generate(&binding.model, prompt).await,
            }
        };

        let text = token.race(call).await?;
        if text.trim().is_empty() {
            return Err(AppError::EmptyResponse(format!(
                "{} returned no text for model '{}'",
                client.provider_name(),
                binding.model
            )));
        }
        Ok(text)
    }
}
