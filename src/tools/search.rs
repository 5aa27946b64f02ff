//! Search backends
//!
//! [`SearchPort`] is the retrieval capability the researcher tasks use.
//! [`SearchRouter`] implements it over the Tavily web search API, falling
//! back to deterministic stand-in result sets when no live search is
//! configured.

use crate::research::RunToken;
use crate::types::{AppError, Credentials, Result, SearchMode, SourceItem};
use crate::utils::TriadConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retrieval capability used by researcher tasks.
#[async_trait]
pub trait SearchPort: Send + Sync {
    /// Return ranked results for `query`.
    ///
    /// Remote mode without a usable search credential returns the remote
    /// stand-in set instead of failing. Resolves to [`AppError::Cancelled`]
    /// if `token` fires first.
    async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        credentials: &Credentials,
        token: &RunToken,
    ) -> Result<Vec<SourceItem>>;
}

/// Whether a search in `mode` with `credentials` goes to the live backend.
pub fn is_live_search(mode: SearchMode, credentials: &Credentials) -> bool {
    mode == SearchMode::Remote && credentials.contains(Credentials::SEARCH_API_KEY)
}

/// Stand-in web results used for remote mode without a search key.
pub fn remote_standin_results() -> Vec<SourceItem> {
    vec![
        SourceItem::new(
            "AI-Powered Smart Grids for Renewable Energy",
            "https://example.com/ai-smart-grids",
            "Artificial intelligence is revolutionizing energy distribution by creating smart grids that can balance supply and demand from intermittent renewable sources like solar and wind in real-time.",
        ),
        SourceItem::new(
            "Predictive Maintenance for Wind Turbines using AI",
            "https://example.com/ai-wind-turbines",
            "AI algorithms analyze sensor data from wind turbines to predict maintenance needs, reducing downtime and increasing the efficiency and lifespan of wind farms.",
        ),
        SourceItem::new(
            "Optimizing Solar Panel Output with Machine Learning",
            "https://example.com/ml-solar-panels",
            "Machine learning models help optimize the placement and angle of solar panels and forecast energy output based on weather patterns, maximizing the electricity generated.",
        ),
    ]
}

/// Stand-in local documents used for local mode.
pub fn local_standin_results() -> Vec<SourceItem> {
    vec![
        SourceItem::new(
            "Local Doc: Report on Energy Storage Solutions (PDF)",
            "file:///local/docs/energy_storage.pdf",
            "This internal report details the growing importance of battery storage systems to complement AI-managed renewable energy grids, ensuring a stable power supply.",
        ),
        SourceItem::new(
            "Local Doc: Meeting Notes on Grid Modernization (TXT)",
            "file:///local/notes/grid_modernization.txt",
            "Discussion points from the Q3 planning meeting focused on the capital investment required for AI-driven grid upgrades and the projected ROI over the next decade.",
        ),
    ]
}

// ============= Tavily =============

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    /// Tavily puts the snippet in `content`
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TavilyError {
    detail: Option<serde_json::Value>,
}

/// Client for the Tavily `/search` endpoint.
pub struct TavilyClient {
    http_client: reqwest::Client,
    api_base: String,
    max_results: u32,
    search_depth: String,
}

impl TavilyClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_results: 5,
            search_depth: "advanced".to_string(),
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    /// Run one search. A 401/403 reply is reported as [`AppError::Auth`].
    pub async fn search(&self, api_key: &str, query: &str) -> Result<Vec<SourceItem>> {
        let url = format!("{}/search", self.api_base);
        let body = TavilyRequest {
            api_key,
            query,
            max_results: self.max_results,
            search_depth: &self.search_depth,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch from Tavily API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TavilyError>(&text)
                .ok()
                .and_then(|e| e.detail)
                .map(|d| match d {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "Unknown error".to_string());

            if matches!(
                status,
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
            ) {
                return Err(AppError::Auth(format!(
                    "Tavily rejected the search API key: {}",
                    detail
                )));
            }
            return Err(AppError::Transport(format!(
                "Tavily API error: {} - {}",
                status, detail
            )));
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            AppError::Transport(format!("Unexpected response format from Tavily API: {}", e))
        })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SourceItem::new(r.title, r.url, r.content))
            .collect())
    }
}

// ============= Router =============

/// Production [`SearchPort`]: live Tavily search when possible, stand-in
/// result sets otherwise.
pub struct SearchRouter {
    tavily: TavilyClient,
    remote_standin_delay: Duration,
    local_standin_delay: Duration,
    call_timeout: Option<Duration>,
}

impl SearchRouter {
    pub fn new(tavily: TavilyClient) -> Self {
        Self {
            tavily,
            remote_standin_delay: Duration::from_millis(1500),
            local_standin_delay: Duration::from_millis(2500),
            call_timeout: None,
        }
    }

    pub fn from_config(config: &TriadConfig) -> Self {
        let tavily = TavilyClient::new(config.search.api_base.clone())
            .with_max_results(config.search.max_results)
            .with_search_depth(config.search.search_depth.clone());

        Self {
            tavily,
            remote_standin_delay: config.pacing.remote_standin_delay(),
            local_standin_delay: config.pacing.local_standin_delay(),
            call_timeout: config.pacing.call_timeout(),
        }
    }

    pub fn with_standin_delays(mut self, remote: Duration, local: Duration) -> Self {
        self.remote_standin_delay = remote;
        self.local_standin_delay = local;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn live(&self, api_key: &str, query: &str) -> Result<Vec<SourceItem>> {
        match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.tavily.search(api_key, query)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Transport(format!(
                    "Tavily search timed out after {:?}",
                    limit
                ))),
            },
            None => self.tavily.search(api_key, query).await,
        }
    }
}

#[async_trait]
impl SearchPort for SearchRouter {
    async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        credentials: &Credentials,
        token: &RunToken,
    ) -> Result<Vec<SourceItem>> {
        token.check()?;

        if mode == SearchMode::Local {
            token.sleep(self.local_standin_delay).await?;
            return Ok(local_standin_results());
        }

        let Some(api_key) = credentials.get(Credentials::SEARCH_API_KEY) else {
            token.sleep(self.remote_standin_delay).await?;
            return Ok(remote_standin_results());
        };

        match token.race(self.live(api_key, query)).await {
            Err(AppError::Auth(detail)) => {
                tracing::warn!(%detail, "search API key rejected, using stand-in results");
                token.sleep(self.remote_standin_delay).await?;
                Ok(remote_standin_results())
            }
            other => other,
        }
    }
}
