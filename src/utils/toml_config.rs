//! TOML-based configuration for Triad
//!
//! Declarative settings for the research topic, per-role model bindings,
//! provider endpoints, search backend, pacing and logging, read from
//! `triad.toml`. Every field has a default, so a missing file or a partial
//! file is valid.
//!
//! Secrets never live in the file. The `*_env` fields name environment
//! variables which are resolved into [`Credentials`] at run time.

use crate::research::PipelineSettings;
use crate::types::{
    AgentBindings, AppError, Credentials, ModelBinding, ModelProvider, RunConfiguration,
    SearchMode,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "triad.toml";

/// Root configuration structure loaded from triad.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriadConfig {
    #[serde(default)]
    pub research: ResearchConfig,

    /// Model binding per agent role
    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Research Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default)]
    pub search_mode: SearchMode,
}

fn default_topic() -> String {
    "The future of AI in renewable energy".to_string()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            search_mode: SearchMode::default(),
        }
    }
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub provider: ModelProvider,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "llama3.2".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model: default_model(),
        }
    }
}

impl AgentConfig {
    pub fn binding(&self) -> ModelBinding {
        ModelBinding::new(self.provider, self.model.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub planner: AgentConfig,

    #[serde(default)]
    pub researcher: AgentConfig,

    #[serde(default)]
    pub writer: AgentConfig,
}

impl AgentsConfig {
    pub fn bindings(&self) -> AgentBindings {
        AgentBindings {
            planner: self.planner.binding(),
            researcher: self.researcher.binding(),
            writer: self.writer.binding(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, &AgentConfig)> {
        [
            ("planner", &self.planner),
            ("researcher", &self.researcher),
            ("writer", &self.writer),
        ]
        .into_iter()
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub local: LocalProviderConfig,

    #[serde(default)]
    pub hosted: HostedProviderConfig,
}

/// Local inference server (Ollama)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
        }
    }
}

/// Hosted model API (Gemini)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedProviderConfig {
    #[serde(default = "default_gemini_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for HostedProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_gemini_base(),
            api_key_env: default_gemini_key_env(),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_tavily_base")]
    pub api_base: String,

    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_search_depth")]
    pub search_depth: String,
}

fn default_tavily_base() -> String {
    "https://api.tavily.com".to_string()
}

fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_max_results() -> u32 {
    5
}

fn default_search_depth() -> String {
    "advanced".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_tavily_base(),
            api_key_env: default_tavily_key_env(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
        }
    }
}

// ============= Pacing Configuration =============

/// Delays that make progress perceptible to observers. Zero disables a delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_stage_delay_ms")]
    pub stage_delay_ms: u64,

    #[serde(default = "default_researcher_stagger_ms")]
    pub researcher_stagger_ms: u64,

    #[serde(default = "default_remote_standin_delay_ms")]
    pub remote_standin_delay_ms: u64,

    #[serde(default = "default_local_standin_delay_ms")]
    pub local_standin_delay_ms: u64,

    /// Per backend call limit. Absent means calls are bounded only by
    /// cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
}

fn default_stage_delay_ms() -> u64 {
    1000
}

fn default_researcher_stagger_ms() -> u64 {
    500
}

fn default_remote_standin_delay_ms() -> u64 {
    1500
}

fn default_local_standin_delay_ms() -> u64 {
    2500
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            stage_delay_ms: default_stage_delay_ms(),
            researcher_stagger_ms: default_researcher_stagger_ms(),
            remote_standin_delay_ms: default_remote_standin_delay_ms(),
            local_standin_delay_ms: default_local_standin_delay_ms(),
            call_timeout_secs: None,
        }
    }
}

impl PacingConfig {
    /// Pacing with every delay disabled.
    pub fn immediate() -> Self {
        Self {
            stage_delay_ms: 0,
            researcher_stagger_ms: 0,
            remote_standin_delay_ms: 0,
            local_standin_delay_ms: 0,
            call_timeout_secs: None,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            stage_delay: Duration::from_millis(self.stage_delay_ms),
            researcher_stagger: Duration::from_millis(self.researcher_stagger_ms),
        }
    }

    pub fn remote_standin_delay(&self) -> Duration {
        Duration::from_millis(self.remote_standin_delay_ms)
    }

    pub fn local_standin_delay(&self) -> Duration {
        Duration::from_millis(self.local_standin_delay_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Errors =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {0}: {1}")]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

// ============= Loading =============

impl TriadConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; an unreadable or malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "no configuration file found, using defaults");
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TriadConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.research.topic.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "research.topic must not be empty".to_string(),
            ));
        }

        for (role, agent) in self.agents.iter() {
            if agent.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "agents.{}.model must not be empty",
                    role
                )));
            }
        }

        validate_url("providers.local.base_url", &self.providers.local.base_url)?;
        validate_url("providers.hosted.api_base", &self.providers.hosted.api_base)?;
        validate_url("search.api_base", &self.search.api_base)?;

        if self.providers.hosted.api_key_env.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "providers.hosted.api_key_env must name an environment variable".to_string(),
            ));
        }
        if self.search.api_key_env.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "search.api_key_env must name an environment variable".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be at least 1".to_string(),
            ));
        }

        if self.pacing.call_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "pacing.call_timeout_secs must be positive when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve credentials from the process environment.
    pub fn resolve_credentials(&self) -> Credentials {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`, which maps an environment
    /// variable name to its value.
    pub fn resolve_credentials_with<F>(&self, lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Credentials::new();
        let sources = [
            (Credentials::HOSTED_API_KEY, &self.providers.hosted.api_key_env),
            (Credentials::SEARCH_API_KEY, &self.search.api_key_env),
        ];
        for (key, env) in sources {
            match lookup(env) {
                Some(value) if !value.trim().is_empty() => credentials.insert(key, value),
                _ => tracing::debug!(env = %env, "credential not set"),
            }
        }
        credentials
    }

    /// Build the per-run configuration, applying command-line overrides.
    pub fn run_configuration(
        &self,
        topic_override: Option<&str>,
        mode_override: Option<SearchMode>,
        credentials: Credentials,
    ) -> crate::types::Result<RunConfiguration> {
        let topic = topic_override.unwrap_or(&self.research.topic).trim();
        if topic.is_empty() {
            return Err(AppError::Configuration(
                "research topic must not be empty".to_string(),
            ));
        }

        Ok(RunConfiguration::new(
            topic,
            self.agents.bindings(),
            mode_override.unwrap_or(self.research.search_mode),
            credentials,
        ))
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be an http(s) URL, got '{}'",
            field, value
        )))
    }
}
