use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============= Agent Types =============

/// The three stages of the pipeline. Every progress event is attributed to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Researcher,
    Writer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Researcher => "researcher",
            AgentRole::Writer => "writer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend family a model is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Local inference server (Ollama)
    #[default]
    #[serde(alias = "ollama")]
    Local,
    /// Hosted API that needs a credential (Gemini)
    #[serde(alias = "gemini")]
    Hosted,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Local => "local",
            ModelProvider::Hosted => "hosted",
        }
    }

    /// Credential key a call through this provider requires, if any.
    pub fn required_credential(&self) -> Option<&'static str> {
        match self {
            ModelProvider::Local => None,
            ModelProvider::Hosted => Some(Credentials::HOSTED_API_KEY),
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (provider, model identifier) pair used for one role's calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBinding {
    pub provider: ModelProvider,
    pub model: String,
}

impl ModelBinding {
    pub fn new(provider: ModelProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn local(model: impl Into<String>) -> Self {
        Self::new(ModelProvider::Local, model)
    }

    pub fn hosted(model: impl Into<String>) -> Self {
        Self::new(ModelProvider::Hosted, model)
    }
}

impl fmt::Display for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// One binding per role. A struct rather than a map so a run can never
/// be missing a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBindings {
    pub planner: ModelBinding,
    pub researcher: ModelBinding,
    pub writer: ModelBinding,
}

impl AgentBindings {
    /// Use the same binding for every role.
    pub fn uniform(binding: ModelBinding) -> Self {
        Self {
            planner: binding.clone(),
            researcher: binding.clone(),
            writer: binding,
        }
    }

    pub fn get(&self, role: AgentRole) -> &ModelBinding {
        match role {
            AgentRole::Planner => &self.planner,
            AgentRole::Researcher => &self.researcher,
            AgentRole::Writer => &self.writer,
        }
    }
}

// ============= Run Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Live web search when a search credential is present, stand-in results otherwise
    #[default]
    #[serde(alias = "tavily")]
    Remote,
    /// Always the stand-in local document set
    #[serde(alias = "local_search")]
    Local,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Remote => "remote",
            SearchMode::Local => "local",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "tavily" => Ok(SearchMode::Remote),
            "local" | "local_search" => Ok(SearchMode::Local),
            other => Err(AppError::Configuration(format!(
                "Unknown search mode '{}'. Expected 'remote' or 'local'",
                other
            ))),
        }
    }
}

/// Opaque key/value credential bag. Blank values are treated as absent and
/// values never appear in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// Key for the hosted model provider's API key.
    pub const HOSTED_API_KEY: &'static str = "hosted_api_key";
    /// Key for the remote search backend's API key.
    pub const SEARCH_API_KEY: &'static str = "search_api_key";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|k| self.contains(k))
            .collect();
        keys.sort_unstable();
        f.debug_struct("Credentials")
            .field("present", &keys)
            .finish()
    }
}

/// Everything a run needs from its caller. Read-only once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub topic: String,
    pub bindings: AgentBindings,
    pub search_mode: SearchMode,
    pub credentials: Credentials,
}

impl RunConfiguration {
    pub fn new(
        topic: impl Into<String>,
        bindings: AgentBindings,
        search_mode: SearchMode,
        credentials: Credentials,
    ) -> Self {
        Self {
            topic: topic.into(),
            bindings,
            search_mode,
            credentials,
        }
    }

    pub fn binding_for(&self, role: AgentRole) -> &ModelBinding {
        self.bindings.get(role)
    }
}

// ============= Research Types =============

/// One retrieved search hit. Identity for de-duplication is `(title, url)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SourceItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }

    pub fn identity(&self) -> (&str, &str) {
        (&self.title, &self.url)
    }
}

/// The completed output of one researcher task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    assignment: String,
    sources: Vec<SourceItem>,
    synthesis: String,
    produced_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(assignment: impl Into<String>, sources: Vec<SourceItem>, synthesis: impl Into<String>) -> Self {
        Self {
            assignment: assignment.into(),
            sources,
            synthesis: synthesis.into(),
            produced_at: Utc::now(),
        }
    }

    /// A finding for an assignment whose search returned nothing.
    pub fn empty(assignment: impl Into<String>) -> Self {
        Self::new(assignment, Vec::new(), String::new())
    }

    pub fn assignment(&self) -> &str {
        &self.assignment
    }

    pub fn sources(&self) -> &[SourceItem] {
        &self.sources
    }

    pub fn synthesis(&self) -> &str {
        &self.synthesis
    }

}

// ============= Event Types =============

/// Structured data attached to a progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    SearchResults(Vec<SourceItem>),
    SourceDocument(Finding),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    /// Position in the run's event stream, starting at 0
    pub seq: u64,
    pub role: AgentRole,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn search_results(&self) -> Option<&[SourceItem]> {
        match &self.payload {
            Some(EventPayload::SearchResults(items)) => Some(items),
            _ => None,
        }
    }

    pub fn source_document(&self) -> Option<&Finding> {
        match &self.payload {
            Some(EventPayload::SourceDocument(finding)) => Some(finding),
            _ => None,
        }
    }
}

/// Terminal result of a run. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Completed { report: String },
    Stopped { reason: String },
    Failed { error: ErrorKind, detail: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn report(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed { report } => Some(report),
            _ => None,
        }
    }

    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed { .. } => RunState::Completed,
            RunOutcome::Stopped { .. } => RunState::Stopped,
            RunOutcome::Failed { .. } => RunState::Failed,
        }
    }
}

/// Everything an event sink receives: progress, then one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "body", rename_all = "lowercase")]
pub enum RunEvent {
    Progress(ProgressEvent),
    Finished(RunOutcome),
}

// ============= Run State =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Planning,
    Researching,
    Writing,
    Completed,
    Stopped,
    Failed,
}

/// Observer-facing snapshot of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: RunState,
    pub active_role: Option<AgentRole>,
}

// ============= Error Types =============

/// Closed classification of failures, carried by [`RunOutcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Transport,
    EmptyResponse,
    Parse,
    Configuration,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// Short human-readable category for user-facing messages.
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "credential problem",
            ErrorKind::Transport => "connectivity problem",
            ErrorKind::EmptyResponse | ErrorKind::Parse => "data problem",
            ErrorKind::Configuration => "configuration problem",
            ErrorKind::Internal => "internal error",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(
        "Network error while connecting to the local model server.\n\
         1. Ensure your local Ollama server is running at {base_url}.\n\
         2. If requests come from another origin, allow it by setting the OLLAMA_ORIGINS \
         environment variable (e.g., OLLAMA_ORIGINS='*')."
    )]
    LocalBackendUnreachable { base_url: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Auth(_) => ErrorKind::Auth,
            AppError::Transport(_) | AppError::LocalBackendUnreachable { .. } => {
                ErrorKind::Transport
            }
            AppError::EmptyResponse(_) => ErrorKind::EmptyResponse,
            AppError::Parse(_) => ErrorKind::Parse,
            AppError::Configuration(_) => ErrorKind::Configuration,
            AppError::Io(_) | AppError::Internal(_) => ErrorKind::Internal,
            AppError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
