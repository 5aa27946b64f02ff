//! Mock ports for pipeline tests.
//!
//! The model mock routes on the binding's model name, so tests bind each
//! role to its own model (see [`super::bindings`]). Researcher behaviour is
//! keyed by the assignment text, recovered from the prompt or query.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use triad::types::{AppError, Credentials, ModelBinding, Result, SearchMode, SourceItem};
use triad::{ModelPort, RunToken, SearchPort};

pub const PLANNER_MODEL: &str = "planner-model";
pub const RESEARCHER_MODEL: &str = "researcher-model";
pub const WRITER_MODEL: &str = "writer-model";

const ASSIGNMENT_MARKER: &str = "Your assignment: \"";
const QUERY_PREFIX: &str = "Comprehensive analysis and sources on: ";

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub model: String,
    pub prompt: String,
}

/// How a scripted call should fail.
#[derive(Debug, Clone)]
pub enum Failure {
    Transport(String),
    Auth(String),
    Empty,
}

impl Failure {
    fn to_error(&self) -> AppError {
        match self {
            Failure::Transport(msg) => AppError::Transport(msg.clone()),
            Failure::Auth(msg) => AppError::Auth(msg.clone()),
            Failure::Empty => AppError::EmptyResponse("mock returned no text".to_string()),
        }
    }
}

/// Scripted model port.
///
/// - planner calls return the configured plan
/// - researcher calls return `Synthesis for <assignment>`
/// - writer calls return the configured report
pub struct MockModelPort {
    plan: String,
    report: String,
    researcher_delays: HashMap<String, Duration>,
    researcher_failures: HashMap<String, Failure>,
    writer_failure: Option<Failure>,
    writer_delay: Duration,
    calls: Mutex<Vec<ModelCall>>,
}

impl MockModelPort {
    pub fn new(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            report: "# Final Report\n\nBody.\n\n## Sources\n".to_string(),
            researcher_delays: HashMap::new(),
            researcher_failures: HashMap::new(),
            writer_failure: None,
            writer_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_report(mut self, report: &str) -> Self {
        self.report = report.to_string();
        self
    }

    pub fn with_researcher_delay(mut self, assignment: &str, delay: Duration) -> Self {
        self.researcher_delays.insert(assignment.to_string(), delay);
        self
    }

    pub fn with_researcher_failure(mut self, assignment: &str, failure: Failure) -> Self {
        self.researcher_failures
            .insert(assignment.to_string(), failure);
        self
    }

    pub fn with_writer_failure(mut self, failure: Failure) -> Self {
        self.writer_failure = Some(failure);
        self
    }

    pub fn with_writer_delay(mut self, delay: Duration) -> Self {
        self.writer_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().clone()
    }

    pub fn prompts_for(&self, model: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.model == model)
            .map(|c| c.prompt.clone())
            .collect()
    }

    pub fn writer_prompt(&self) -> Option<String> {
        self.prompts_for(WRITER_MODEL).into_iter().next()
    }
}

/// Recover the assignment from a researcher prompt.
pub fn assignment_in_prompt(prompt: &str) -> String {
    prompt
        .split_once(ASSIGNMENT_MARKER)
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(assignment, _)| assignment.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl ModelPort for MockModelPort {
    async fn invoke(
        &self,
        binding: &ModelBinding,
        prompt: &str,
        token: &RunToken,
    ) -> Result<String> {
        token.check()?;
        self.calls.lock().push(ModelCall {
            model: binding.model.clone(),
            prompt: prompt.to_string(),
        });

        match binding.model.as_str() {
            PLANNER_MODEL => Ok(self.plan.clone()),
            RESEARCHER_MODEL => {
                let assignment = assignment_in_prompt(prompt);
                let delay = self
                    .researcher_delays
                    .get(&assignment)
                    .copied()
                    .unwrap_or(Duration::ZERO);
                token.sleep(delay).await?;
                match self.researcher_failures.get(&assignment) {
                    Some(failure) => Err(failure.to_error()),
                    None => Ok(format!("Synthesis for {}", assignment)),
                }
            }
            WRITER_MODEL => {
                token.sleep(self.writer_delay).await?;
                match &self.writer_failure {
                    Some(failure) => Err(failure.to_error()),
                    None => Ok(self.report.clone()),
                }
            }
            other => Err(AppError::Configuration(format!("unexpected model {}", other))),
        }
    }
}

/// Scripted search port.
///
/// Returns one source per assignment by default:
/// `Source for <assignment>` at `https://example.test/<assignment>`.
pub struct MockSearchPort {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    empty: HashSet<String>,
    failing: HashSet<String>,
    extra: HashMap<String, Vec<SourceItem>>,
    queries: Mutex<Vec<String>>,
}

impl Default for MockSearchPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchPort {
    pub fn new() -> Self {
        Self {
            default_delay: Duration::ZERO,
            delays: HashMap::new(),
            empty: HashSet::new(),
            failing: HashSet::new(),
            extra: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_delay(mut self, assignment: &str, delay: Duration) -> Self {
        self.delays.insert(assignment.to_string(), delay);
        self
    }

    pub fn with_empty(mut self, assignment: &str) -> Self {
        self.empty.insert(assignment.to_string());
        self
    }

    pub fn with_failure(mut self, assignment: &str) -> Self {
        self.failing.insert(assignment.to_string());
        self
    }

    /// Append extra results after the default one for `assignment`.
    pub fn with_extra(mut self, assignment: &str, items: Vec<SourceItem>) -> Self {
        self.extra.insert(assignment.to_string(), items);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

pub fn source_for(assignment: &str) -> SourceItem {
    SourceItem::new(
        format!("Source for {}", assignment),
        format!("https://example.test/{}", assignment),
        format!("Snippet about {}", assignment),
    )
}

#[async_trait]
impl SearchPort for MockSearchPort {
    async fn search(
        &self,
        query: &str,
        _mode: SearchMode,
        _credentials: &Credentials,
        token: &RunToken,
    ) -> Result<Vec<SourceItem>> {
        token.check()?;
        self.queries.lock().push(query.to_string());

        let assignment = query.strip_prefix(QUERY_PREFIX).unwrap_or(query).to_string();
        let delay = self
            .delays
            .get(&assignment)
            .copied()
            .unwrap_or(self.default_delay);
        token.sleep(delay).await?;

        if self.failing.contains(&assignment) {
            return Err(AppError::Transport(format!(
                "search backend down for {}",
                assignment
            )));
        }
        if self.empty.contains(&assignment) {
            return Ok(Vec::new());
        }

        let mut results = vec![source_for(&assignment)];
        if let Some(extra) = self.extra.get(&assignment) {
            results.extend(extra.iter().cloned());
        }
        Ok(results)
    }
}
