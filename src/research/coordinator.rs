use super::cancel::RunToken;
use super::citations::aggregate;
use super::events::{EventEmitter, EventSink};
use super::planner::{parse_plan, PlanSource};
use super::prompts::{planner_prompt, writer_prompt};
use super::worker::{require_credential, research_assignment, ResearchEnv};
use crate::llm::{ModelPort, ModelRouter};
use crate::tools::{SearchPort, SearchRouter};
use crate::types::{
    AgentRole, AppError, Credentials, Finding, Result, RunConfiguration, RunOutcome, RunState,
    RunStatus,
};
use crate::utils::TriadConfig;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

/// Message used for the stop notice and the `Stopped` outcome.
pub const STOPPED_BY_USER: &str = "Process stopped by user.";

/// Pacing between stage announcements. Purely cosmetic: zero is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub stage_delay: Duration,
    /// Delay before each researcher task starts working
    pub researcher_stagger: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stage_delay: Duration::from_millis(1000),
            researcher_stagger: Duration::from_millis(500),
        }
    }
}

impl PipelineSettings {
    pub fn immediate() -> Self {
        Self {
            stage_delay: Duration::ZERO,
            researcher_stagger: Duration::ZERO,
        }
    }
}

/// Planner → parallel researchers → writer.
#[derive(Clone)]
pub struct ResearchPipeline {
    models: Arc<dyn ModelPort>,
    search: Arc<dyn SearchPort>,
    settings: PipelineSettings,
}

impl ResearchPipeline {
    pub fn new(models: Arc<dyn ModelPort>, search: Arc<dyn SearchPort>) -> Self {
        Self {
            models,
            search,
            settings: PipelineSettings::default(),
        }
    }

    /// Wire the production backends described by `config`.
    pub fn from_config(config: &TriadConfig, credentials: &Credentials) -> Result<Self> {
        let models = Arc::new(ModelRouter::from_config(config, credentials)?);
        let search = Arc::new(SearchRouter::from_config(config));
        Ok(Self::new(models, search).with_settings(config.pacing.pipeline_settings()))
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Start a run on the tokio runtime. The returned handle owns the run's
    /// cancellation token.
    pub fn spawn(&self, config: RunConfiguration, sink: Arc<dyn EventSink>) -> RunHandle {
        let run_id = Uuid::new_v4();
        let token = RunToken::new();
        let (status_tx, status_rx) = watch::channel(RunStatus::default());

        let pipeline = self.clone();
        let run_token = token.clone();
        let join = tokio::spawn(async move {
            pipeline
                .execute(run_id, &config, &run_token, sink, status_tx)
                .await
        });

        RunHandle {
            run_id,
            token,
            status: status_rx,
            join,
        }
    }

    /// Drive one run to completion on the current task. Emits every event,
    /// including the outcome, to `sink` and also returns the outcome.
    pub async fn run(
        &self,
        config: &RunConfiguration,
        token: &RunToken,
        sink: Arc<dyn EventSink>,
    ) -> RunOutcome {
        let (status_tx, _status_rx) = watch::channel(RunStatus::default());
        self.execute(Uuid::new_v4(), config, token, sink, status_tx)
            .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        config: &RunConfiguration,
        token: &RunToken,
        sink: Arc<dyn EventSink>,
        status: watch::Sender<RunStatus>,
    ) -> RunOutcome {
        let span = tracing::info_span!("research_run", run_id = %run_id);
        async move {
            tracing::info!(topic = %config.topic, mode = %config.search_mode, "research run started");

            let emitter = Arc::new(EventEmitter::new(run_id, sink));
            let mut tracker = StageTracker::new(status);
            let config = Arc::new(config.clone());

            let result = self.drive(&config, token, &emitter, &mut tracker).await;

            let outcome = match result {
                Ok(report) => RunOutcome::Completed { report },
                Err(e) if e.is_cancelled() || token.is_cancelled() => {
                    if tracker.started() {
                        emitter.progress(tracker.attribution(), STOPPED_BY_USER);
                    }
                    RunOutcome::Stopped {
                        reason: STOPPED_BY_USER.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, kind = ?e.kind(), "research run failed");
                    emitter.progress(tracker.attribution(), format!("Error: {}", e));
                    RunOutcome::Failed {
                        error: e.kind(),
                        detail: format!("{}: {}", e.kind().category(), e),
                    }
                }
            };

            tracker.finish(outcome.state());
            emitter.finish(outcome.clone());
            tracing::info!(state = ?outcome.state(), "research run finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        config: &Arc<RunConfiguration>,
        token: &RunToken,
        emitter: &Arc<EventEmitter>,
        tracker: &mut StageTracker,
    ) -> Result<String> {
        token.check()?;

        // 1. Planner
        tracker.enter(RunState::Planning, AgentRole::Planner);
        emitter.progress(
            AgentRole::Planner,
            "Breaking down research topic into sub-assignments...",
        );
        token.sleep(self.settings.stage_delay).await?;

        let raw_plan = self
            .invoke(config, AgentRole::Planner, &planner_prompt(&config.topic), token)
            .await?;
        let plan = parse_plan(&raw_plan);
        match &plan.source {
            PlanSource::Json => {
                emitter.progress(
                    AgentRole::Planner,
                    format!(
                        "Research assignments generated: {} tasks.",
                        plan.assignments.len()
                    ),
                );
                emitter.progress(
                    AgentRole::Planner,
                    format!("Full plan received:\n{}", raw_plan),
                );
            }
            PlanSource::Fallback { reason } => {
                emitter.progress(
                    AgentRole::Planner,
                    format!(
                        "Could not parse JSON from planner, falling back to phase-based research. Error: {}",
                        reason
                    ),
                );
            }
        }
        tracing::info!(assignments = plan.assignments.len(), fallback = plan.is_fallback(), "plan parsed");
        token.check()?;

        // 2. Researchers, in parallel
        tracker.enter(RunState::Researching, AgentRole::Researcher);
        emitter.progress(
            AgentRole::Researcher,
            format!(
                "Dispatching {} research agents to work in parallel...",
                plan.assignments.len()
            ),
        );

        let env = ResearchEnv {
            models: self.models.clone(),
            search: self.search.clone(),
            emitter: emitter.clone(),
            config: config.clone(),
            token: token.clone(),
            stagger: self.settings.researcher_stagger,
        };
        let findings = fan_out(env, plan.assignments).await?;
        let research = aggregate(findings);

        emitter.progress(
            AgentRole::Researcher,
            format!(
                "All research agents have completed their tasks. Total sources collected: {}.",
                research.total_sources()
            ),
        );
        token.check()?;

        // 3. Writer
        tracker.enter(RunState::Writing, AgentRole::Writer);
        emitter.progress(
            AgentRole::Writer,
            "Synthesizing all research notes into the final report...",
        );
        token.sleep(self.settings.stage_delay).await?;

        let prompt = writer_prompt(&config.topic, &research.notes, &research.sources_list());
        let report = self.invoke(config, AgentRole::Writer, &prompt, token).await?;
        emitter.progress(AgentRole::Writer, "Final report has been generated.");

        Ok(report)
    }

    async fn invoke(
        &self,
        config: &RunConfiguration,
        role: AgentRole,
        prompt: &str,
        token: &RunToken,
    ) -> Result<String> {
        require_credential(config, role)?;
        self.models
            .invoke(config.binding_for(role), prompt, token)
            .await
    }
}

/// Run one researcher task per assignment and wait for all of them.
///
/// When several tasks fail, the error of the lowest assignment index is
/// reported. A fired token wins over any task error.
async fn fan_out(env: ResearchEnv, assignments: Vec<String>) -> Result<Vec<(usize, Finding)>> {
    let token = env.token.clone();
    let count = assignments.len();
    let mut set = JoinSet::new();

    for (index, assignment) in assignments.into_iter().enumerate() {
        let env = env.clone();
        set.spawn(async move {
            let result = AssertUnwindSafe(research_assignment(env, index, assignment))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(AppError::Internal(format!(
                        "research task {} panicked: {}",
                        index + 1,
                        panic_message(panic.as_ref())
                    )))
                });
            (index, result)
        });
    }

    let mut slots: Vec<Option<Result<Finding>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Err(e) = &result {
                    tracing::debug!(assignment = index, error = %e, "research task settled with error");
                }
                slots[index] = Some(result);
            }
            Err(e) => tracing::error!(error = %e, "research task could not be joined"),
        }
    }

    token.check()?;

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(result) => result.map(|finding| (index, finding)),
            None => Err(AppError::Internal(format!(
                "research task {} did not report a result",
                index + 1
            ))),
        })
        .collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owns the observer-facing status. Only the orchestrator touches it.
struct StageTracker {
    status: watch::Sender<RunStatus>,
    last_role: Option<AgentRole>,
}

impl StageTracker {
    fn new(status: watch::Sender<RunStatus>) -> Self {
        status.send_replace(RunStatus::default());
        Self {
            status,
            last_role: None,
        }
    }

    fn enter(&mut self, state: RunState, role: AgentRole) {
        self.last_role = Some(role);
        self.status.send_replace(RunStatus {
            state,
            active_role: Some(role),
        });
        tracing::debug!(?state, %role, "stage entered");
    }

    fn started(&self) -> bool {
        self.last_role.is_some()
    }

    /// Role terminal events are attributed to.
    fn attribution(&self) -> AgentRole {
        self.status
            .borrow()
            .active_role
            .or(self.last_role)
            .unwrap_or(AgentRole::Planner)
    }

    fn finish(&mut self, state: RunState) {
        self.status.send_replace(RunStatus {
            state,
            active_role: None,
        });
    }
}

/// Handle to a run started with [`ResearchPipeline::spawn`].
pub struct RunHandle {
    run_id: Uuid,
    token: RunToken,
    status: watch::Receiver<RunStatus>,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> RunToken {
        self.token.clone()
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.clone()
    }

    /// Wait for the run's outcome.
    pub async fn wait(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "research run task aborted");
                RunOutcome::Failed {
                    error: crate::types::ErrorKind::Internal,
                    detail: format!("research run task aborted: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_pacing_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.stage_delay, Duration::from_millis(1000));
        assert_eq!(settings.researcher_stagger, Duration::from_millis(500));
        assert!(PipelineSettings::immediate().stage_delay.is_zero());
    }

    #[test]
    fn test_tracker_attribution_falls_back_to_last_role() {
        let (tx, rx) = watch::channel(RunStatus::default());
        let mut tracker = StageTracker::new(tx);
        assert!(!tracker.started());
        assert_eq!(tracker.attribution(), AgentRole::Planner);

        tracker.enter(RunState::Researching, AgentRole::Researcher);
        assert_eq!(rx.borrow().active_role, Some(AgentRole::Researcher));

        tracker.finish(RunState::Stopped);
        assert_eq!(rx.borrow().active_role, None);
        assert_eq!(rx.borrow().state, RunState::Stopped);
        assert_eq!(tracker.attribution(), AgentRole::Researcher);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
