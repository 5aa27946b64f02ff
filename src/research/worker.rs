//! Researcher task: search, synthesize, report one finding.

use super::cancel::RunToken;
use super::events::EventEmitter;
use super::prompts::{assignment_label, researcher_prompt, search_query};
use crate::llm::ModelPort;
use crate::tools::{is_live_search, SearchPort};
use crate::types::{
    AgentRole, AppError, EventPayload, Finding, Result, RunConfiguration, SourceItem,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Everything a researcher task needs, owned so the task can be spawned.
#[derive(Clone)]
pub(crate) struct ResearchEnv {
    pub models: Arc<dyn ModelPort>,
    pub search: Arc<dyn SearchPort>,
    pub emitter: Arc<EventEmitter>,
    pub config: Arc<RunConfiguration>,
    pub token: RunToken,
    pub stagger: Duration,
}

/// Fail with [`AppError::Auth`] if `role`'s binding needs a credential the
/// run does not carry.
pub(crate) fn require_credential(config: &RunConfiguration, role: AgentRole) -> Result<()> {
    let binding = config.binding_for(role);
    match binding.provider.required_credential() {
        Some(key) if !config.credentials.contains(key) => Err(AppError::Auth(format!(
            "the {} agent is bound to hosted model '{}', but no API key was provided \
             (missing credential '{}'). Provide a key or select a local model.",
            role, binding.model, key
        ))),
        _ => Ok(()),
    }
}

/// Drop repeated `(title, url)` pairs, keeping first occurrences in order.
pub(crate) fn dedupe_sources(results: Vec<SourceItem>) -> Vec<SourceItem> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        results.iter().map(|item| seen.insert(item.identity())).collect()
    };
    results
        .into_iter()
        .zip(keep)
        .filter_map(|(item, first)| first.then_some(item))
        .collect()
}

pub(crate) async fn research_assignment(
    env: ResearchEnv,
    index: usize,
    assignment: String,
) -> Result<Finding> {
    let label = assignment_label(&assignment);
    let narrate = |message: &str| {
        env.emitter
            .progress(AgentRole::Researcher, format!("[{}] {}", label, message));
    };
    let token = &env.token;
    let config = env.config.as_ref();

    token.check()?;
    token.sleep(env.stagger).await?;
    narrate("Starting research...");

    if is_live_search(config.search_mode, &config.credentials) {
        narrate("Executing remote search...");
    } else {
        narrate("Executing simulated search...");
    }

    token.check()?;
    let results = env
        .search
        .search(
            &search_query(&assignment),
            config.search_mode,
            &config.credentials,
            token,
        )
        .await?;
    let sources = dedupe_sources(results);

    env.emitter.progress_with(
        AgentRole::Researcher,
        format!("[{}] Found {} sources.", label, sources.len()),
        EventPayload::SearchResults(sources.clone()),
    );

    token.check()?;
    if sources.is_empty() {
        tracing::info!(assignment = index, "no sources found, skipping synthesis");
        narrate("No sources found; skipping synthesis.");
        narrate("Research on this topic is complete.");
        return Ok(Finding::empty(assignment));
    }

    narrate(&format!("Synthesizing {} sources...", sources.len()));
    require_credential(config, AgentRole::Researcher)?;
    let prompt = researcher_prompt(&config.topic, &assignment, &sources);
    let synthesis = env
        .models
        .invoke(config.binding_for(AgentRole::Researcher), &prompt, token)
        .await?;

    let finding = Finding::new(assignment, sources, synthesis);
    env.emitter.progress_with(
        AgentRole::Researcher,
        format!("[{}] Research notes ready.", label),
        EventPayload::SourceDocument(finding.clone()),
    );
    narrate("Research on this topic is complete.");

    tracing::info!(
        assignment = index,
        sources = finding.sources().len(),
        "research task complete"
    );
    Ok(finding)
}
