//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod mocks;

use mocks::{MockModelPort, MockSearchPort, PLANNER_MODEL, RESEARCHER_MODEL, WRITER_MODEL};
use std::sync::Arc;
use triad::types::{AgentBindings, Credentials, ModelBinding, RunConfiguration, SearchMode};
use triad::{PipelineSettings, ResearchPipeline};

/// Each role bound to its own local mock model.
pub fn bindings() -> AgentBindings {
    AgentBindings {
        planner: ModelBinding::local(PLANNER_MODEL),
        researcher: ModelBinding::local(RESEARCHER_MODEL),
        writer: ModelBinding::local(WRITER_MODEL),
    }
}

pub fn run_config(topic: &str) -> RunConfiguration {
    RunConfiguration::new(topic, bindings(), SearchMode::Local, Credentials::new())
}

/// Pipeline over the mocks with every pacing delay disabled.
pub fn pipeline(models: Arc<MockModelPort>, search: Arc<MockSearchPort>) -> ResearchPipeline {
    ResearchPipeline::new(models, search).with_settings(PipelineSettings::immediate())
}
