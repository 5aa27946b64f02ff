//! # Triad - multi-agent research pipeline
//!
//! Turns a free-text research topic into a cited Markdown report using three
//! cooperating language-model agents:
//!
//! - a **planner** that splits the topic into research assignments,
//! - one **researcher** per assignment, all running concurrently, each
//!   searching for sources and synthesizing them,
//! - a **writer** that combines every finding into the final report.
//!
//! ## Overview
//!
//! Triad can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `triad` binary
//! 2. **As a library** - Embed [`ResearchPipeline`] and consume its event stream
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use triad::{MemorySink, ResearchPipeline, RunToken, TriadConfig};
//!
//! #[tokio::main]
//! async fn main() -> triad::Result<()> {
//!     let config = TriadConfig::load("triad.toml")?;
//!     let credentials = config.resolve_credentials();
//!     let run = config.run_configuration(Some("Solar microgrids"), None, credentials.clone())?;
//!
//!     let pipeline = ResearchPipeline::from_config(&config, &credentials)?;
//!     let sink = Arc::new(MemorySink::new());
//!     let outcome = pipeline.run(&run, &RunToken::new(), sink.clone()).await;
//!
//!     if let Some(report) = outcome.report() {
//!         println!("{}", report);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`research`] - Pipeline orchestration, cancellation, events, plan parsing
//! - [`llm`] - Model invocation port and the Ollama / Gemini clients
//! - [`tools`] - Search port, Tavily client and stand-in result sets
//! - [`utils`] - `triad.toml` configuration
//! - [`types`] - Common types and error handling
//! - [`cli`] - Command-line front end

#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface for the `triad` binary.
pub mod cli;
/// Model provider clients and abstractions.
pub mod llm;
/// Multi-agent research pipeline.
pub mod research;
/// Search backends.
pub mod tools;
/// Core types (bindings, events, outcomes, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, ModelPort, ModelRouter, Provider};
pub use research::{
    ChannelSink, EventSink, MemorySink, PipelineSettings, ResearchPipeline, RunHandle, RunToken,
};
pub use tools::{SearchPort, SearchRouter};
pub use types::{
    AgentBindings, AgentRole, AppError, Credentials, ErrorKind, EventPayload, Finding,
    ModelBinding, ModelProvider, ProgressEvent, Result, RunConfiguration, RunEvent, RunOutcome,
    RunState, RunStatus, SearchMode, SourceItem,
};
pub use utils::toml_config::TriadConfig;
