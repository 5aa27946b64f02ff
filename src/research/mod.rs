//! Multi-Agent Research Pipeline
//!
//! Coordinates three agent roles that turn a research topic into a cited
//! Markdown report:
//!
//! 1. **Planner** - breaks the topic into research assignments
//! 2. **Researchers** - one concurrent task per assignment; each searches,
//!    then synthesizes its sources in a single model call
//! 3. **Writer** - turns the aggregated notes into the final report, citing
//!    only sources that were actually retrieved
//!
//! # Architecture
//!
//! - [`ResearchPipeline`] sequences the stages and owns run state
//! - [`RunToken`] is threaded through every suspension point
//! - [`EventSink`] receives the progress stream and exactly one outcome
//! - [`planner`] and [`citations`] are the pure parts: plan parsing and
//!   deterministic source ordering
//!
//! # Usage
//!
//! ```ignore
//! use triad::research::{ChannelSink, ResearchPipeline};
//!
//! let pipeline = ResearchPipeline::from_config(&config, &credentials)?;
//! let (sink, mut events) = ChannelSink::new();
//! let handle = pipeline.spawn(run_config, Arc::new(sink));
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! let outcome = handle.wait().await;
//! ```

/// Run-scoped cancellation token.
pub mod cancel;
/// Citation aggregation across findings.
pub mod citations;
/// Stage sequencing, fan-out and the run handle.
pub mod coordinator;
/// Event sinks and sequencing.
pub mod events;
/// Planner output parsing.
pub mod planner;
/// Prompt templates.
pub mod prompts;
mod worker;

pub use cancel::RunToken;
pub use citations::{aggregate, AggregatedResearch, Citation};
pub use coordinator::{PipelineSettings, ResearchPipeline, RunHandle, STOPPED_BY_USER};
pub use events::{ChannelSink, EventSink, MemorySink};
pub use planner::{parse_plan, ParsedPlan, PlanSource};
