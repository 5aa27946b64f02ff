//! Model Provider Clients and Abstractions
//!
//! The pipeline talks to models only through [`ModelPort`]. [`ModelRouter`]
//! is the production implementation: it owns one [`LLMClient`] per provider
//! family and picks one from the role's [`ModelBinding`](crate::types::ModelBinding).
//!
//! # Supported Providers
//!
//! | Provider | Backend | Credential |
//! |----------|---------|------------|
//! | Local | Ollama `/api/chat` | none |
//! | Hosted | Gemini `generateContent` | `GEMINI_API_KEY` (configurable) |
//!
//! # Example
//!
//! ```ignore
//! use triad::llm::{ModelPort, ModelRouter};
//!
//! let router = ModelRouter::from_config(&config, &credentials)?;
//! let text = router.invoke(&binding, "What is 2+2?", &token).await?;
//! ```

/// Core client traits and the provider router.
pub mod client;
/// Hosted Gemini client.
pub mod gemini;
/// Local Ollama client.
pub mod ollama;

pub use client::{LLMClient, ModelPort, ModelRouter, Provider};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Model identifiers known to work with the local provider.
pub const LOCAL_MODELS: &[&str] = &["llama3.2", "mistral", "gemma3"];

/// Model identifiers known to work with the hosted provider.
pub const HOSTED_MODELS: &[&str] = &["gemini-2.5-flash"];
