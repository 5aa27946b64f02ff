//! Retrieval tools used by the researcher agents
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - the [`SearchPort`] capability, the Tavily
//!   client and the stand-in result sets
//!
//! # Web Search
//!
//! ```ignore
//! let router = SearchRouter::from_config(&config);
//! let results = router
//!     .search("grid storage", SearchMode::Remote, &credentials, &token)
//!     .await?;
//! for result in results {
//!     println!("{}: {}", result.title, result.url);
//! }
//! ```

/// Web search via Tavily with stand-in fallbacks.
pub mod search;

pub use search::{is_live_search, SearchPort, SearchRouter, TavilyClient};
