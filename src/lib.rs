//! Maitre - caching and semantic tool routing for restaurant agents
//!
//! This crate sits beneath conversational agents and provides:
//!
//! - a [`CacheManager`] memoizing records files, tools files and text
//!   embeddings in RAM and on disk, with source-file staleness checks,
//!   disk quotas, and retried, batched embedding calls;
//! - a [`SemanticRouter`] matching a free-text utterance to the best
//!   registered tool by cosine similarity plus domain heuristics, with an
//!   optional completion-model fallback.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maitre::{CacheConfig, CacheManager, ScoringConfig, SemanticRouter};
//! use maitre::providers::GeminiClient;
//!
//! #[tokio::main]
//! async fn main() -> maitre::Result<()> {
//!     let gemini = Arc::new(GeminiClient::new("your-google-api-key")?);
//!     let cache = Arc::new(CacheManager::new(CacheConfig::new(), gemini)?);
//!
//!     let tools = cache.filtered_tools("data/tools.json", "customer", &[], None);
//!     let router = SemanticRouter::new(cache.clone(), ScoringConfig::default());
//!     router.rebuild(tools.clone()).await?;
//!
//!     if let Some(m) = router.match_utterance("cho tôi xem thực đơn", &tools).await {
//!         println!("{} ({:.3})", m.tool.name, m.confidence);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod providers;
pub mod router;
pub mod telemetry;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheManager, CacheStats, ResourceKind};
pub use error::{MaitreError, Result};
pub use providers::{CompletionProvider, EmbeddingProvider, RetryPolicy};
pub use router::{RebuildSummary, ScoringConfig, SemanticRouter};

pub use types::{Embedding, Record, ToolDefinition, ToolMatch, cosine_similarity};

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
