//! Wiring for the `maitre` binary.
//!
//! Builds the shared [`CacheManager`] and a [`SemanticRouter`] backed by
//! Gemini from a loaded [`Config`].

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::cache::CacheManager;
use crate::providers::{GeminiClient, RateLimitedCompletionProvider, RateLimiter};
use crate::router::SemanticRouter;

pub use config::Config;

/// Build the cache manager and router described by `config`.
pub fn build(config: &Config, api_key: &str) -> Result<(Arc<CacheManager>, SemanticRouter)> {
    let gemini = match &config.gemini.base_url {
        Some(url) => GeminiClient::with_base_url(api_key, url)?,
        None => GeminiClient::new(api_key)?,
    }
    .embedding_model(&config.gemini.embedding_model)
    .chat_model(&config.gemini.chat_model);

    let retry = config.retry.to_policy();
    let cache = Arc::new(CacheManager::new(
        config.cache.to_cache_config(retry.clone()),
        Arc::new(gemini.clone()),
    )?);

    let limiter = RateLimiter::new(config.gemini.requests_per_minute, Duration::from_secs(60));
    let suggester = RateLimitedCompletionProvider::new(Arc::new(gemini), limiter);
    let router = SemanticRouter::new(cache.clone(), config.router.to_scoring())
        .with_suggester(Arc::new(suggester), retry);

    Ok((cache, router))
}
