//! Provider traits for the external services the cache and router call.
//!
//! Providers implement capability-specific traits rather than a single
//! client type, so tests and alternative backends plug in at the same
//! seam as the production HTTP client, and decorators such as
//! [`RateLimitedCompletionProvider`](super::RateLimitedCompletionProvider)
//! compose freely.
//!
//! Errors are classified by [`MaitreError::is_transient()`](crate::MaitreError::is_transient);
//! providers should map deadline and timeout failures to
//! [`MaitreError::Timeout`](crate::MaitreError::Timeout) so callers retry them.

use async_trait::async_trait;

use crate::Result;
use crate::types::Embedding;

// ============================================================================
// Embedding Provider
// ============================================================================

/// Provider for text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts, one per input, in order.
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

// ============================================================================
// Completion Provider
// ============================================================================

/// Provider for single-turn text completion (used for tool suggestions).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Complete a prompt and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingEmbedder {
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        async fn embed(&self, text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(Embedding::new(vec![text.len() as f32], "test"))
        }
    }

    #[tokio::test]
    async fn default_batch_is_sequential_and_ordered() {
        let provider = CountingEmbedder {
            calls: AtomicU32::new(0),
        };
        let out = provider.embed_batch(&["a", "bbb", "cc"]).await.unwrap();
        let values: Vec<f32> = out.iter().map(|e| e.values[0]).collect();
        assert_eq!(values, vec![1.0, 3.0, 2.0]);
        assert_eq!(provider.calls.load(Ordering::Relaxed), 3);
    }
}
