//! Shared mock providers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use maitre::providers::{CompletionProvider, EmbeddingProvider};
use maitre::{CacheConfig, CacheManager, Embedding, MaitreError, Result, RetryPolicy};

/// Embedder answering from a fixed text → vector table.
///
/// Unknown texts fail with a permanent error.
pub struct MapEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    pub calls: AtomicU32,
}

impl MapEmbedder {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        Self {
            vectors: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EmbeddingProvider for MapEmbedder {
    fn name(&self) -> &str {
        "map"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.vectors
            .get(text)
            .map(|v| Embedding::new(v.clone(), "map"))
            .ok_or_else(|| MaitreError::InvalidInput(format!("no vector for {text:?}")))
    }
}

/// Embedder that times out for the first `failures` calls, then answers
/// with a vector derived from the text length.
pub struct FlakyEmbedder {
    failures: u32,
    pub calls: AtomicU32,
}

impl FlakyEmbedder {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n < self.failures {
            return Err(MaitreError::Timeout("504 DEADLINE_EXCEEDED".into()));
        }
        Ok(Embedding::new(vec![text.chars().count() as f32, 1.0], "flaky"))
    }
}

/// Completion provider returning a canned answer, or failing when `None`.
pub struct CannedCompletion {
    answer: Option<String>,
    pub calls: AtomicU32,
}

impl CannedCompletion {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionProvider for CannedCompletion {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.answer.clone().ok_or(MaitreError::AuthenticationFailed)
    }
}

/// Retry policy with millisecond delays.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new().initial_delay(Duration::from_millis(1))
}

/// Cache manager rooted in a fresh temporary directory.
pub fn manager(embedder: Arc<dyn EmbeddingProvider>) -> (TempDir, Arc<CacheManager>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let manager = manager_at(&tmp, CacheConfig::new(), embedder);
    (tmp, manager)
}

/// Cache manager rooted under `tmp`, keeping the rest of `config`.
pub fn manager_at(
    tmp: &TempDir,
    config: CacheConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<CacheManager> {
    let config = config.root(tmp.path().join("cache")).retry(fast_retry());
    Arc::new(CacheManager::new(config, embedder).expect("cache manager"))
}
