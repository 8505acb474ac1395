//! Client-side rate limiting for quota-bound LLM APIs.
//!
//! A sliding-window limiter allowing at most `max_requests` calls per
//! `window`. Callers that find the window full wait until the oldest
//! request ages out rather than failing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

use super::traits::CompletionProvider;
use crate::Result;

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: usize = 8;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut requests = self.requests.lock().await;
                let now = Instant::now();
                while requests
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    requests.pop_front();
                }
                if requests.len() < self.max_requests {
                    requests.push_back(now);
                    return;
                }
                match requests.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            info!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests currently counted against the window.
    pub async fn in_flight(&self) -> usize {
        let requests = self.requests.lock().await;
        let now = Instant::now();
        requests
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

/// Decorator that rate-limits a [`CompletionProvider`].
pub struct RateLimitedCompletionProvider {
    inner: Arc<dyn CompletionProvider>,
    limiter: RateLimiter,
}

impl RateLimitedCompletionProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl CompletionProvider for RateLimitedCompletionProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.limiter.acquire().await;
        self.inner.complete(prompt).await
    }
}
