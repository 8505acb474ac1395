//! External service providers.
//!
//! The cache and router only see the capability traits in [`traits`].
//! [`retry`] and [`rate_limit`] wrap calls to any provider; the concrete
//! Gemini client lives behind the `gemini` feature.

pub mod rate_limit;
pub mod retry;
pub mod traits;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use rate_limit::{RateLimitedCompletionProvider, RateLimiter};
pub use retry::{RetryPolicy, with_retry};
pub use traits::{CompletionProvider, EmbeddingProvider};

#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
