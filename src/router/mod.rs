//! Semantic tool routing.
//!
//! [`SemanticRouter`] keeps a table of registered tools and their
//! precomputed embeddings. An utterance is embedded through the shared
//! [`CacheManager`] and scored against each candidate with cosine
//! similarity plus the heuristics in [`scoring`]. When similarity is not
//! conclusive, [`SemanticRouter::match_by_suggestion`] asks a completion
//! model to pick a tool by name instead.
//!
//! The table is replaced wholesale by [`SemanticRouter::rebuild`]: readers
//! see either the previous table or the new one, never a mix.

pub mod scoring;
pub mod suggestion;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::providers::{CompletionProvider, RetryPolicy, with_retry};
use crate::telemetry;
use crate::types::{ToolDefinition, ToolMatch, cosine_similarity};
use crate::{MaitreError, Result};

pub use scoring::ScoringConfig;
use scoring::{Utterance, boost, round3};

/// Slack for f32 embedding noise when comparing against the threshold.
const SCORE_EPSILON: f64 = 1e-6;

/// Outcome of a [`SemanticRouter::rebuild`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Tools in the new table.
    pub registered: usize,
    /// Tools with an embedding, i.e. matchable by similarity.
    pub embedded: usize,
    /// Names skipped because an earlier tool already used them.
    pub duplicates: Vec<String>,
    /// Tools with neither description nor example.
    pub without_text: Vec<String>,
    /// Tools whose embedding could not be obtained.
    pub failed: Vec<String>,
}

#[derive(Debug, Default)]
struct ToolTable {
    tools: Vec<ToolDefinition>,
    embeddings: HashMap<String, Vec<f32>>,
}

struct Suggester {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
}

/// Matches utterances to registered tools.
pub struct SemanticRouter {
    cache: Arc<CacheManager>,
    scoring: ScoringConfig,
    suggester: Option<Suggester>,
    table: RwLock<Arc<ToolTable>>,
}

impl std::fmt::Debug for SemanticRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticRouter")
            .field("scoring", &self.scoring)
            .field("tools", &self.snapshot().tools.len())
            .field("suggester", &self.suggester.as_ref().map(|s| s.provider.name()))
            .finish()
    }
}

impl SemanticRouter {
    /// Create a router with an empty tool table.
    pub fn new(cache: Arc<CacheManager>, scoring: ScoringConfig) -> Self {
        Self {
            cache,
            scoring,
            suggester: None,
            table: RwLock::new(Arc::new(ToolTable::default())),
        }
    }

    /// Enable [`match_by_suggestion`](Self::match_by_suggestion).
    #[must_use]
    pub fn with_suggester(mut self, provider: Arc<dyn CompletionProvider>, retry: RetryPolicy) -> Self {
        self.suggester = Some(Suggester { provider, retry });
        self
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    fn snapshot(&self) -> Arc<ToolTable> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Replace the registered tools and their embeddings.
    ///
    /// The first tool with a given name wins. Fails with
    /// [`MaitreError::EmptyRegistry`] when no tool has text to embed; the
    /// previous table is kept in that case. Embedding failures only leave
    /// the affected tools unmatchable.
    pub async fn rebuild(&self, tools: Vec<ToolDefinition>) -> Result<RebuildSummary> {
        let mut summary = RebuildSummary::default();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(tools.len());
        for tool in tools {
            if seen.insert(tool.name.clone()) {
                unique.push(tool);
            } else {
                warn!(tool = %tool.name, "duplicate tool name, keeping the first definition");
                summary.duplicates.push(tool.name);
            }
        }

        let mut texts = Vec::new();
        let mut owners = Vec::new();
        for tool in &unique {
            match tool.embedding_text() {
                Some(text) => {
                    texts.push(text);
                    owners.push(tool.name.clone());
                }
                None => {
                    warn!(tool = %tool.name, "tool has no text to embed");
                    summary.without_text.push(tool.name.clone());
                }
            }
        }
        if texts.is_empty() {
            return Err(MaitreError::EmptyRegistry);
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.cache.embeddings_batch(&refs).await;

        let mut embeddings = HashMap::with_capacity(owners.len());
        for (name, vector) in owners.into_iter().zip(vectors) {
            if vector.is_empty() {
                warn!(tool = %name, "no embedding for tool, it will not match by similarity");
                summary.failed.push(name);
            } else {
                embeddings.insert(name, vector);
            }
        }

        summary.registered = unique.len();
        summary.embedded = embeddings.len();
        let table = Arc::new(ToolTable {
            tools: unique,
            embeddings,
        });
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;

        info!(
            registered = summary.registered,
            embedded = summary.embedded,
            duplicates = summary.duplicates.len(),
            "tool table rebuilt"
        );
        Ok(summary)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn tool(&self, name: &str) -> Option<ToolDefinition> {
        self.snapshot().tools.iter().find(|t| t.name == name).cloned()
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.snapshot().tools.clone()
    }

    /// Registered tools owned by `service`, in registration order.
    pub fn tools_for_service(&self, service: &str) -> Vec<ToolDefinition> {
        self.snapshot()
            .tools
            .iter()
            .filter(|t| t.service.as_deref() == Some(service))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Best-scoring candidate for `utterance`, if confident enough.
    ///
    /// Candidates without a registered embedding of the utterance's
    /// dimension are skipped. Ties keep the earlier candidate.
    pub async fn match_utterance(
        &self,
        utterance: &str,
        candidates: &[ToolDefinition],
    ) -> Option<ToolMatch> {
        if utterance.trim().is_empty() || candidates.is_empty() {
            record_outcome("no_candidate");
            return None;
        }
        let query = self.cache.embedding(utterance).await;
        if query.is_empty() {
            debug!("no embedding for utterance");
            record_outcome("no_candidate");
            return None;
        }

        let table = self.snapshot();
        let features = Utterance::new(utterance);
        let mut best: Option<&ToolDefinition> = None;
        let mut best_score = f64::NEG_INFINITY;
        for candidate in candidates {
            let Some(vector) = table.embeddings.get(&candidate.name) else {
                continue;
            };
            let Some(similarity) = cosine_similarity(&query, vector) else {
                continue;
            };
            let score = similarity + boost(&self.scoring, &features, candidate);
            if score > best_score {
                best_score = score;
                best = Some(candidate);
            }
        }

        let Some(tool) = best else {
            record_outcome("no_candidate");
            return None;
        };
        let confidence = round3(best_score);
        if best_score + SCORE_EPSILON < self.scoring.threshold {
            debug!(tool = %tool.name, confidence, "best candidate below threshold");
            record_outcome("below_threshold");
            return None;
        }

        debug!(tool = %tool.name, confidence, "matched utterance");
        record_outcome("matched");
        Some(ToolMatch {
            tool: tool.clone(),
            confidence,
        })
    }

    /// Ask the completion provider to name the best candidate.
    ///
    /// Returns `None` when no provider is configured, the model answers
    /// `NONE`, names a tool outside `candidates`, or the call fails.
    pub async fn match_by_suggestion(
        &self,
        utterance: &str,
        candidates: &[ToolDefinition],
    ) -> Option<String> {
        let Some(suggester) = &self.suggester else {
            debug!("no completion provider configured for suggestions");
            return None;
        };
        if utterance.trim().is_empty() || candidates.is_empty() {
            return None;
        }

        let prompt = suggestion::build_prompt(utterance, candidates);
        let provider = suggester.provider.name();
        let answer = with_retry(&suggester.retry, provider, "complete", || {
            suggester.provider.complete(&prompt)
        })
        .await;

        let answer = match answer {
            Ok(answer) => answer,
            Err(e) => {
                metrics::counter!(telemetry::EXTERNAL_FAILURES_TOTAL, "operation" => "complete")
                    .increment(1);
                warn!(provider, error = %e, "tool suggestion failed");
                return None;
            }
        };

        match suggestion::parse_answer(&answer, candidates) {
            Ok(name) => name,
            Err(invalid) => {
                warn!(provider, suggested = %invalid, "suggested tool is not a candidate");
                None
            }
        }
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!(telemetry::ROUTER_MATCHES_TOTAL, "outcome" => outcome).increment(1);
}
