//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `maitre_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind`: resource kind: "records", "tools", "embedding"
//! - `tier`: cache tier that served a hit: "ram" or "disk"
//! - `provider`: external provider name (e.g. "gemini")
//! - `operation`: external call (e.g. "embed", "embed_batch", "complete")
//! - `outcome`: router result: "matched", "below_threshold", "no_candidate"

/// Total cache hits.
///
/// Labels: `kind`, `tier` ("ram" | "disk").
pub const CACHE_HITS_TOTAL: &str = "maitre_cache_hits_total";

/// Total cache misses (lookups that had to go to the source of truth).
///
/// Labels: `kind`.
pub const CACHE_MISSES_TOTAL: &str = "maitre_cache_misses_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "maitre_retries_total";

/// Total external calls that ended in an empty fallback result.
///
/// Labels: `operation`.
pub const EXTERNAL_FAILURES_TOTAL: &str = "maitre_external_failures_total";

/// Total cache files removed by disk-quota cleanup.
///
/// Labels: `kind`.
pub const DISK_EVICTIONS_TOTAL: &str = "maitre_disk_evictions_total";

/// Total router match attempts.
///
/// Labels: `outcome`.
pub const ROUTER_MATCHES_TOTAL: &str = "maitre_router_matches_total";
