//! Telemetry metric name constants.
//!
//! Centralised metric names for souschef operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `souschef_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: generative backend name (e.g. "gemini", "ollama")
//! - `operation`: what was invoked (e.g. "generate", "download_image")
//! - `status`: "ok" or "error"
//! - `namespace`: cache key namespace (e.g. "ingredients", "recipes")

/// Total generation requests dispatched to a backend (after retries).
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const GENERATION_REQUESTS_TOTAL: &str = "souschef_generation_requests_total";

/// Generation duration in seconds, retries and backoff included.
///
/// Labels: `provider`.
pub const GENERATION_DURATION_SECONDS: &str = "souschef_generation_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "souschef_retries_total";

/// Total cache hits.
///
/// Labels: `namespace`.
pub const CACHE_HITS_TOTAL: &str = "souschef_cache_hits_total";

/// Total cache misses.
///
/// Labels: `namespace`.
pub const CACHE_MISSES_TOTAL: &str = "souschef_cache_misses_total";

/// Cache backend failures swallowed by the store.
///
/// Labels: `operation` ("get" | "set" | "delete" | "exists").
pub const CACHE_ERRORS_TOTAL: &str = "souschef_cache_errors_total";

/// Requests refused by the rate limiter.
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "souschef_rate_limit_rejections_total";

/// Admission checks served by the in-memory limiter because the
/// distributed backend failed.
pub const RATE_LIMIT_FALLBACKS_TOTAL: &str = "souschef_rate_limit_fallbacks_total";

/// List extractions that fell back to the line heuristic.
pub const EXTRACTION_FALLBACKS_TOTAL: &str = "souschef_extraction_fallbacks_total";

/// Extract the namespace portion of a cache key for metric labels.
pub(crate) fn key_namespace(key: &str) -> String {
    key.split(':').next().unwrap_or(key).to_owned()
}
