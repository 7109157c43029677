//! Telemetry metric name constants.
//!
//! Centralised metric names for hermod operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `hermod_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method` — HTTP method ("GET", "POST", ...)
//! - `status` — outcome: "ok" or "error"
//! - `trigger` — what started a query fetch: "subscribe", "invalidate" or "refetch"
//! - `cache` — which cache: "query" or "document"

/// Total HTTP requests issued by the adapter (including 401 retries).
///
/// Labels: `method`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "hermod_requests_total";

/// HTTP request duration in seconds.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "hermod_request_duration_seconds";

/// Total token refresh cycles performed by the adapter.
///
/// Labels: `status` ("ok" | "error").
pub const TOKEN_REFRESHES_TOTAL: &str = "hermod_token_refreshes_total";

/// Total fetches started by the query store.
///
/// Labels: `trigger` ("subscribe" | "invalidate" | "refetch").
pub const QUERY_FETCHES_TOTAL: &str = "hermod_query_fetches_total";

/// Total cache hits.
///
/// Labels: `cache` ("query" | "document").
pub const CACHE_HITS_TOTAL: &str = "hermod_cache_hits_total";

/// Total cache misses.
///
/// Labels: `cache` ("query" | "document").
pub const CACHE_MISSES_TOTAL: &str = "hermod_cache_misses_total";

/// Total mutations dispatched.
///
/// Labels: `status` ("ok" | "error").
pub const MUTATIONS_TOTAL: &str = "hermod_mutations_total";
