// Per-tenant admission policy
// The constants are policy, not configuration: 10 submissions per rolling
// 60s window, 5 jobs in flight.

/// Submissions allowed per tenant per window
pub const RATE_LIMIT_MAX_PER_WINDOW: i64 = 10;

/// Sliding-window length for the submission limiter
pub const RATE_LIMIT_WINDOW_MS: i64 = 60_000;

/// Maximum running jobs per tenant
pub const MAX_CONCURRENT_PER_TENANT: i64 = 5;

/// 429 message for the submission-rate cap
pub const RATE_LIMIT_MESSAGE: &str = "Maximum 10 jobs per minute allowed";

/// 429 message for the concurrency cap
pub const CONCURRENCY_LIMIT_MESSAGE: &str = "Maximum 5 concurrent jobs allowed";

/// Concurrency check: deny iff the tenant is already at the in-flight cap.
///
/// Fed by a live count from the durable store; unlike the rate gate this
/// never fails open.
pub fn concurrency_allowed(running_count: i64) -> bool {
    running_count < MAX_CONCURRENT_PER_TENANT
}
