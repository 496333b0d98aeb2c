// Retry policy
// Exponential backoff: 30s * 2^retry_count, capped at 10 minutes. A job
// whose budget is spent dead-letters on its next failure, so a job makes
// max_retries + 1 attempts in total.

use crate::domain::Job;
use tracing::warn;

/// Base backoff delay for the first retry (30s)
pub const RETRY_BASE_DELAY_MS: i64 = 30_000;

/// Backoff ceiling (10 minutes)
pub const RETRY_MAX_DELAY_MS: i64 = 600_000;

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the job (with backoff delay in ms)
    Retry(i64),
    /// Budget exhausted; dead-letter the job
    DeadLetter,
}

/// Backoff for a failure arriving with the given retry count.
pub fn backoff_ms(retry_count: i32) -> i64 {
    // 2^retry_count saturates well past the cap; clamp the shift so the
    // multiplication cannot overflow
    let exp = retry_count.clamp(0, 30) as u32;
    RETRY_BASE_DELAY_MS
        .saturating_mul(1_i64 << exp)
        .min(RETRY_MAX_DELAY_MS)
}

/// Decide what to do with a job whose attempt just failed.
pub fn should_retry(job: &Job) -> RetryDecision {
    if job.retries_exhausted() {
        warn!(
            job_id = %job.id,
            retry_count = %job.retry_count,
            max_retries = %job.max_retries,
            "Retry budget exhausted"
        );
        return RetryDecision::DeadLetter;
    }

    RetryDecision::Retry(backoff_ms(job.retry_count))
}
