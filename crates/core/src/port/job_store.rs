// Job Store Port (Interface)

use crate::domain::{DeadLetterEntry, Job, JobId, JobStatus};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Per-status job counts; buckets with no rows are reported as 0, never
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Aggregated queue state for dashboards and the metrics endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub jobs_total: i64,
    pub jobs_by_status: StatusCounts,
    pub dlq_size: i64,
}

/// Durable store interface for Job persistence.
///
/// The store is the single source of truth; workers never cache job state
/// between iterations. `claim_next` is the one operation that must be atomic
/// against concurrent callers. The settle operations (`complete`,
/// `schedule_retry`, `dead_letter`) are guarded on the caller still holding
/// the lease and return whether the guard held.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. A duplicate idempotency key surfaces as
    /// `AppError::Conflict`.
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Find job by idempotency key
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Job>>;

    /// Atomically claim the next eligible job for `worker_id`: FIFO over
    /// released pending jobs and expired-lease running jobs. Returns the job
    /// already transitioned to running, or None when the queue is empty.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>>;

    /// Acknowledge success. Returns false if the lease was no longer held.
    async fn complete(&self, id: &JobId, worker_id: &str) -> Result<bool>;

    /// Release the job for another attempt: pending again, retry count
    /// incremented, `created_at` rewritten to `release_at`. Returns false if
    /// the lease was no longer held.
    async fn schedule_retry(
        &self,
        id: &JobId,
        worker_id: &str,
        error_message: &str,
        release_at: i64,
    ) -> Result<bool>;

    /// Terminal failure: insert the dead-letter entry and mark the job
    /// failed in one transaction. Returns false if the lease was no longer
    /// held (nothing is written in that case).
    async fn dead_letter(
        &self,
        entry_id: &str,
        id: &JobId,
        worker_id: &str,
        final_error: &str,
    ) -> Result<bool>;

    /// Dead-letter entry for a job, if any
    async fn find_dead_letter(&self, job_id: &JobId) -> Result<Option<DeadLetterEntry>>;

    /// Most recent jobs for a tenant, newest first, optionally filtered by
    /// status
    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<Job>>;

    /// Count of running jobs for a tenant (feeds the concurrency cap)
    async fn count_running(&self, tenant_id: &str) -> Result<i64>;

    /// Aggregate counts, scoped to one tenant when given. The DLQ count is
    /// scoped through the parent job's tenant.
    async fn metrics(&self, tenant_id: Option<&str>) -> Result<QueueMetrics>;
}
