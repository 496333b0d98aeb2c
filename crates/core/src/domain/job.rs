// Job Domain Model

use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Tenant identifier (opaque partition key for admission and listing)
pub type TenantId = String;

/// Retry budget applied when a submission does not specify one
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Job lifecycle status
///
/// Stored and serialized lowercase; these four values are the complete set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job payload (opaque JSON, stored verbatim and returned unmodified)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Job Entity
///
/// `created_at` doubles as the dequeue ordering key: retries rewrite it to
/// `now + backoff`, which both re-queues the job at the tail and gates its
/// release (the claim predicate requires `created_at <= now`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub status: JobStatus,
    pub payload: JobPayload,
    pub idempotency_key: Option<String>,

    pub retry_count: i32,
    pub max_retries: i32,

    // Lease fields; set iff status == Running
    pub lease_expires_at: Option<i64>, // epoch ms
    pub worker_id: Option<String>,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,

    pub error_message: Option<String>,
    pub trace_id: String,
}

impl Job {
    /// Create a new pending Job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `tenant_id` - Owning tenant
    /// * `payload` - Opaque job payload
    /// * `idempotency_key` - Optional client-chosen dedup key
    /// * `trace_id` - Correlation id, stable for the job's lifetime
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        payload: JobPayload,
        idempotency_key: Option<String>,
        trace_id: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            status: JobStatus::Pending,
            payload,
            idempotency_key,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            lease_expires_at: None,
            worker_id: None,
            created_at,
            started_at: None,
            completed_at: None,
            error_message: None,
            trace_id: trace_id.into(),
        }
    }

    /// Whether the retry budget is spent; the next failure dead-letters.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000, so FIFO assertions can
    /// rely on creation order.
    ///
    /// **Note**: This method should only be used in tests. For production code,
    /// always inject ID and time via providers.
    pub fn new_test(tenant_id: impl Into<String>, payload: JobPayload) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let trace_id = format!("trace-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(id, tenant_id, payload, None, trace_id, created_at)
    }
}
