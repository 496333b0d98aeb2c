//! HTTP Request/Response Types
//!
//! Wire field names are camelCase, except the metrics body which reuses the
//! snake_case QueueMetrics aggregate directly.

use drover_core::domain::{Job, JobStatus};
use serde::{Deserialize, Serialize};

/// POST /api/v1/jobs
///
/// All fields optional at parse time so missing ones produce a clean 400
/// instead of a deserializer rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub tenant_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub trace_id: String,
}

/// One job as returned by GET /jobs/:jobId and the tenant listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub trace_id: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub retry_count: i32,
    pub error_message: Option<String>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            trace_id: job.trace_id,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            retry_count: job.retry_count,
            error_message: job.error_message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSummary>,
}

/// GET /api/v1/jobs query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub tenant_id: Option<String>,
    pub status: Option<String>,
}

/// GET /api/v1/metrics query string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub tenant_id: Option<String>,
}
