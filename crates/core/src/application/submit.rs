// Submit Use Case

use crate::application::admission;
use crate::domain::{Job, JobPayload, JobStatus};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobStore, RateDecision, RateGate, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Submission input, already parsed from the transport layer
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub tenant_id: String,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
}

/// What the submitter gets back; for an idempotent replay these are the
/// original job's values.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: String,
    pub status: JobStatus,
    pub trace_id: String,
}

impl SubmitReceipt {
    fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            trace_id: job.trace_id.clone(),
        }
    }
}

/// Validates input, enforces idempotency and admission, writes pending jobs.
pub struct SubmissionService {
    store: Arc<dyn JobStore>,
    rate_gate: Arc<dyn RateGate>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn JobStore>,
        rate_gate: Arc<dyn RateGate>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            rate_gate,
            id_provider,
            time_provider,
        }
    }

    /// Admit and persist one submission.
    ///
    /// Order matters: the idempotency lookup runs before any admission gate
    /// so a replay neither consumes a rate token nor counts against
    /// concurrency. A lost duplicate race resolves through the unique index:
    /// the losing insert comes back as Conflict and the existing job is
    /// returned (that loser's rate token is not refunded).
    pub async fn submit(&self, req: SubmitRequest) -> Result<SubmitReceipt> {
        validate_request(&req)?;

        if let Some(key) = &req.idempotency_key {
            if let Some(existing) = self.store.find_by_idempotency_key(key).await? {
                debug!(
                    job_id = %existing.id,
                    trace_id = %existing.trace_id,
                    idempotency_key = %key,
                    "Idempotent replay, returning existing job"
                );
                return Ok(SubmitReceipt::from_job(&existing));
            }
        }

        if self.rate_gate.check_submission_rate(&req.tenant_id).await == RateDecision::Deny {
            return Err(AppError::RateLimited(admission::RATE_LIMIT_MESSAGE.to_string()));
        }

        let running = self.store.count_running(&req.tenant_id).await?;
        if !admission::concurrency_allowed(running) {
            return Err(AppError::RateLimited(
                admission::CONCURRENCY_LIMIT_MESSAGE.to_string(),
            ));
        }

        let job = Job::new(
            self.id_provider.generate_id(),
            req.tenant_id.clone(),
            JobPayload::new(req.payload),
            req.idempotency_key.clone(),
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
        );

        match self.store.insert(&job).await {
            Ok(()) => {
                info!(
                    job_id = %job.id,
                    trace_id = %job.trace_id,
                    tenant_id = %job.tenant_id,
                    "Job submitted"
                );
                Ok(SubmitReceipt::from_job(&job))
            }
            Err(AppError::Conflict(_)) if req.idempotency_key.is_some() => {
                // Lost the duplicate race: the other submission's row is now
                // visible
                let key = req.idempotency_key.as_deref().unwrap_or_default();
                let existing = self
                    .store
                    .find_by_idempotency_key(key)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "Conflict on idempotency key {} but no job found",
                            key
                        ))
                    })?;
                debug!(
                    job_id = %existing.id,
                    idempotency_key = %key,
                    "Duplicate submission race, returning winner"
                );
                Ok(SubmitReceipt::from_job(&existing))
            }
            Err(e) => {
                error!(trace_id = %job.trace_id, error = %e, "Job insert failed");
                Err(e)
            }
        }
    }
}

/// Validate a submission before it touches any gate.
fn validate_request(req: &SubmitRequest) -> Result<()> {
    if req.tenant_id.is_empty() {
        return Err(AppError::Validation("tenantId cannot be empty".to_string()));
    }
    if req.tenant_id.len() > 256 {
        return Err(AppError::Validation(format!(
            "tenantId too long (max 256 chars, got {})",
            req.tenant_id.len()
        )));
    }
    if req.payload.is_null() {
        return Err(AppError::Validation("payload is required".to_string()));
    }

    if let Some(key) = &req.idempotency_key {
        if key.is_empty() {
            return Err(AppError::Validation(
                "idempotencyKey cannot be empty".to_string(),
            ));
        }
        if key.len() > 256 {
            return Err(AppError::Validation(format!(
                "idempotencyKey too long (max 256 chars, got {})",
                key.len()
            )));
        }
    }

    // Payload size guard (prevent memory exhaustion in the store)
    const MAX_PAYLOAD_SIZE: usize = 1_000_000; // 1MB
    let payload_str = req.payload.to_string();
    if payload_str.len() > MAX_PAYLOAD_SIZE {
        return Err(AppError::Validation(format!(
            "payload too large (max 1MB, got {} bytes)",
            payload_str.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tenant: &str, payload: serde_json::Value) -> SubmitRequest {
        SubmitRequest {
            tenant_id: tenant.to_string(),
            payload,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_empty_tenant_rejected() {
        let err = validate_request(&request("", serde_json::json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_null_payload_rejected() {
        let err = validate_request(&request("tenant-a", serde_json::Value::Null)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_empty_idempotency_key_rejected() {
        let mut req = request("tenant-a", serde_json::json!({}));
        req.idempotency_key = Some(String::new());
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_valid_request_passes() {
        let mut req = request("tenant-a", serde_json::json!({"task": "x"}));
        assert!(validate_request(&req).is_ok());

        req.idempotency_key = Some("key-1".to_string());
        assert!(validate_request(&req).is_ok());
    }
}
