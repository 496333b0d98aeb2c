// Dead-Letter Domain Model

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobPayload};

/// Terminal resting place for a job that exhausted its retry budget.
///
/// References the parent Job by id (restrict-on-delete); the payload is a
/// snapshot taken at dead-letter time so the entry stays inspectable on its
/// own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: String,
    pub job_id: JobId,
    pub payload: JobPayload,
    pub final_error: String,
    pub failed_at: i64, // epoch ms
    pub trace_id: String,
}
