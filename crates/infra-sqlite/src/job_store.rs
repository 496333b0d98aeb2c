// SQLite JobStore Implementation

use async_trait::async_trait;
use drover_core::application::worker::constants::LEASE_DURATION_MS;
use drover_core::domain::{DeadLetterEntry, Job, JobId, JobPayload, JobStatus};
use drover_core::error::{AppError, Result};
use drover_core::port::{JobStore, QueueMetrics, StatusCounts, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // Extract database-specific error code and message
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed; the submission path turns
                        // this into "return the existing job"
                        AppError::Conflict(format!(
                            "Unique constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "787" | "3850" => {
                        AppError::Database(format!(
                            "Foreign key constraint violation: {} ({})",
                            db_err.message(),
                            code_str
                        ))
                    }
                    "5" => {
                        AppError::Database(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteJobStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, tenant_id, status, payload, idempotency_key,
                retry_count, max_retries, lease_expires_at, worker_id,
                created_at, started_at, completed_at, error_message, trace_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.tenant_id)
        .bind(job.status.as_str())
        .bind(job.payload.as_value().to_string())
        .bind(&job.idempotency_key)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(job.lease_expires_at)
        .bind(&job.worker_id)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .bind(&job.trace_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE idempotency_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>> {
        // One atomic claim for both initial dispatch and steal-back of
        // expired leases. The created_at <= now conjunct gates retries whose
        // release time (written into created_at) is still in the future.
        // started_at is set only on the first lease and survives steal-back.
        let now = self.time_provider.now_millis();
        let lease_expires_at = now + LEASE_DURATION_MS;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = 'running',
                worker_id = ?,
                lease_expires_at = ?,
                started_at = COALESCE(started_at, ?)
            WHERE id = (
                SELECT j.id FROM jobs j
                WHERE (j.status = 'pending' AND j.created_at <= ?)
                   OR (j.status = 'running' AND j.lease_expires_at < ?)
                ORDER BY j.created_at ASC, j.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .bind(lease_expires_at)
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn complete(&self, id: &JobId, worker_id: &str) -> Result<bool> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                completed_at = ?,
                worker_id = NULL,
                lease_expires_at = NULL
            WHERE id = ? AND status = 'running' AND worker_id = ?
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn schedule_retry(
        &self,
        id: &JobId,
        worker_id: &str,
        error_message: &str,
        release_at: i64,
    ) -> Result<bool> {
        // Rewriting created_at both requeues the job at the FIFO tail and
        // delays its release until the backoff elapses
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                retry_count = retry_count + 1,
                worker_id = NULL,
                lease_expires_at = NULL,
                error_message = ?,
                created_at = ?
            WHERE id = ? AND status = 'running' AND worker_id = ?
            "#,
        )
        .bind(error_message)
        .bind(release_at)
        .bind(id)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn dead_letter(
        &self,
        entry_id: &str,
        id: &JobId,
        worker_id: &str,
        final_error: &str,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Guarded like complete/schedule_retry, and the update runs first:
        // it takes the write lock, so a concurrent steal-back cannot slip in
        // between a read and the terminal transition
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = ?,
                worker_id = NULL,
                lease_expires_at = NULL
            WHERE id = ? AND status = 'running' AND worker_id = ?
            "#,
        )
        .bind(final_error)
        .bind(id)
        .bind(worker_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(false);
        }

        // Snapshot payload and trace id for the entry; neither is touched by
        // the transition above
        let (payload, trace_id): (String, String) =
            sqlx::query_as("SELECT payload, trace_id FROM jobs WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO dead_letters (id, job_id, payload, final_error, failed_at, trace_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry_id)
        .bind(id)
        .bind(&payload)
        .bind(final_error)
        .bind(now)
        .bind(&trace_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn find_dead_letter(&self, job_id: &JobId) -> Result<Option<DeadLetterEntry>> {
        let row = sqlx::query_as::<_, DeadLetterRow>(
            "SELECT * FROM dead_letters WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_entry()))
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM jobs
                    WHERE tenant_id = ? AND status = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(tenant_id)
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM jobs
                    WHERE tenant_id = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(tenant_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?
            }
        };

        Ok(rows.into_iter().map(|row| row.into_job()).collect())
    }

    async fn count_running(&self, tenant_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE tenant_id = ? AND status = 'running'",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn metrics(&self, tenant_id: Option<&str>) -> Result<QueueMetrics> {
        let rows: Vec<(String, i64)> = match tenant_id {
            Some(tenant) => {
                sqlx::query_as(
                    "SELECT status, COUNT(*) FROM jobs WHERE tenant_id = ? GROUP BY status",
                )
                .bind(tenant)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?
            }
            None => sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?,
        };

        // Missing buckets stay at 0 rather than being omitted
        let mut by_status = StatusCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => by_status.pending = count,
                "running" => by_status.running = count,
                "completed" => by_status.completed = count,
                "failed" => by_status.failed = count,
                _ => {}
            }
        }

        let dlq_size: i64 = match tenant_id {
            Some(tenant) => {
                // Dead letters carry no tenant column; scope through the
                // parent job
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM dead_letters d
                    JOIN jobs j ON j.id = d.job_id
                    WHERE j.tenant_id = ?
                    "#,
                )
                .bind(tenant)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?
            }
            None => sqlx::query_scalar("SELECT COUNT(*) FROM dead_letters")
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?,
        };

        Ok(QueueMetrics {
            jobs_total: by_status.pending
                + by_status.running
                + by_status.completed
                + by_status.failed,
            jobs_by_status: by_status,
            dlq_size,
        })
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    tenant_id: String,
    status: String,
    payload: String,
    idempotency_key: Option<String>,
    retry_count: i32,
    max_retries: i32,
    lease_expires_at: Option<i64>,
    worker_id: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    error_message: Option<String>,
    trace_id: String,
}

impl JobRow {
    fn into_job(self) -> Job {
        // The CHECK constraint makes an unknown status unreachable; fall
        // back to Failed rather than panicking on a corrupted row
        let status = JobStatus::parse(&self.status).unwrap_or(JobStatus::Failed);

        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).unwrap_or(serde_json::json!({}));

        Job {
            id: self.id,
            tenant_id: self.tenant_id,
            status,
            payload: JobPayload::new(payload),
            idempotency_key: self.idempotency_key,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            lease_expires_at: self.lease_expires_at,
            worker_id: self.worker_id,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message,
            trace_id: self.trace_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeadLetterRow {
    id: String,
    job_id: String,
    payload: String,
    final_error: String,
    failed_at: i64,
    trace_id: String,
}

impl DeadLetterRow {
    fn into_entry(self) -> DeadLetterEntry {
        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).unwrap_or(serde_json::json!({}));

        DeadLetterEntry {
            id: self.id,
            job_id: self.job_id,
            payload: JobPayload::new(payload),
            final_error: self.final_error,
            failed_at: self.failed_at,
            trace_id: self.trace_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use drover_core::port::time_provider::mocks::MockTimeProvider;

    const T0: i64 = 10_000_000;

    async fn setup_test_db() -> (SqliteJobStore, Arc<MockTimeProvider>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let time_provider = Arc::new(MockTimeProvider::new(T0));
        let store = SqliteJobStore::new(pool, time_provider.clone());
        (store, time_provider)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (store, _) = setup_test_db().await;

        let job = Job::new_test(
            "tenant-a",
            JobPayload::new(serde_json::json!({"task": "resize", "width": 640})),
        );
        store.insert(&job).await.unwrap();

        let found = store.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.tenant_id, "tenant-a");
        assert_eq!(found.status, JobStatus::Pending);
        assert_eq!(found.payload, job.payload);
        assert_eq!(found.trace_id, job.trace_id);

        assert!(store.find_by_id(&"nope".to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idempotency_key_lookup_and_conflict() {
        let (store, _) = setup_test_db().await;

        let mut job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        job.idempotency_key = Some("key-1".to_string());
        store.insert(&job).await.unwrap();

        let found = store
            .find_by_idempotency_key("key-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, job.id);

        // A second insert with the same key loses to the unique index
        let mut dup = Job::new_test("tenant-b", JobPayload::new(serde_json::json!({})));
        dup.idempotency_key = Some("key-1".to_string());
        let err = store.insert(&dup).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Jobs without a key never collide
        let a = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let b = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
    }

    #[tokio::test]
    async fn test_claim_is_fifo_and_sets_lease() {
        let (store, _) = setup_test_db().await;

        let first = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let second = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let claimed = store.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.worker_id.as_deref(), Some("w1"));
        assert_eq!(claimed.lease_expires_at, Some(T0 + LEASE_DURATION_MS));
        assert_eq!(claimed.started_at, Some(T0));

        let claimed = store.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, second.id);

        assert!(store.claim_next("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_skips_jobs_released_in_the_future() {
        let (store, time) = setup_test_db().await;

        let job = Job::new(
            "future-1",
            "tenant-a",
            JobPayload::new(serde_json::json!({})),
            None,
            "trace-future-1",
            T0 + 30_000,
        );
        store.insert(&job).await.unwrap();

        assert!(store.claim_next("w1").await.unwrap().is_none());

        time.advance(30_000);
        let claimed = store.claim_next("w1").await.unwrap().unwrap();
        assert_eq!(claimed.id, "future-1");
    }

    #[tokio::test]
    async fn test_claim_steals_expired_lease() {
        let (store, time) = setup_test_db().await;

        let job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&job).await.unwrap();

        let claimed = store.claim_next("w1").await.unwrap().unwrap();
        let first_started_at = claimed.started_at;

        // Lease still live: nothing to steal
        assert!(store.claim_next("w2").await.unwrap().is_none());

        // Past the lease deadline the job re-enters rotation
        time.advance(LEASE_DURATION_MS + 1);
        let stolen = store.claim_next("w2").await.unwrap().unwrap();
        assert_eq!(stolen.id, job.id);
        assert_eq!(stolen.worker_id.as_deref(), Some("w2"));
        // A crash is not a retry, and started_at keeps the first-run value
        assert_eq!(stolen.retry_count, 0);
        assert_eq!(stolen.started_at, first_started_at);
    }

    #[tokio::test]
    async fn test_complete_is_guarded_by_lease_holder() {
        let (store, _) = setup_test_db().await;

        let job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&job).await.unwrap();
        store.claim_next("w1").await.unwrap().unwrap();

        // A worker that does not hold the lease cannot settle
        assert!(!store.complete(&job.id, "w2").await.unwrap());

        assert!(store.complete(&job.id, "w1").await.unwrap());
        let done = store.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_at, Some(T0));
        assert!(done.worker_id.is_none());
        assert!(done.lease_expires_at.is_none());

        // Settling twice is a no-op
        assert!(!store.complete(&job.id, "w1").await.unwrap());
    }

    #[tokio::test]
    async fn test_schedule_retry_releases_later() {
        let (store, time) = setup_test_db().await;

        let job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&job).await.unwrap();
        store.claim_next("w1").await.unwrap().unwrap();

        let release_at = T0 + 30_000;
        assert!(store
            .schedule_retry(&job.id, "w1", "boom #1", release_at)
            .await
            .unwrap());

        let retried = store.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.created_at, release_at);
        assert_eq!(retried.error_message.as_deref(), Some("boom #1"));
        assert!(retried.worker_id.is_none());
        assert!(retried.lease_expires_at.is_none());

        // Not claimable until the backoff elapses
        assert!(store.claim_next("w1").await.unwrap().is_none());
        time.set(release_at);
        assert!(store.claim_next("w1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dead_letter_transaction() {
        let (store, _) = setup_test_db().await;

        let payload = JobPayload::new(serde_json::json!({"task": "x", "n": 42}));
        let job = Job::new_test("tenant-a", payload.clone());
        store.insert(&job).await.unwrap();
        store.claim_next("w1").await.unwrap().unwrap();

        // Wrong worker: nothing is written
        assert!(!store
            .dead_letter("dlq-0", &job.id, "w2", "boom")
            .await
            .unwrap());
        assert!(store.find_dead_letter(&job.id).await.unwrap().is_none());

        assert!(store
            .dead_letter("dlq-1", &job.id, "w1", "boom #4")
            .await
            .unwrap());

        let failed = store.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom #4"));
        assert!(failed.worker_id.is_none());
        assert!(failed.lease_expires_at.is_none());

        let entry = store.find_dead_letter(&job.id).await.unwrap().unwrap();
        assert_eq!(entry.id, "dlq-1");
        assert_eq!(entry.job_id, job.id);
        assert_eq!(entry.final_error, "boom #4");
        assert_eq!(entry.failed_at, T0);
        assert_eq!(entry.trace_id, job.trace_id);
        assert_eq!(entry.payload, payload);
    }

    #[tokio::test]
    async fn test_stale_worker_cannot_dead_letter_after_steal_back() {
        let (store, time) = setup_test_db().await;

        let job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        store.insert(&job).await.unwrap();
        store.claim_next("w1").await.unwrap().unwrap();

        // w1 overruns its lease and w2 steals the job
        time.advance(LEASE_DURATION_MS + 1);
        let stolen = store.claim_next("w2").await.unwrap().unwrap();
        assert_eq!(stolen.worker_id.as_deref(), Some("w2"));

        // w1's late dead-letter bounces off the guard and writes nothing
        assert!(!store
            .dead_letter("dlq-1", &job.id, "w1", "boom")
            .await
            .unwrap());

        let current = store.find_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(current.status, JobStatus::Running);
        assert_eq!(current.worker_id.as_deref(), Some("w2"));
        assert!(store.find_dead_letter(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_tenant() {
        let (store, _) = setup_test_db().await;

        let older = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let newer = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let other = Job::new_test("tenant-b", JobPayload::new(serde_json::json!({})));
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        store.insert(&other).await.unwrap();

        let jobs = store.list_by_tenant("tenant-a", None, 50).await.unwrap();
        assert_eq!(jobs.len(), 2);
        // Newest first
        assert_eq!(jobs[0].id, newer.id);
        assert_eq!(jobs[1].id, older.id);

        let running = store
            .list_by_tenant("tenant-a", Some(JobStatus::Running), 50)
            .await
            .unwrap();
        assert!(running.is_empty());

        let limited = store.list_by_tenant("tenant-a", None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_count_running() {
        let (store, _) = setup_test_db().await;

        for _ in 0..3 {
            let job = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
            store.insert(&job).await.unwrap();
        }
        store.claim_next("w1").await.unwrap();
        store.claim_next("w1").await.unwrap();

        assert_eq!(store.count_running("tenant-a").await.unwrap(), 2);
        assert_eq!(store.count_running("tenant-b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_metrics_zero_fill_and_scoping() {
        let (store, _) = setup_test_db().await;

        // Empty store: every bucket present, all zero
        let empty = store.metrics(None).await.unwrap();
        assert_eq!(empty, QueueMetrics::default());

        let a1 = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let a2 = Job::new_test("tenant-a", JobPayload::new(serde_json::json!({})));
        let b1 = Job::new_test("tenant-b", JobPayload::new(serde_json::json!({})));
        store.insert(&a1).await.unwrap();
        store.insert(&a2).await.unwrap();
        store.insert(&b1).await.unwrap();

        // a1 completes, a2 dead-letters
        store.claim_next("w1").await.unwrap();
        store.complete(&a1.id, "w1").await.unwrap();
        store.claim_next("w1").await.unwrap();
        store.dead_letter("dlq-1", &a2.id, "w1", "boom").await.unwrap();

        let scoped = store.metrics(Some("tenant-a")).await.unwrap();
        assert_eq!(scoped.jobs_total, 2);
        assert_eq!(scoped.jobs_by_status.pending, 0);
        assert_eq!(scoped.jobs_by_status.running, 0);
        assert_eq!(scoped.jobs_by_status.completed, 1);
        assert_eq!(scoped.jobs_by_status.failed, 1);
        assert_eq!(scoped.dlq_size, 1);

        // tenant-b sees only its own pending job and no dead letters
        let other = store.metrics(Some("tenant-b")).await.unwrap();
        assert_eq!(other.jobs_total, 1);
        assert_eq!(other.jobs_by_status.pending, 1);
        assert_eq!(other.dlq_size, 0);

        let global = store.metrics(None).await.unwrap();
        assert_eq!(global.jobs_total, 3);
        assert_eq!(global.dlq_size, 1);
    }
}
