// Admission control: rate gate, concurrency cap, idempotent replay

use drover_core::application::admission::{CONCURRENCY_LIMIT_MESSAGE, RATE_LIMIT_MESSAGE};
use drover_core::application::{SubmissionService, SubmitRequest};
use drover_core::error::AppError;
use drover_core::port::id_provider::UuidProvider;
use drover_core::port::rate_gate::mocks::MockRateGate;
use drover_core::port::time_provider::mocks::MockTimeProvider;
use drover_core::port::{IdProvider, JobStore, RateDecision, TimeProvider};
use drover_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};
use std::sync::Arc;

const T0: i64 = 10_000_000;

async fn setup() -> (Arc<dyn JobStore>, Arc<MockRateGate>, SubmissionService) {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let time: Arc<dyn TimeProvider> = Arc::new(MockTimeProvider::new(T0));
    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool, time.clone()));
    let gate = Arc::new(MockRateGate::new_allow());
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

    let submission = SubmissionService::new(store.clone(), gate.clone(), id_provider, time);

    (store, gate, submission)
}

fn request(tenant: &str, key: Option<&str>) -> SubmitRequest {
    SubmitRequest {
        tenant_id: tenant.to_string(),
        payload: serde_json::json!({"task": "x"}),
        idempotency_key: key.map(str::to_string),
    }
}

#[tokio::test]
async fn test_rate_gate_deny_is_rate_limited() {
    let (_store, gate, submission) = setup().await;

    gate.set(RateDecision::Deny);
    let err = submission.submit(request("tenant-a", None)).await.unwrap_err();
    match err {
        AppError::RateLimited(msg) => assert_eq!(msg, RATE_LIMIT_MESSAGE),
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrency_cap_at_five_running() {
    let (store, _gate, submission) = setup().await;

    // Five accepted and leased: the tenant is now at its in-flight cap
    for _ in 0..5 {
        submission.submit(request("tenant-a", None)).await.unwrap();
    }
    for _ in 0..5 {
        assert!(store.claim_next("w1").await.unwrap().is_some());
    }
    assert_eq!(store.count_running("tenant-a").await.unwrap(), 5);

    let err = submission.submit(request("tenant-a", None)).await.unwrap_err();
    match err {
        AppError::RateLimited(msg) => assert_eq!(msg, CONCURRENCY_LIMIT_MESSAGE),
        other => panic!("Expected RateLimited, got {:?}", other),
    }

    // The cap is per-tenant, not global
    submission.submit(request("tenant-b", None)).await.unwrap();

    // One slot frees up, the next submission is admitted again
    let running = store
        .list_by_tenant("tenant-a", Some(drover_core::domain::JobStatus::Running), 50)
        .await
        .unwrap();
    assert!(store.complete(&running[0].id, "w1").await.unwrap());
    submission.submit(request("tenant-a", None)).await.unwrap();
}

#[tokio::test]
async fn test_idempotent_resubmit_returns_same_job() {
    let (store, gate, submission) = setup().await;

    let first = submission.submit(request("tenant-a", Some("K"))).await.unwrap();
    let second = submission.submit(request("tenant-a", Some("K"))).await.unwrap();

    assert_eq!(first.job_id, second.job_id);
    assert_eq!(first.trace_id, second.trace_id);

    // Exactly one row exists and only the first submission consumed a token
    let jobs = store.list_by_tenant("tenant-a", None, 50).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(gate.call_count(), 1);

    // A different key is a different job
    let third = submission.submit(request("tenant-a", Some("K2"))).await.unwrap();
    assert_ne!(third.job_id, first.job_id);
}

#[tokio::test]
async fn test_replay_skips_admission_even_when_denied() {
    let (_store, gate, submission) = setup().await;

    let first = submission.submit(request("tenant-a", Some("K"))).await.unwrap();

    // Rate gate now denies everything, but a replay never consults it
    gate.set(RateDecision::Deny);
    let replay = submission.submit(request("tenant-a", Some("K"))).await.unwrap();
    assert_eq!(replay.job_id, first.job_id);
}

#[tokio::test]
async fn test_validation_rejections() {
    let (_store, gate, submission) = setup().await;

    let err = submission.submit(request("", None)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = submission
        .submit(SubmitRequest {
            tenant_id: "tenant-a".to_string(),
            payload: serde_json::Value::Null,
            idempotency_key: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Invalid submissions never reach the gate
    assert_eq!(gate.call_count(), 0);
}
