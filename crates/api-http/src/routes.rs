//! Route Handlers
//!
//! The submission handler delegates to SubmissionService; the read handlers
//! query the store directly.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use drover_core::application::{SubmissionService, SubmitRequest};
use drover_core::domain::JobStatus;
use drover_core::port::JobStore;
use std::sync::Arc;

use crate::error::{app_error_to_response, json_error};
use crate::types::{
    JobSummary, ListJobsQuery, ListJobsResponse, MetricsQuery, SubmitJobRequest,
    SubmitJobResponse,
};

/// Default page size for the tenant job listing
const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct AppState {
    pub submission: Arc<SubmissionService>,
    pub store: Arc<dyn JobStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/jobs", post(submit_job).get(list_jobs))
        .route("/api/v1/jobs/:job_id", get(get_job))
        .route("/api/v1/metrics", get(get_metrics))
        .with_state(state)
}

async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> Response {
    let Some(tenant_id) = req.tenant_id else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_argument", "tenantId is required");
    };
    let Some(payload) = req.payload else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_argument", "payload is required");
    };

    let submit = SubmitRequest {
        tenant_id,
        payload,
        idempotency_key: req.idempotency_key,
    };

    match state.submission.submit(submit).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(SubmitJobResponse {
                job_id: receipt.job_id,
                status: receipt.status,
                trace_id: receipt.trace_id,
            }),
        )
            .into_response(),
        Err(e) => app_error_to_response(e),
    }
}

async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.store.find_by_id(&job_id).await {
        Ok(Some(job)) => Json(JobSummary::from(job)).into_response(),
        Ok(None) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Job {} not found", job_id),
        ),
        Err(e) => app_error_to_response(e),
    }
}

async fn list_jobs(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> Response {
    let Some(tenant_id) = query.tenant_id else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_argument",
            "tenantId query parameter is required",
        );
    };

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match JobStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_argument",
                    format!("Unknown status: {}", raw),
                );
            }
        },
    };

    match state
        .store
        .list_by_tenant(&tenant_id, status, DEFAULT_LIST_LIMIT)
        .await
    {
        Ok(jobs) => Json(ListJobsResponse {
            jobs: jobs.into_iter().map(JobSummary::from).collect(),
        })
        .into_response(),
        Err(e) => app_error_to_response(e),
    }
}

async fn get_metrics(State(state): State<AppState>, Query(query): Query<MetricsQuery>) -> Response {
    match state.store.metrics(query.tenant_id.as_deref()).await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => app_error_to_response(e),
    }
}
