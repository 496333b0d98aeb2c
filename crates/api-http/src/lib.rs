//! HTTP Surface
//!
//! JSON routes under /api/v1: submission, job status, tenant listing, and
//! metrics. Everything stateful lives behind the core services; this crate
//! only parses, dispatches, and maps errors to status codes.

mod error;
mod routes;
mod server;
mod types;

pub use routes::{router, AppState};
pub use server::serve;
pub use types::{
    JobSummary, ListJobsResponse, SubmitJobRequest, SubmitJobResponse,
};
