// Application Layer - Use Cases and Business Logic

pub mod admission;
pub mod retry;
pub mod submit;
pub mod worker;

// Re-exports
pub use submit::{SubmissionService, SubmitReceipt, SubmitRequest};
pub use worker::{StopSignal, Worker, WorkerStop};
