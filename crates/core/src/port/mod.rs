// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod job_handler;
pub mod job_store;
pub mod rate_gate;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use job_handler::{HandlerError, JobHandler, NoopHandler};
pub use job_store::{JobStore, QueueMetrics, StatusCounts};
pub use rate_gate::{RateDecision, RateGate};
pub use time_provider::TimeProvider;
