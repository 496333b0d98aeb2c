// Job Handler Port
// Abstraction for executing a job's payload; a real deployment pins a handler
// per payload shape.

use crate::domain::Job;
use async_trait::async_trait;
use thiserror::Error;

/// Handler failure, normalized to a message that lands in
/// `jobs.error_message` (and `dead_letters.final_error` on the last attempt)
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("Handler timed out after {0}ms")]
    Timeout(i64),
}

/// Job Handler trait
///
/// Invoked by the worker runtime on the leased job's payload. Errors drive
/// the retry/dead-letter branch; they never crash the worker.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Stub handler: accepts every payload and succeeds immediately
pub struct NoopHandler;

#[async_trait]
impl JobHandler for NoopHandler {
    async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Fail the first N attempts, then succeed
        FailThenSucceed(usize),
    }

    /// Mock Job Handler for testing
    pub struct MockJobHandler {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<AtomicUsize>,
    }

    impl MockJobHandler {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobHandler for MockJobHandler {
        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            let attempt = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(HandlerError::Failed(format!("{} #{}", msg, attempt))),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::FailThenSucceed(failures) => {
                    if attempt <= failures {
                        Err(HandlerError::Failed(format!("transient failure #{}", attempt)))
                    } else {
                        Ok(())
                    }
                }
            }
        }
    }
}
