// Rate Gate Port (Interface)

use async_trait::async_trait;

/// Admission decision from the rate gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny,
}

/// Sliding-window submission limiter.
///
/// An Allow consumes a token from the tenant's window. Implementations fail
/// open: if the backing store is unreachable the check returns Allow and
/// warns, never an error. The concurrency cap is NOT behind this port; it
/// reads the durable store and never fails open.
#[async_trait]
pub trait RateGate: Send + Sync {
    async fn check_submission_rate(&self, tenant_id: &str) -> RateDecision;
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock rate gate with a scripted decision
    pub struct MockRateGate {
        decision: Mutex<RateDecision>,
        call_count: AtomicUsize,
    }

    impl MockRateGate {
        pub fn new(decision: RateDecision) -> Self {
            Self {
                decision: Mutex::new(decision),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn new_allow() -> Self {
            Self::new(RateDecision::Allow)
        }

        pub fn new_deny() -> Self {
            Self::new(RateDecision::Deny)
        }

        pub fn set(&self, decision: RateDecision) {
            *self.decision.lock().unwrap() = decision;
        }

        /// How many submissions consulted the gate (idempotent replays must
        /// not)
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateGate for MockRateGate {
        async fn check_submission_rate(&self, _tenant_id: &str) -> RateDecision {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            *self.decision.lock().unwrap()
        }
    }
}
