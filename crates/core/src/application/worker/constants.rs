// Worker constants
use std::time::Duration;

/// Sleep between polls when the queue is empty; also used after a transient
/// store error so the loop never spins
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Lease duration for a single attempt (5 minutes). A worker still running
/// past this deadline is subject to steal-back by a peer.
pub const LEASE_DURATION_MS: i64 = 5 * 60 * 1000;
