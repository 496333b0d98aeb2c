// Redis Rate Gate Implementation
// Sliding window over a sorted set per tenant: evict entries older than the
// window, deny at the cap, otherwise record the submission and refresh the
// key's TTL.

use async_trait::async_trait;
use drover_core::application::admission::{RATE_LIMIT_MAX_PER_WINDOW, RATE_LIMIT_WINDOW_MS};
use drover_core::error::{AppError, Result};
use drover_core::port::{RateDecision, RateGate, TimeProvider};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-tenant submission limiter backed by Redis sorted sets.
///
/// The connection is established lazily and reused for the life of the
/// process (ConnectionManager reconnects on its own after drops). Every
/// Redis failure fails open: the check returns Allow and warns, because a
/// dead limiter must not take submissions down with it.
pub struct RedisRateGate {
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for RedisRateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateGate").finish_non_exhaustive()
    }
}

impl RedisRateGate {
    pub fn new(redis_url: &str, time_provider: Arc<dyn TimeProvider>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            conn: Mutex::new(None),
            time_provider,
        })
    }

    async fn connection(&self) -> redis::RedisResult<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = ConnectionManager::new(self.client.clone()).await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn try_check(&self, tenant_id: &str) -> redis::RedisResult<RateDecision> {
        let mut conn = self.connection().await?;

        let now = self.time_provider.now_millis();
        let key = format!("rate:{}", tenant_id);
        let window_start = now - RATE_LIMIT_WINDOW_MS;

        // Evict entries that fell out of the window
        let _: () = conn.zrembyscore(&key, 0, window_start).await?;

        let count: i64 = conn.zcard(&key).await?;
        if count >= RATE_LIMIT_MAX_PER_WINDOW {
            debug!(tenant_id = %tenant_id, count = %count, "Submission rate cap reached");
            return Ok(RateDecision::Deny);
        }

        // Random suffix keeps same-millisecond submissions from colliding on
        // the member value
        let member = format!("{}-{}", now, uuid::Uuid::new_v4());
        let _: () = conn.zadd(&key, member, now).await?;
        let _: () = conn.expire(&key, RATE_LIMIT_WINDOW_MS / 1000).await?;

        Ok(RateDecision::Allow)
    }
}

#[async_trait]
impl RateGate for RedisRateGate {
    async fn check_submission_rate(&self, tenant_id: &str) -> RateDecision {
        match self.try_check(tenant_id).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    error = %e,
                    "Rate gate store unreachable, failing open"
                );
                RateDecision::Allow
            }
        }
    }
}
