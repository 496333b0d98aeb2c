// Worker - lease / execute / settle loop

pub mod constants;

use constants::*;

use crate::application::retry::{self, RetryDecision};
use crate::domain::Job;
use crate::error::Result;
use crate::port::{IdProvider, JobHandler, JobStore, TimeProvider};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Stop control for a worker pool. `stop()` halts new lease claims across
/// every subscribed worker; a job already claimed runs to completion and is
/// settled before the worker exits (overruns are reclaimed by peers through
/// lease expiry, never preempted locally).
pub struct WorkerStop {
    tx: watch::Sender<bool>,
}

impl WorkerStop {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Per-worker view of the stop state, handed to `Worker::run`
    pub fn subscribe(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Ask every worker to finish its current job and exit
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for WorkerStop {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker-side stop state: polled between jobs, awaited during idle sleeps
#[derive(Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn stopped(&mut self) {
        let _ = self.rx.changed().await;
    }
}

/// Long-running agent that leases jobs, runs the handler on them, and
/// settles the outcome (ack, retry, or dead-letter).
///
/// All cross-worker coordination lives in the durable store: the claim is
/// atomic there, and every settle write is guarded on this worker still
/// holding the lease, so a lagging worker cannot clobber a peer's fresh
/// lease after a steal-back.
pub struct Worker {
    worker_id: String,
    store: Arc<dyn JobStore>,
    handler: Arc<dyn JobHandler>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Worker {
    /// Create a worker with a stable opaque `worker_id` (assigned once at
    /// startup, identifies this worker in lease fields and logs)
    pub fn new(
        worker_id: impl Into<String>,
        store: Arc<dyn JobStore>,
        handler: Arc<dyn JobHandler>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            store,
            handler,
            id_provider,
            time_provider,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run the worker loop until stopped.
    ///
    /// An in-flight job is always finished before the loop exits; the stop
    /// signal only prevents new claims.
    pub async fn run(&self, mut stop: StopSignal) -> Result<()> {
        info!(worker_id = %self.worker_id, "Worker started");
        loop {
            if stop.is_stopped() {
                info!(worker_id = %self.worker_id, "Worker stopping");
                break;
            }
            match self.poll_once().await {
                Ok(true) => {
                    // Claimed and settled a job; look for the next one
                    // immediately
                }
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(POLL_INTERVAL) => {},
                        _ = stop.stopped() => {
                            info!(worker_id = %self.worker_id, "Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(worker_id = %self.worker_id, error = %e, "Worker poll failed");
                    // Same cadence as idle polling; no tight spin on store
                    // errors
                    tokio::select! {
                        _ = sleep(POLL_INTERVAL) => {},
                        _ = stop.stopped() => {
                            info!(worker_id = %self.worker_id, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(worker_id = %self.worker_id, "Worker stopped");
        Ok(())
    }

    /// Claim and process one job (returns true if a job was claimed)
    pub async fn poll_once(&self) -> Result<bool> {
        let job = match self.store.claim_next(&self.worker_id).await? {
            Some(j) => j,
            None => return Ok(false),
        };

        info!(
            job_id = %job.id,
            trace_id = %job.trace_id,
            tenant_id = %job.tenant_id,
            retry_count = %job.retry_count,
            "Processing job"
        );

        // Run the handler in a spawned task so a panic is caught by the
        // JoinHandle instead of unwinding through the loop
        let job = Arc::new(job);
        let handler = Arc::clone(&self.handler);
        let job_for_exec = Arc::clone(&job);
        let outcome = tokio::spawn(async move { handler.handle(&job_for_exec).await }).await;

        match outcome {
            Ok(Ok(())) => {
                let held = self.store.complete(&job.id, &self.worker_id).await?;
                if held {
                    info!(job_id = %job.id, trace_id = %job.trace_id, "Job completed");
                } else {
                    warn!(
                        job_id = %job.id,
                        worker_id = %self.worker_id,
                        "Lease no longer held, dropping completion"
                    );
                }
            }
            Ok(Err(e)) => {
                self.settle_failure(&job, e.to_string()).await?;
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    format!("handler panicked: {}", join_err)
                } else {
                    format!("handler cancelled: {}", join_err)
                };
                error!(job_id = %job.id, trace_id = %job.trace_id, error = %message, "Handler crashed");
                self.settle_failure(&job, message).await?;
            }
        }
        Ok(true)
    }

    /// Translate a failed attempt into a durable transition: retry with
    /// backoff while budget remains, dead-letter otherwise.
    async fn settle_failure(&self, job: &Job, error_message: String) -> Result<()> {
        match retry::should_retry(job) {
            RetryDecision::Retry(backoff_ms) => {
                let release_at = self.time_provider.now_millis() + backoff_ms;
                info!(
                    job_id = %job.id,
                    trace_id = %job.trace_id,
                    retry_count = job.retry_count + 1,
                    backoff_ms = %backoff_ms,
                    error = %error_message,
                    "Scheduling retry"
                );
                let held = self
                    .store
                    .schedule_retry(&job.id, &self.worker_id, &error_message, release_at)
                    .await?;
                if !held {
                    warn!(
                        job_id = %job.id,
                        worker_id = %self.worker_id,
                        "Lease no longer held, dropping retry"
                    );
                }
            }
            RetryDecision::DeadLetter => {
                error!(
                    job_id = %job.id,
                    trace_id = %job.trace_id,
                    error = %error_message,
                    "Retries exhausted, dead-lettering job"
                );
                let entry_id = self.id_provider.generate_id();
                let held = self
                    .store
                    .dead_letter(&entry_id, &job.id, &self.worker_id, &error_message)
                    .await?;
                if !held {
                    warn!(
                        job_id = %job.id,
                        worker_id = %self.worker_id,
                        "Lease no longer held, dropping dead-letter"
                    );
                }
            }
        }
        Ok(())
    }
}
