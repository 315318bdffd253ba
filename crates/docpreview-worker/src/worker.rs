//! Queue consumer: worker pool, LISTEN/NOTIFY or polling, retry dispatch.
//!
//! The pool claims jobs one at a time, never holding more in flight than the
//! semaphore allows. Retry bookkeeping happens here, at the queue boundary;
//! the pipeline itself runs each attempt exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tokio::time::sleep;

use docpreview_convert::PreviewOrchestrator;
use docpreview_core::models::QueuedJob;
use docpreview_db::{JobQueueRepository, JOB_NOTIFY_CHANNEL};

/// Maximum delay in seconds before retrying a failed job. Caps exponential
/// backoff so that high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds for a given retry count (exponential with cap).
#[inline]
fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    (2_u64.pow(retry_count.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
}

pub struct JobWorker {
    shutdown_tx: mpsc::Sender<()>,
    stopped_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl JobWorker {
    /// Start the worker pool in the background.
    ///
    /// The pool wakes on Postgres NOTIFY for immediate pickup of fresh jobs
    /// and polls at `poll_interval_ms` to catch retries whose backoff has
    /// elapsed (NOTIFY only fires on enqueue).
    pub fn start(
        queue: JobQueueRepository,
        orchestrator: Arc<PreviewOrchestrator>,
        config: WorkerConfig,
        pool: sqlx::PgPool,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (stopped_tx, stopped_rx) = oneshot::channel();

        tokio::spawn(async move {
            Self::worker_pool(queue, orchestrator, config, pool, shutdown_rx).await;
            let _ = stopped_tx.send(());
        });

        Self {
            shutdown_tx,
            stopped_rx: Mutex::new(Some(stopped_rx)),
        }
    }

    async fn worker_pool(
        queue: JobQueueRepository,
        orchestrator: Arc<PreviewOrchestrator>,
        config: WorkerConfig,
        pool: sqlx::PgPool,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "Conversion worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Wake the main loop when LISTEN receives a NOTIFY. The listener task
        // reconnects on failure; polling covers any window it misses.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        tokio::spawn(async move {
            loop {
                match sqlx::postgres::PgListener::connect_with(&pool).await {
                    Ok(mut listener) => {
                        if let Err(e) = listener.listen(JOB_NOTIFY_CHANNEL).await {
                            tracing::warn!(error = %e, "LISTEN failed, will retry");
                            sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                        while listener.recv().await.is_ok() {
                            let _ = notify_tx.send(()).await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "PgListener connect failed, will retry");
                        sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Worker pool shutting down, draining in-flight jobs");
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&queue, &orchestrator, &semaphore).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&queue, &orchestrator, &semaphore).await;
                }
            }
        }

        // Drain: once every permit is back, no job is still in flight.
        match semaphore.acquire_many(config.max_workers as u32).await {
            Ok(_permits) => tracing::info!("Worker pool stopped, all jobs drained"),
            Err(_) => tracing::warn!("Worker pool semaphore closed during drain"),
        };
    }

    async fn claim_and_dispatch_one(
        queue: &JobQueueRepository,
        orchestrator: &Arc<PreviewOrchestrator>,
        semaphore: &Arc<Semaphore>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match queue.claim_next_job().await {
            Ok(Some(job)) => {
                let queue = queue.clone();
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::process_claimed_job(job, queue, orchestrator).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs due in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim job from queue");
            }
        }
    }

    #[tracing::instrument(skip_all, fields(job.id = %job.id, job.retry_count = job.retry_count))]
    async fn process_claimed_job(
        job: QueuedJob,
        queue: JobQueueRepository,
        orchestrator: Arc<PreviewOrchestrator>,
    ) {
        // A payload that does not parse will never parse; fail it outright
        // instead of burning retries.
        let conversion_job = match job.conversion_job() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "Job payload is not a valid conversion job");
                let message = format!("Invalid job payload: {}", e);
                if let Err(db_err) = queue.mark_failed(job.id, &message).await {
                    tracing::error!(error = %db_err, "Failed to mark malformed job failed");
                }
                return;
            }
        };

        match orchestrator.process_job(&conversion_job).await {
            Ok(()) => {
                if let Err(e) = queue.mark_completed(job.id).await {
                    tracing::error!(error = %e, "Failed to mark job completed");
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if job.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(job.retry_count);
                    tracing::warn!(
                        retry_count = job.retry_count + 1,
                        max_retries = job.max_retries,
                        backoff_seconds,
                        error = %message,
                        "Job failed, scheduling retry"
                    );
                    if let Err(db_err) = queue.schedule_retry(job.id, backoff_seconds, &message).await
                    {
                        tracing::error!(error = %db_err, "Failed to schedule job retry");
                    }
                } else {
                    tracing::error!(
                        retry_count = job.retry_count,
                        error = %message,
                        "Job failed after maximum retries"
                    );
                    if let Err(db_err) = queue.mark_failed(job.id, &message).await {
                        tracing::error!(error = %db_err, "Failed to mark job failed");
                    }
                }
            }
        }
    }

    /// Signal the pool to stop claiming and wait for in-flight jobs to drain.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating worker shutdown");
        let _ = self.shutdown_tx.send(()).await;
        let stopped_rx = self.stopped_rx.lock().await.take();
        if let Some(rx) = stopped_rx {
            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(30), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn negative_retry_count_is_clamped() {
        assert_eq!(compute_retry_backoff_seconds(-1), 1);
    }
}
