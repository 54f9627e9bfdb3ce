//! Job executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use subburn_queue::{CaptionJob, Delivery, JobBroker};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::pipeline::{run_attempt, PipelineContext, PipelineOutput};
use crate::workspace::JobWorkspace;

/// Max deliveries taken per consume or claim call.
const MAX_BATCH: usize = 5;

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(PipelineOutput),
    /// Rescheduled as attempt `next_attempt` after `delay`
    Retried { next_attempt: u32, delay: Duration },
    /// Recorded as failed and dead-lettered
    Failed { error: String },
}

/// Bounded pool of job executions fed from the broker.
pub struct WorkerPool {
    ctx: Arc<PipelineContext>,
    broker: Arc<dyn JobBroker>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl WorkerPool {
    pub fn new(ctx: PipelineContext, broker: Arc<dyn JobBroker>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            ctx: Arc::new(ctx),
            broker,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Consume until [`shutdown`](Self::shutdown) is called, then wait for
    /// in-flight jobs up to the configured shutdown timeout.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting worker pool '{}' with {} max concurrent jobs",
            self.consumer_name, self.ctx.config.max_concurrent_jobs
        );

        self.broker.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        // Main job consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping worker pool");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.ctx.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("Shutdown timeout reached with jobs still running");
        }

        info!("Worker pool stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let broker = Arc::clone(&self.broker);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ctx.config.claim_interval);
            let min_idle_ms = ctx.config.claim_min_idle.as_millis() as u64;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match broker.claim_pending(&consumer_name, min_idle_ms, MAX_BATCH).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!("Claimed {} pending jobs", deliveries.len());
                                for delivery in deliveries {
                                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                                        break;
                                    };
                                    let ctx = Arc::clone(&ctx);
                                    let broker = Arc::clone(&broker);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(&ctx, broker.as_ref(), delivery).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to claim pending jobs: {}", e),
                        }
                    }
                }
            }
        })
    }

    /// Consume and dispatch up to the number of free slots.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .broker
            .consume(&self.consumer_name, self.ctx.config.block_ms, available.min(MAX_BATCH))
            .await?;

        if deliveries.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", deliveries.len());

        for delivery in deliveries {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("job semaphore closed"))?;
            let ctx = Arc::clone(&self.ctx);
            let broker = Arc::clone(&self.broker);

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(&ctx, broker.as_ref(), delivery).await;
            });
        }

        Ok(())
    }

    /// Run one delivery to a recorded outcome: completed, rescheduled or failed.
    pub async fn execute_job(ctx: &PipelineContext, broker: &dyn JobBroker, delivery: Delivery) -> JobOutcome {
        let Delivery { message_id, job } = delivery;
        let logger = JobLogger::new(&job, "burn_captions");
        let span = logger.create_span();

        async {
            logger.log_start(&format!("attempt {}/{}", job.attempt, job.retry.max_attempts));
            metrics::record_job_started();

            if let Err(e) = job.validate() {
                let error = WorkerError::from(e);
                logger.log_error(&format!("rejected: {}", error));
                return Self::fail(ctx, broker, &message_id, &job, &error, &logger).await;
            }

            Self::refresh_status(ctx, &job, &logger).await;

            let workspace = match JobWorkspace::create(&ctx.config.work_dir, &job.job_id).await {
                Ok(ws) => ws,
                Err(e) => return Self::after_failure(ctx, broker, &message_id, &job, e, &logger).await,
            };

            let started = Instant::now();
            let result = Self::attempt(ctx, &job, &workspace, &logger).await;
            let elapsed = started.elapsed().as_secs_f64();

            let outcome = match result {
                Ok(output) => {
                    metrics::record_attempt_duration("completed", elapsed);
                    if let Err(e) = broker.ack(&message_id).await {
                        error!("Failed to ack job {}: {}", job.job_id, e);
                    }
                    metrics::record_job_completed();
                    logger.log_completion(&output.output_link);
                    JobOutcome::Completed(output)
                }
                Err(e) => {
                    metrics::record_attempt_duration("failed", elapsed);
                    Self::after_failure(ctx, broker, &message_id, &job, e, &logger).await
                }
            };

            workspace.cleanup().await;
            outcome
        }
        .instrument(span)
        .await
    }

    /// Pipeline under the attempt deadline, then the Completed write.
    async fn attempt(
        ctx: &PipelineContext,
        job: &CaptionJob,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> WorkerResult<PipelineOutput> {
        let deadline = ctx.config.attempt_timeout;
        let output = tokio::time::timeout(deadline, run_attempt(ctx, job, workspace, logger))
            .await
            .map_err(|_| WorkerError::Timeout(deadline))??;

        ctx.status
            .mark_completed(
                &job.owner_id,
                &job.video_id,
                &job.job_id,
                &job.input_link,
                &output.output_link,
                &output.thumbnail_link,
            )
            .await?;
        Ok(output)
    }

    async fn after_failure(
        ctx: &PipelineContext,
        broker: &dyn JobBroker,
        message_id: &str,
        job: &CaptionJob,
        error: WorkerError,
        logger: &JobLogger,
    ) -> JobOutcome {
        if error.is_retryable() && job.retry.allows_retry_after(job.attempt) {
            let delay = job.retry.delay_for_attempt(job.attempt);
            let next = job.next_attempt();
            logger.log_warning(&format!(
                "attempt {} failed, retrying in {:?}: {}",
                job.attempt, delay, error
            ));
            if let Err(e) = broker.retry_later(message_id, &next, delay).await {
                // Left pending; another worker claims it after the idle threshold
                error!("Failed to reschedule job {}: {}", job.job_id, e);
            }
            Self::refresh_status(ctx, job, logger).await;
            metrics::record_job_retried(next.attempt);
            return JobOutcome::Retried {
                next_attempt: next.attempt,
                delay,
            };
        }

        logger.log_error(&format!("giving up after attempt {}: {}", job.attempt, error));
        Self::fail(ctx, broker, message_id, job, &error, logger).await
    }

    /// Keep the processing record alive across attempts and retry waits.
    async fn refresh_status(ctx: &PipelineContext, job: &CaptionJob, logger: &JobLogger) {
        if let Err(e) = ctx
            .status
            .refresh_processing(&job.owner_id, &job.video_id, &job.job_id, &job.input_link)
            .await
        {
            logger.log_warning(&format!("failed to refresh processing status: {}", e));
        }
    }

    async fn fail(
        ctx: &PipelineContext,
        broker: &dyn JobBroker,
        message_id: &str,
        job: &CaptionJob,
        error: &WorkerError,
        logger: &JobLogger,
    ) -> JobOutcome {
        let message = error.to_string();

        if let Err(e) = ctx
            .status
            .mark_failed(&job.owner_id, &job.video_id, &job.job_id, &job.input_link, &message)
            .await
        {
            logger.log_error(&format!("failed to record failure: {}", e));
        }
        if let Err(e) = broker.dead_letter(message_id, job, &message).await {
            error!("Failed to move job {} to DLQ: {}", job.job_id, e);
        }
        metrics::record_job_failed(error.is_retryable());

        JobOutcome::Failed { error: message }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.ctx.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
