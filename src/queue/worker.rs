//! Job worker - processes automation jobs from the queue
//!
//! One worker owns one browser pool and any number of concurrent job slots.
//! Per job: acquire a browser, create a fingerprinted context, execute the
//! script, capture artifacts, persist the execution, release the browser.
//! Any error re-raises into the queue's retry machinery after the execution
//! is persisted as failed.

use chrono::Utc;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeError, BrowserDriver, ContextOptions};
use crate::engine::executor::StepExecutor;
use crate::engine::pacing::Pacing;
use crate::engine::result::ExecutionUpdate;
use crate::pool::{BrowserPool, BrowserSession};
use crate::queue::broker::{Broker, QueueError};
use crate::queue::job::{backoff_delay_with_base, Job, BACKOFF_BASE_MS};
use crate::store::{ExecutionStore, StoreError};

/// How often an idle worker polls the broker
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Lease renewal cadence while a job is being processed
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Settle time between the last step and the final capture
const DEFAULT_POST_RUN_SETTLE: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Observer interface for queue lifecycle events, registered at worker
/// startup.
#[async_trait::async_trait]
pub trait QueueListener: Send + Sync {
    async fn on_active(&self, _job: &Job) {}
    async fn on_progress(&self, _job: &Job, _progress: u8) {}
    async fn on_completed(&self, _job: &Job) {}
    async fn on_failed(&self, _job: &Job, _error: &str) {}
    async fn on_stalled(&self, _job_id: &str) {}
}

/// Listener that mirrors queue events into the log.
pub struct LoggingListener;

#[async_trait::async_trait]
impl QueueListener for LoggingListener {
    async fn on_active(&self, job: &Job) {
        info!(
            job_id = %job.id,
            execution_id = %job.data.execution_id,
            attempt = job.attempts_made,
            "job started"
        );
    }

    async fn on_completed(&self, job: &Job) {
        info!(job_id = %job.id, execution_id = %job.data.execution_id, "job completed");
    }

    async fn on_failed(&self, job: &Job, error: &str) {
        error!(
            job_id = %job.id,
            execution_id = %job.data.execution_id,
            attempts_made = job.attempts_made,
            error = %error,
            "job failed"
        );
    }

    async fn on_stalled(&self, job_id: &str) {
        warn!(job_id = %job_id, "job stalled");
    }
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub headless: bool,
    pub viewport: (u32, u32),
    /// Artifact directory for screenshots and session recordings
    pub upload_dir: PathBuf,
    /// Concurrent job slots in this process
    pub concurrency: usize,
    pub pacing: Pacing,
    /// Retry backoff base; production keeps the default
    pub backoff_base_ms: u64,
    /// Pause between the last step and the final capture
    pub post_run_settle: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: (1920, 1080),
            upload_dir: PathBuf::from("./uploads"),
            concurrency: 1,
            pacing: Pacing::human(),
            backoff_base_ms: BACKOFF_BASE_MS,
            post_run_settle: DEFAULT_POST_RUN_SETTLE,
        }
    }
}

pub struct Worker {
    driver: Arc<dyn BrowserDriver>,
    pool: Arc<BrowserPool>,
    broker: Arc<dyn Broker>,
    store: Arc<dyn ExecutionStore>,
    listeners: Vec<Arc<dyn QueueListener>>,
    options: WorkerOptions,
}

impl Worker {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        pool: Arc<BrowserPool>,
        broker: Arc<dyn Broker>,
        store: Arc<dyn ExecutionStore>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            driver,
            pool,
            broker,
            store,
            listeners: Vec::new(),
            options,
        }
    }

    /// Registers an observer. Call before starting the processing loop.
    pub fn register_listener(&mut self, listener: Arc<dyn QueueListener>) {
        self.listeners.push(listener);
    }

    /// Runs forever, processing jobs as they arrive. Up to
    /// `options.concurrency` jobs run at once, all sharing this worker's
    /// pool.
    pub async fn run(self: Arc<Self>) {
        let slots = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        info!(concurrency = self.options.concurrency, "worker started");

        loop {
            if let Err(e) = self.maintain().await {
                error!(error = %e, "queue maintenance failed");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }

            let permit = match slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            match self.broker.reserve().await {
                Ok(Some(job)) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        worker.process(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "failed to reserve job");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Processes jobs one at a time until the queue has nothing left to
    /// give, including retries that become due while draining.
    pub async fn drain(&self) {
        loop {
            if let Err(e) = self.maintain().await {
                error!(error = %e, "queue maintenance failed");
                return;
            }

            match self.broker.reserve().await {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    let counts = match self.broker.counts().await {
                        Ok(counts) => counts,
                        Err(_) => return,
                    };
                    if counts.delayed == 0 && counts.active == 0 {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(e) => {
                    error!(error = %e, "failed to reserve job");
                    return;
                }
            }
        }
    }

    /// Promote due retries and requeue stalled jobs.
    async fn maintain(&self) -> Result<(), QueueError> {
        let promoted = self.broker.promote_due().await?;
        if promoted > 0 {
            debug!(promoted, "promoted delayed jobs");
        }
        for job_id in self.broker.requeue_stalled().await? {
            for listener in &self.listeners {
                listener.on_stalled(&job_id).await;
            }
        }
        Ok(())
    }

    /// Runs one job attempt and applies the completed/retry/failed
    /// transition.
    async fn process(&self, job: Job) {
        self.notify_active(&job).await;

        // Keep the processing lease alive while the attempt runs.
        let heartbeat = {
            let broker = Arc::clone(&self.broker);
            let job_id = job.id.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if broker.heartbeat(&job_id).await.is_err() {
                        break;
                    }
                }
            })
        };

        let started = std::time::Instant::now();
        let outcome = self.run_attempt(&job).await;
        heartbeat.abort();

        match outcome {
            Ok(()) => {
                if let Err(e) = self.broker.complete(&job).await {
                    error!(job_id = %job.id, error = %e, "failed to mark job completed");
                    return;
                }
                self.report_progress(&job, 100).await;
                info!(
                    job_id = %job.id,
                    execution_id = %job.data.execution_id,
                    execution_ms = started.elapsed().as_millis() as u64,
                    steps_executed = job.data.steps.len(),
                    "job completed successfully"
                );
                for listener in &self.listeners {
                    listener.on_completed(&job).await;
                }
            }
            Err(e) => {
                let error_text = e.to_string();
                error!(
                    job_id = %job.id,
                    execution_id = %job.data.execution_id,
                    error = %error_text,
                    attempt = job.attempts_made,
                    "job attempt failed"
                );

                // Persist the failure before the queue decides anything;
                // a retry will overwrite this with the next outcome.
                if let Err(db_err) = self
                    .store
                    .update_execution(
                        &job.data.execution_id,
                        ExecutionUpdate::failed(&error_text),
                    )
                    .await
                {
                    error!(
                        execution_id = %job.data.execution_id,
                        error = %db_err,
                        "failed to update execution status"
                    );
                }

                if job.attempts_exhausted() {
                    if let Err(e) = self.broker.fail(&job, &error_text).await {
                        error!(job_id = %job.id, error = %e, "failed to mark job failed");
                    }
                    for listener in &self.listeners {
                        listener.on_failed(&job, &error_text).await;
                    }
                } else {
                    let delay =
                        backoff_delay_with_base(job.attempts_made, self.options.backoff_base_ms);
                    debug!(job_id = %job.id, delay_ms = delay.as_millis() as u64, "scheduling retry");
                    if let Err(e) = self.broker.retry_later(&job, &error_text, delay).await {
                        error!(job_id = %job.id, error = %e, "failed to schedule retry");
                    }
                }
            }
        }
    }

    /// One end-to-end attempt: session, context, steps, artifacts, store.
    async fn run_attempt(&self, job: &Job) -> Result<(), WorkerError> {
        self.report_progress(job, 10).await;

        let session = self.pool.acquire().await?;
        self.report_progress(job, 20).await;

        let outcome = self.drive_session(job, &session).await;
        self.pool.release(session).await;
        self.report_progress(job, 95).await;

        let update = outcome?;
        self.store
            .update_execution(&job.data.execution_id, update)
            .await?;
        Ok(())
    }

    async fn drive_session(
        &self,
        job: &Job,
        session: &BrowserSession,
    ) -> Result<ExecutionUpdate, WorkerError> {
        let context_options = ContextOptions::desktop_chrome(
            self.options.viewport,
            self.options.upload_dir.to_string_lossy(),
        );
        let context_id = self
            .driver
            .context_new(&session.browser_id, &context_options)
            .await?;

        let outcome = self.drive_context(job, &context_id).await;
        if outcome.is_err() {
            // The success path has already closed the context.
            if let Err(close_err) = self.driver.context_close(&context_id).await {
                warn!(error = %close_err, "cleanup failed");
            }
        }
        outcome
    }

    async fn drive_context(
        &self,
        job: &Job,
        context_id: &str,
    ) -> Result<ExecutionUpdate, WorkerError> {
        let page_id = self.driver.page_new(context_id).await?;
        self.driver
            .set_default_timeout(&page_id, crate::engine::interpreter::DEFAULT_TIMEOUT_MS)
            .await?;
        self.report_progress(job, 30).await;

        let executor =
            StepExecutor::with_pacing(self.driver.as_ref(), context_id, self.options.pacing.clone());
        let results = executor.run(&page_id, &job.data.steps).await;
        self.report_progress(job, 70).await;

        // Let late redirects and XHRs land before the final capture.
        tokio::time::sleep(self.options.post_run_settle).await;

        let screenshot_name = format!("screenshot-{}.png", Utc::now().timestamp_millis());
        let screenshot_path = self.options.upload_dir.join(&screenshot_name);
        self.driver
            .screenshot_to_file(&page_id, &screenshot_path.to_string_lossy(), true)
            .await?;
        let screenshot_url = format!("/uploads/{}", screenshot_name);
        self.report_progress(job, 85).await;

        let video_url = self
            .driver
            .video_path(&page_id)
            .await?
            .and_then(|path| {
                PathBuf::from(path)
                    .file_name()
                    .map(|name| format!("/uploads/{}", name.to_string_lossy()))
            })
            .unwrap_or_default();
        self.report_progress(job, 90).await;

        self.driver.context_close(context_id).await?;

        // Any script that ran to completion is a success, even when single
        // steps failed along the way; their outcomes are in the audit log.
        Ok(ExecutionUpdate::completed(
            results,
            screenshot_url,
            video_url,
        ))
    }

    async fn notify_active(&self, job: &Job) {
        info!(
            job_id = %job.id,
            execution_id = %job.data.execution_id,
            steps_count = job.data.steps.len(),
            attempt = job.attempts_made,
            "processing automation job"
        );
        for listener in &self.listeners {
            listener.on_active(job).await;
        }
    }

    async fn report_progress(&self, job: &Job, progress: u8) {
        debug!(job_id = %job.id, progress, "job progress");
        join_all(
            self.listeners
                .iter()
                .map(|listener| listener.on_progress(job, progress)),
        )
        .await;
    }
}
