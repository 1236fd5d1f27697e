//! Background upload worker.
//!
//! Runs a gated pass on a fixed interval, and immediately whenever
//! [`UploadWorker::trigger`] is called (for example when the host platform
//! reports that connectivity came back). Join handles are tracked,
//! cancellation is explicit, and every pass is wrapped in a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use sitecap_core::{upload_fn, Dispatcher, NetworkGate, UploadQueue};
//! use sitecap_domain::{Config, UploadError};
//! use sitecap_infra::network::probe_from_config;
//! use sitecap_infra::storage::open_store;
//! use sitecap_infra::sync::{UploadWorker, UploadWorkerConfig};
//!
//! # async fn example() -> sitecap_domain::Result<()> {
//! let config = Config::default();
//! let queue = UploadQueue::open(open_store(&config.store)?, config.queue.clone()).await?;
//! let gate = NetworkGate::new(probe_from_config(&config.network)?, Dispatcher::new(Arc::new(queue)));
//! let uploader = upload_fn(|item| async move { Ok::<_, UploadError>(json!({ "id": item.id })) });
//!
//! let mut worker = UploadWorker::new(
//!     Arc::new(gate),
//!     Arc::new(uploader),
//!     UploadWorkerConfig::from(&config.worker),
//! );
//! worker.start()?;
//! worker.trigger();
//! // ... application runs ...
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use sitecap_core::{NetworkGate, ProgressObserver, Uploader};
use sitecap_domain::{PassSummary, WorkerConfig};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::WorkerError;

/// Timing for the upload worker.
#[derive(Debug, Clone)]
pub struct UploadWorkerConfig {
    /// Interval between scheduled passes
    pub poll_interval: Duration,
    /// Upper bound on a single pass
    pub pass_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for UploadWorkerConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for UploadWorkerConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            pass_timeout: config.pass_timeout(),
            join_timeout: config.join_timeout(),
        }
    }
}

/// Upload worker with explicit lifecycle management.
pub struct UploadWorker {
    gate: Arc<NetworkGate>,
    uploader: Arc<dyn Uploader>,
    observer: Option<Arc<dyn ProgressObserver>>,
    config: UploadWorkerConfig,
    wake: Arc<Notify>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl UploadWorker {
    pub fn new(
        gate: Arc<NetworkGate>,
        uploader: Arc<dyn Uploader>,
        config: UploadWorkerConfig,
    ) -> Self {
        Self {
            gate,
            uploader,
            observer: None,
            config,
            wake: Arc::new(Notify::new()),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Report per-item progress from background passes.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start the background task. The first pass runs immediately.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let gate = Arc::clone(&self.gate);
        let uploader = Arc::clone(&self.uploader);
        let observer = self.observer.clone();
        let wake = Arc::clone(&self.wake);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(gate, uploader, observer, wake, config, cancel).await;
        });

        self.task_handle = Some(handle);
        info!(poll_interval_secs = self.config.poll_interval.as_secs(), "Upload worker started");
        Ok(())
    }

    /// Cancel the background task and wait for it to finish.
    ///
    /// A pass interrupted here leaves its current item `processing`; the
    /// next `UploadQueue::open` puts it back to `pending`.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Upload worker task panicked");
                return Err(WorkerError::Panicked(e.to_string()));
            }
            Err(_) => {
                warn!("Upload worker did not stop within timeout");
                return Err(WorkerError::JoinTimeout(join_timeout));
            }
        }

        info!("Upload worker stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Request a pass as soon as possible. Requests made while a pass is
    /// running collapse into one follow-up pass.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Run one bounded pass on the caller's task. `None` means the pass hit
    /// the timeout.
    pub async fn run_once(&self) -> Option<PassSummary> {
        Self::bounded_pass(
            &self.gate,
            self.uploader.as_ref(),
            self.observer.as_deref(),
            self.config.pass_timeout,
        )
        .await
    }

    async fn process_loop(
        gate: Arc<NetworkGate>,
        uploader: Arc<dyn Uploader>,
        observer: Option<Arc<dyn ProgressObserver>>,
        wake: Arc<Notify>,
        config: UploadWorkerConfig,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(config.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Upload worker loop cancelled");
                    break;
                }
                _ = ticker.tick() => {}
                _ = wake.notified() => {
                    debug!("Upload pass triggered");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Upload worker cancelled mid-pass");
                    Self::release_interrupted(&gate).await;
                    break;
                }
                _ = Self::bounded_pass(
                    &gate,
                    uploader.as_ref(),
                    observer.as_deref(),
                    config.pass_timeout,
                ) => {}
            }
        }
    }

    async fn bounded_pass(
        gate: &NetworkGate,
        uploader: &dyn Uploader,
        observer: Option<&dyn ProgressObserver>,
        pass_timeout: Duration,
    ) -> Option<PassSummary> {
        let started = Instant::now();

        match tokio::time::timeout(pass_timeout, gate.process_queue(uploader, observer)).await {
            Ok(summary) => {
                debug!(
                    processed = summary.processed,
                    failed = summary.failed,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Upload pass complete"
                );
                Some(summary)
            }
            Err(_) => {
                warn!(timeout_secs = pass_timeout.as_secs(), "Upload pass timed out");
                Self::release_interrupted(gate).await;
                None
            }
        }
    }

    /// Return items claimed by an abandoned pass to `pending`.
    ///
    /// The pass future has been dropped by the time this runs, so its
    /// in-flight item would otherwise stay `processing` until the next
    /// restart.
    async fn release_interrupted(gate: &NetworkGate) {
        match gate.queue().recover_stale().await {
            Ok(0) => {}
            Ok(released) => info!(released, "Released uploads from abandoned pass"),
            Err(e) => warn!(error = %e, "Failed to release uploads from abandoned pass"),
        }
    }
}

impl Drop for UploadWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("UploadWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
