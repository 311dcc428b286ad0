//! Background registration worker.
//!
//! Latency-sensitive callers hand actions to the worker through a
//! [`RegistrationHandle`] and return immediately. The worker executes queued
//! jobs one at a time and runs the retry sweep on a fixed interval, so
//! anything left at an intent status is picked up again.

use std::sync::Arc;
use std::time::Duration;

use pidreg_id::RecordId;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};

use crate::context::RequestContext;
use crate::error::{RegistrarError, RegistrarResult};
use crate::orchestrator::{Action, Outcome, Registrar};

/// Configuration for the registration worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the retry sweep runs.
    pub sweep_interval: Duration,

    /// Maximum number of queued jobs before `submit` refuses.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            queue_capacity: 1024,
        }
    }
}

/// One queued action.
#[derive(Debug, Clone)]
pub struct RegistrationJob {
    pub ctx: RequestContext,
    pub record: RecordId,
    pub action: Action,
}

/// Handle for queueing work on the worker.
#[derive(Clone)]
pub struct RegistrationHandle {
    tx: mpsc::Sender<RegistrationJob>,
}

impl RegistrationHandle {
    /// Queues a job without waiting on the registry.
    pub fn submit(&self, job: RegistrationJob) -> RegistrarResult<()> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RegistrarError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RegistrarError::WorkerStopped,
        })
    }

    /// Queues a job, waiting for queue space if needed.
    pub async fn send(&self, job: RegistrationJob) -> RegistrarResult<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| RegistrarError::WorkerStopped)
    }
}

/// Executes queued jobs and periodic retry sweeps.
pub struct RegistrationWorker {
    registrar: Arc<Registrar>,
    rx: mpsc::Receiver<RegistrationJob>,
    config: WorkerConfig,
}

impl RegistrationWorker {
    /// Create a worker and the handle that feeds it.
    pub fn new(registrar: Arc<Registrar>, config: WorkerConfig) -> (Self, RegistrationHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        (
            Self {
                registrar,
                rx,
                config,
            },
            RegistrationHandle { tx },
        )
    }

    /// Run until shutdown is signaled.
    #[instrument(skip(self, shutdown), name = "registration_worker")]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            "Starting registration worker"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval);
        let mut queue_open = true;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let ctx = RequestContext::system();
                    if let Err(e) = self.registrar.retry_pending(&ctx).await {
                        error!(error = %e, "Retry sweep failed");
                    }
                }
                job = self.rx.recv(), if queue_open => {
                    match job {
                        Some(job) => self.process(job).await,
                        None => {
                            warn!("All registration handles dropped, sweeping only");
                            queue_open = false;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Registration worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn process(&self, job: RegistrationJob) {
        let result = self
            .registrar
            .execute(&job.ctx, job.record, job.action)
            .await;

        match result {
            Ok(Outcome::Succeeded { status }) => {
                info!(
                    record_id = %job.record,
                    action = %job.action,
                    status = %status,
                    "Job succeeded"
                );
            }
            Ok(Outcome::PendingRetry { status, reason }) => {
                warn!(
                    record_id = %job.record,
                    action = %job.action,
                    status = %status,
                    reason = %reason,
                    "Job left for retry sweep"
                );
            }
            Ok(Outcome::NeedsAttention { status, message }) => {
                error!(
                    record_id = %job.record,
                    action = %job.action,
                    status = %status,
                    message = %message,
                    "Job needs operator attention"
                );
            }
            Err(e) if e.is_transient() => {
                // Any intent already committed is picked up by the sweep.
                warn!(
                    record_id = %job.record,
                    action = %job.action,
                    error = %e,
                    "Job failed transiently"
                );
            }
            Err(e) => {
                error!(record_id = %job.record, action = %job.action, error = %e, "Job failed");
            }
        }
    }
}
