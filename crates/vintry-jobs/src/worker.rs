//! Concurrent worker for resolution requests.
//!
//! Each job is an independent, sequential pipeline; the worker fans
//! independent jobs out across bounded concurrent tasks. Events stream on a
//! broadcast channel for UI progress; shutdown is graceful (outstanding
//! jobs run to completion; stages are bounded and short, so cancellation
//! is coarse by design).

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use uuid::Uuid;

use vintry_core::defaults;
use vintry_core::models::ExtractedFields;

use crate::pipeline::ResolutionPipeline;
use crate::state::ResolutionStage;

/// Configuration for the resolution worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of concurrently processed jobs.
    pub max_concurrent_jobs: usize,
    /// Capacity of the pending-request queue.
    pub queue_capacity: usize,
    /// Whether to process jobs at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            queue_capacity: defaults::WORKER_QUEUE_CAPACITY,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `JOB_QUEUE_CAPACITY` | `64` | Pending-request queue capacity |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let queue_capacity = std::env::var("JOB_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::WORKER_QUEUE_CAPACITY)
            .max(1);

        Self {
            max_concurrent_jobs,
            queue_capacity,
            enabled,
        }
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// One queued input for the pipeline.
#[derive(Debug, Clone)]
pub enum ResolutionInput {
    /// A photographed label.
    LabelScan { bytes: Vec<u8>, mime_type: String },
    /// Already-structured fields (one bulk-import row).
    Fields {
        row_number: usize,
        fields: ExtractedFields,
    },
}

/// A request submitted to the worker.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub id: Uuid,
    pub input: ResolutionInput,
}

impl ResolutionRequest {
    /// Create a request with a fresh id.
    pub fn new(input: ResolutionInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
        }
    }
}

/// Event emitted by the resolution worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { request_id: Uuid },
    /// A job reached a terminal stage.
    JobCompleted {
        request_id: Uuid,
        stage: ResolutionStage,
    },
    /// A job failed before reaching a terminal stage.
    JobFailed { request_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    request_tx: mpsc::Sender<ResolutionRequest>,
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Submit a request; awaits when the queue is full.
    pub async fn submit(&self, request: ResolutionRequest) -> vintry_core::Result<()> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| vintry_core::Error::Internal("Worker queue closed".into()))
    }

    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> vintry_core::Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| vintry_core::Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that processes resolution requests from a queue.
pub struct ResolutionWorker {
    pipeline: Arc<ResolutionPipeline>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl ResolutionWorker {
    /// Create a new worker over a pipeline.
    pub fn new(pipeline: Arc<ResolutionPipeline>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            pipeline,
            config,
            event_tx,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (request_tx, request_rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let worker = Arc::new(self);
        tokio::spawn(async move {
            worker.run(request_rx, shutdown_rx).await;
        });

        WorkerHandle {
            request_tx,
            shutdown_tx,
            event_rx,
        }
    }

    async fn run(
        self: Arc<Self>,
        mut request_rx: mpsc::Receiver<ResolutionRequest>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        if !self.config.enabled {
            info!("Resolution worker is disabled, not starting");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent_jobs,
            queue_capacity = self.config.queue_capacity,
            "Resolution worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let mut tasks = JoinSet::new();

        loop {
            // Bound concurrency before taking more work.
            while tasks.len() >= self.config.max_concurrent_jobs {
                if let Some(Err(e)) = tasks.join_next().await {
                    error!(error = ?e, "Resolution task panicked");
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Resolution worker received shutdown signal");
                    break;
                }
                maybe = request_rx.recv() => match maybe {
                    Some(request) => {
                        let worker = self.clone();
                        tasks.spawn(async move {
                            worker.execute(request).await;
                        });
                    }
                    None => break,
                }
            }
        }

        // Outstanding jobs run to completion; stages are bounded and short.
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Resolution task panicked");
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Resolution worker stopped");
    }

    async fn execute(&self, request: ResolutionRequest) {
        let request_id = request.id;
        debug!(%request_id, "Processing resolution request");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { request_id });

        let outcome = match request.input {
            ResolutionInput::LabelScan { bytes, mime_type } => {
                self.pipeline.resolve_label_scan(&bytes, &mime_type).await
            }
            ResolutionInput::Fields { row_number, fields } => {
                self.pipeline.resolve_fields(row_number, fields).await
            }
        };

        match outcome {
            Ok(job) => {
                let _ = self.event_tx.send(WorkerEvent::JobCompleted {
                    request_id,
                    stage: job.stage(),
                });
            }
            Err(e) => {
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    request_id,
                    error: e.to_string(),
                });
            }
        }
    }
}
