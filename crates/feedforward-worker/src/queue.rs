//! In-process task queue: bounded channel, worker pool, retry with backoff.
//!
//! Tasks live only in memory. A process restart loses queued and retrying
//! tasks; requests left `pending` or `processing` are not re-enqueued.

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use feedforward_core::models::TaskPayload;

use crate::context::TaskHandlerContext;
use crate::dispatcher::{DispatchError, TaskDispatcher};

/// Maximum delay in seconds before retrying a failed task.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

const QUEUE_CAPACITY: usize = 1024;

/// Backoff multiplier for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: u32) -> u64 {
    2_u64
        .checked_pow(retry_count)
        .unwrap_or(u64::MAX)
        .min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Debug, Clone)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    /// Upper bound for one handler invocation
    pub task_timeout: Duration,
    /// Unit the exponential backoff is counted in
    pub retry_backoff_unit: Duration,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 3,
            task_timeout: Duration::from_secs(15 * 60),
            retry_backoff_unit: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueuedTask {
    payload: TaskPayload,
    retry_count: u32,
}

/// Receiving half handed to [`LocalTaskQueue::start`] once the handler context exists.
pub struct TaskReceiver {
    tasks: mpsc::Receiver<QueuedTask>,
    shutdown: mpsc::Receiver<()>,
}

#[derive(Clone)]
pub struct LocalTaskQueue {
    sender: mpsc::Sender<QueuedTask>,
    shutdown_tx: mpsc::Sender<()>,
    config: TaskQueueConfig,
}

impl LocalTaskQueue {
    /// Create the queue without starting workers. Tasks enqueued before
    /// [`start`](Self::start) wait in the channel.
    pub fn new(config: TaskQueueConfig) -> (Self, TaskReceiver) {
        let (sender, tasks) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown) = mpsc::channel(1);
        (
            Self {
                sender,
                shutdown_tx,
                config,
            },
            TaskReceiver { tasks, shutdown },
        )
    }

    /// Spawn the worker pool. The pool stops on [`shutdown`](Self::shutdown)
    /// or when the context is dropped.
    pub fn start(&self, receiver: TaskReceiver, context: Weak<dyn TaskHandlerContext>) -> JoinHandle<()> {
        let retry_tx = self.sender.clone();
        let config = self.config.clone();
        tokio::spawn(Self::worker_pool(receiver, retry_tx, config, context))
    }

    async fn worker_pool(
        mut receiver: TaskReceiver,
        retry_tx: mpsc::Sender<QueuedTask>,
        config: TaskQueueConfig,
        context: Weak<dyn TaskHandlerContext>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_retries = config.max_retries,
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        loop {
            let task = tokio::select! {
                _ = receiver.shutdown.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    break;
                }
                task = receiver.tasks.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let ctx = context.clone();
            let retry_tx = retry_tx.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::process_task(task, ctx, retry_tx, config).await;
            });
        }

        tracing::info!("Task queue worker pool stopped");
    }

    #[tracing::instrument(skip(context, retry_tx, config), fields(request_id = %task.payload.request_id, retry_count = task.retry_count))]
    async fn process_task(
        task: QueuedTask,
        context: Weak<dyn TaskHandlerContext>,
        retry_tx: mpsc::Sender<QueuedTask>,
        config: TaskQueueConfig,
    ) {
        let Some(ctx) = context.upgrade() else {
            tracing::error!("TaskHandlerContext was dropped, cannot process task");
            return;
        };

        let result = tokio::time::timeout(config.task_timeout, ctx.dispatch_task(&task.payload)).await;

        let error = match result {
            Ok(Ok(outcome)) => {
                tracing::info!(outcome = ?outcome, "Task completed");
                return;
            }
            Ok(Err(e)) if !e.is_recoverable() => {
                tracing::error!(error = %e, "Task failed with unrecoverable error, will not retry");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "Task execution timed out after {} seconds",
                config.task_timeout.as_secs()
            ),
        };

        if task.retry_count >= config.max_retries {
            tracing::error!(
                error = %error,
                max_retries = config.max_retries,
                "Task failed after max retries"
            );
            return;
        }

        let backoff = config
            .retry_backoff_unit
            .saturating_mul(compute_retry_backoff_seconds(task.retry_count) as u32);
        tracing::warn!(
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "Task failed, scheduling retry"
        );

        let retried = QueuedTask {
            payload: task.payload,
            retry_count: task.retry_count + 1,
        };
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            if retry_tx.send(retried).await.is_err() {
                tracing::warn!(request_id = %retried.payload.request_id, "Task queue closed, dropping retry");
            }
        });
    }

    /// Signals the worker pool to stop taking tasks. In-flight tasks keep running.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[async_trait]
impl TaskDispatcher for LocalTaskQueue {
    async fn enqueue(&self, payload: TaskPayload) -> Result<(), DispatchError> {
        self.sender
            .send(QueuedTask {
                payload,
                retry_count: 0,
            })
            .await
            .map_err(|_| DispatchError::QueueClosed)?;
        tracing::debug!(request_id = %payload.request_id, "Task enqueued locally");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
    }
}
