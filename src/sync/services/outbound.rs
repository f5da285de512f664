//! Bounded queue for fire-and-forget tracker mutations.
//!
//! Inbound handlers enqueue jobs and reply immediately. A single worker task
//! drains the queue in order and records success and failure counts. Failed
//! jobs go back on the queue after a fixed backoff instead of holding up the
//! jobs behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::sync::{
    domain::{Progress, TaskGid, TaskToken},
    ports::{TrackerClient, TrackerError, TrackerTask},
    services::TaskResolver,
};

/// Progress change and comment for every task carrying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Token identifying the tasks.
    pub token: TaskToken,
    /// Comment markup to append.
    pub note: String,
    /// Target progress value.
    pub progress: Progress,
}

/// Tracker mutation executed by the outbound worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundJob {
    /// Replace a task title with its stamped form.
    RenameTask {
        /// Task to rename.
        task: TaskGid,
        /// New title.
        title: String,
    },
    /// Resolve a token into one [`OutboundJob::UpdateTask`] per matching task.
    SyncTask(TaskUpdate),
    /// Apply an update to one resolved task.
    UpdateTask {
        /// Task to update.
        task: TaskGid,
        /// Progress change and comment.
        update: TaskUpdate,
    },
}

impl OutboundJob {
    /// Returns a short job kind for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RenameTask { .. } => "rename_task",
            Self::SyncTask(_) => "sync_task",
            Self::UpdateTask { .. } => "update_task",
        }
    }
}

/// Errors raised while queueing or executing outbound jobs.
#[derive(Debug, Clone, Error)]
pub enum OutboundError {
    /// The queue is at capacity.
    #[error("outbound queue is full")]
    QueueFull,
    /// The worker has stopped.
    #[error("outbound queue is closed")]
    QueueClosed,
    /// A tracker call failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Executes outbound jobs against the tracker.
#[async_trait]
pub trait OutboundExecutor: Send + Sync {
    /// Runs one job attempt and returns the follow-up jobs it produced.
    ///
    /// Follow-ups run right after their parent and are retried on their
    /// own, so a failing follow-up never repeats the work of its siblings.
    async fn execute(&self, job: &OutboundJob) -> Result<Vec<OutboundJob>, OutboundError>;
}

/// Queue settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundSettings {
    /// Maximum number of pending jobs.
    pub capacity: usize,
    /// Attempts per job, first attempt included.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub retry_backoff: Duration,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Outbound queue counters.
#[derive(Debug, Default)]
pub struct OutboundStats {
    enqueued: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    last_failure_at: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`OutboundStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundStatsSnapshot {
    /// Jobs accepted by the queue, follow-ups included.
    pub enqueued: u64,
    /// Jobs that eventually succeeded.
    pub succeeded: u64,
    /// Attempts that failed and were retried.
    pub retried: u64,
    /// Jobs that exhausted their attempts.
    pub failed: u64,
    /// Jobs refused because the queue was full or closed.
    pub rejected: u64,
    /// Time of the last exhausted job.
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl OutboundStats {
    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> OutboundStatsSnapshot {
        OutboundStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            last_failure_at: *self
                .last_failure_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

#[derive(Debug)]
struct QueuedJob {
    id: Uuid,
    job: OutboundJob,
    attempt: u32,
}

impl QueuedJob {
    fn new(job: OutboundJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            attempt: 1,
        }
    }
}

#[derive(Debug)]
enum QueueMessage {
    Job(QueuedJob),
    Retry(QueuedJob),
    Flush(oneshot::Sender<()>),
    Stop,
}

/// Cloneable sending side of the outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundHandle {
    sender: mpsc::Sender<QueueMessage>,
    stats: Arc<OutboundStats>,
}

impl OutboundHandle {
    /// Queues a job without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::QueueFull`] or [`OutboundError::QueueClosed`]
    /// when the job cannot be queued.
    pub fn enqueue(&self, job: OutboundJob) -> Result<Uuid, OutboundError> {
        let queued = QueuedJob::new(job);
        let id = queued.id;
        let kind = queued.job.kind();
        match self.sender.try_send(QueueMessage::Job(queued)) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                debug!(job_id = %id, kind, "outbound job queued");
                Ok(id)
            }
            Err(err) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = %id, kind, "outbound job rejected");
                Err(match err {
                    mpsc::error::TrySendError::Full(_) => OutboundError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => OutboundError::QueueClosed,
                })
            }
        }
    }

    /// Waits until every job queued before this call has finished, retries
    /// included.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::QueueClosed`] when the worker has stopped.
    pub async fn flush(&self) -> Result<(), OutboundError> {
        let (done, finished) = oneshot::channel();
        self.sender
            .send(QueueMessage::Flush(done))
            .await
            .map_err(|_| OutboundError::QueueClosed)?;
        finished.await.map_err(|_| OutboundError::QueueClosed)
    }

    /// Returns the queue counters.
    #[must_use]
    pub fn stats(&self) -> OutboundStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Outbound queue owning the worker task.
pub struct OutboundQueue {
    handle: OutboundHandle,
    worker: JoinHandle<()>,
}

impl OutboundQueue {
    /// Spawns the worker on the current Tokio runtime.
    #[must_use]
    pub fn start<E, C>(executor: Arc<E>, clock: Arc<C>, settings: OutboundSettings) -> Self
    where
        E: OutboundExecutor + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let stats = Arc::new(OutboundStats::default());
        let worker = Worker {
            executor,
            clock,
            stats: Arc::clone(&stats),
            settings,
            retry_sender: sender.downgrade(),
            delayed: 0,
            waiters: Vec::new(),
        };
        let task = tokio::spawn(worker.run(receiver));
        Self {
            handle: OutboundHandle { sender, stats },
            worker: task,
        }
    }

    /// Returns a sending handle.
    #[must_use]
    pub fn handle(&self) -> OutboundHandle {
        self.handle.clone()
    }

    /// Drains the jobs queued so far and their pending retries, then stops
    /// the worker.
    pub async fn shutdown(self) {
        if self.handle.sender.send(QueueMessage::Stop).await.is_err() {
            debug!("outbound worker already stopped");
        }
        if let Err(err) = self.worker.await {
            error!(error = %err, "outbound worker terminated abnormally");
        }
    }
}

/// Worker state. Failed attempts are sent back through the channel after
/// the backoff, so a retry never blocks the jobs queued behind it.
struct Worker<E, C> {
    executor: Arc<E>,
    clock: Arc<C>,
    stats: Arc<OutboundStats>,
    settings: OutboundSettings,
    retry_sender: mpsc::WeakSender<QueueMessage>,
    delayed: usize,
    waiters: Vec<oneshot::Sender<()>>,
}

impl<E, C> Worker<E, C>
where
    E: OutboundExecutor,
    C: Clock + Send + Sync,
{
    async fn run(mut self, mut receiver: mpsc::Receiver<QueueMessage>) {
        let mut stopping = false;
        while let Some(message) = receiver.recv().await {
            match message {
                QueueMessage::Job(queued) => self.run_job(queued).await,
                QueueMessage::Retry(queued) => {
                    self.delayed = self.delayed.saturating_sub(1);
                    self.run_job(queued).await;
                }
                QueueMessage::Flush(done) => self.waiters.push(done),
                QueueMessage::Stop => stopping = true,
            }
            if self.delayed == 0 {
                self.release_waiters();
                if stopping {
                    break;
                }
            }
        }
        debug!("outbound worker stopped");
    }

    fn release_waiters(&mut self) {
        for done in self.waiters.drain(..) {
            if done.send(()).is_err() {
                debug!("flush waiter dropped");
            }
        }
    }

    async fn run_job(&mut self, first: QueuedJob) {
        let mut ready = VecDeque::from([first]);
        while let Some(queued) = ready.pop_front() {
            let kind = queued.job.kind();
            let outcome = self.executor.execute(&queued.job).await;
            match outcome {
                Ok(follow_ups) => {
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    debug!(job_id = %queued.id, kind, attempt = queued.attempt, "outbound job done");
                    for job in follow_ups {
                        let next = QueuedJob::new(job);
                        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                        debug!(job_id = %next.id, parent = %queued.id, kind = next.job.kind(), "follow-up job queued");
                        ready.push_back(next);
                    }
                }
                Err(err) if queued.attempt < self.settings.max_attempts => {
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    warn!(job_id = %queued.id, kind, attempt = queued.attempt, error = %err, "outbound job failed, retrying");
                    self.schedule_retry(queued);
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    *self
                        .stats
                        .last_failure_at
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(self.clock.utc());
                    error!(job_id = %queued.id, kind, attempt = queued.attempt, error = %err, "outbound job abandoned");
                }
            }
        }
    }

    fn schedule_retry(&mut self, queued: QueuedJob) {
        self.delayed = self.delayed.saturating_add(1);
        let retry = QueuedJob {
            attempt: queued.attempt.saturating_add(1),
            ..queued
        };
        let sender = self.retry_sender.clone();
        let backoff = self.settings.retry_backoff;
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            let job_id = retry.id;
            let Some(live) = sender.upgrade() else {
                debug!(%job_id, "outbound queue gone, retry dropped");
                return;
            };
            if live.send(QueueMessage::Retry(retry)).await.is_err() {
                debug!(%job_id, "outbound worker stopped, retry dropped");
            }
        });
    }
}

/// Executes outbound jobs against the tracker.
pub struct TaskUpdater<T>
where
    T: TrackerClient,
{
    tracker: Arc<T>,
    resolver: Arc<TaskResolver<T>>,
    progress_field_name: String,
}

impl<T> TaskUpdater<T>
where
    T: TrackerClient,
{
    /// Creates an updater selecting progress on the field named
    /// `progress_field_name`.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        resolver: Arc<TaskResolver<T>>,
        progress_field_name: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            resolver,
            progress_field_name: progress_field_name.into(),
        }
    }

    /// Resolves the token into one update job per matching task.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Tracker`] when the search fails.
    pub async fn plan(&self, update: &TaskUpdate) -> Result<Vec<OutboundJob>, OutboundError> {
        let gids = self.resolver.resolve(&update.token).await?;
        debug!(token = %update.token, tasks = gids.len(), "token resolved");
        Ok(gids
            .into_iter()
            .map(|task| OutboundJob::UpdateTask {
                task,
                update: update.clone(),
            })
            .collect())
    }

    /// Sets progress on one task, then appends the comment.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Tracker`] when a tracker call fails.
    pub async fn apply(&self, gid: &TaskGid, update: &TaskUpdate) -> Result<(), OutboundError> {
        let task = self.tracker.get_task(gid).await?;
        self.apply_progress(&task, update.progress).await?;
        debug!(token = %update.token, gid = %gid, "adding note to task");
        self.tracker.add_comment(gid, &update.note).await?;
        Ok(())
    }

    /// Selects `progress` on the task unless it is already selected.
    async fn apply_progress(&self, task: &TrackerTask, progress: Progress) -> Result<(), OutboundError> {
        let Some(field) = task.custom_field(&self.progress_field_name) else {
            warn!(gid = %task.gid, field = %self.progress_field_name, "task has no progress field");
            return Ok(());
        };
        if field.current.as_deref() == Some(progress.label()) {
            debug!(gid = %task.gid, progress = %progress, "progress already set");
            return Ok(());
        }
        let Some(option) = field.option(progress.label()) else {
            warn!(gid = %task.gid, progress = %progress, "progress field has no such option");
            return Ok(());
        };
        debug!(gid = %task.gid, progress = %progress, "updating task progress");
        self.tracker
            .set_custom_enum(&task.gid, &field.gid, &option.gid)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<T> OutboundExecutor for TaskUpdater<T>
where
    T: TrackerClient,
{
    async fn execute(&self, job: &OutboundJob) -> Result<Vec<OutboundJob>, OutboundError> {
        match job {
            OutboundJob::RenameTask { task, title } => {
                debug!(gid = %task, title = %title, "stamping task title");
                self.tracker.rename_task(task, title).await?;
                Ok(Vec::new())
            }
            OutboundJob::SyncTask(update) => self.plan(update).await,
            OutboundJob::UpdateTask { task, update } => {
                self.apply(task, update).await?;
                Ok(Vec::new())
            }
        }
    }
}
