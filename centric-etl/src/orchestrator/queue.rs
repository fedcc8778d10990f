//! Single-flight run queue.
//!
//! Run requests are executed one at a time, in submission order, by a single
//! worker task. Requests made while a run is active wait their turn; they are
//! never rejected or merged.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use centric_etl_shared::{RunSummary, StageSet};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::ServiceError;
use crate::orchestrator::{RunExecutor, RunRequest};

/// Snapshot of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Runs waiting for the worker.
    pub pending: usize,
    /// Whether a run is executing.
    pub running: bool,
    /// Runs finished since startup.
    pub completed: u64,
}

struct QueuedRun {
    request: RunRequest,
    done: Option<oneshot::Sender<RunSummary>>,
}

#[derive(Default)]
struct QueueState {
    pending: AtomicUsize,
    running: AtomicBool,
    completed: AtomicU64,
}

/// FIFO queue with exactly one worker.
pub struct RunQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedRun>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<QueueState>,
}

impl RunQueue {
    /// Start the worker task. Must be called within a Tokio runtime.
    pub fn start(executor: Arc<dyn RunExecutor>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());
        let worker = tokio::spawn(Self::work(executor, receiver, state.clone()));

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            state,
        }
    }

    /// Enqueue a run and return immediately.
    pub fn submit(&self, stages: StageSet, trigger: impl Into<String>) -> Result<(), ServiceError> {
        self.enqueue(QueuedRun {
            request: RunRequest::new(stages, trigger),
            done: None,
        })
    }

    /// Enqueue a run and wait for its summary.
    pub async fn submit_and_wait(
        &self,
        stages: StageSet,
        trigger: impl Into<String>,
    ) -> Result<RunSummary, ServiceError> {
        let (done, finished) = oneshot::channel();
        self.enqueue(QueuedRun {
            request: RunRequest::new(stages, trigger),
            done: Some(done),
        })?;
        finished.await.map_err(|_| ServiceError::QueueClosed)
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.state.pending.load(Ordering::SeqCst),
            running: self.state.running.load(Ordering::SeqCst),
            completed: self.state.completed.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting runs, let the queued ones finish and join the worker.
    pub async fn shutdown(&self) {
        lock(&self.sender).take();
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Run queue worker terminated abnormally");
            }
        }
        info!("Run queue shut down");
    }

    fn enqueue(&self, run: QueuedRun) -> Result<(), ServiceError> {
        let sender = lock(&self.sender);
        let Some(sender) = sender.as_ref() else {
            return Err(ServiceError::QueueClosed);
        };

        let stages = run.request.stages.clone();
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(run).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(ServiceError::QueueClosed);
        }
        debug!(stages = %stages, pending = self.state.pending.load(Ordering::SeqCst), "Run queued");
        Ok(())
    }

    async fn work(
        executor: Arc<dyn RunExecutor>,
        mut receiver: mpsc::UnboundedReceiver<QueuedRun>,
        state: Arc<QueueState>,
    ) {
        while let Some(run) = receiver.recv().await {
            state.pending.fetch_sub(1, Ordering::SeqCst);
            state.running.store(true, Ordering::SeqCst);

            // Each run gets its own task so that a panic fails the run, not the worker.
            let executor = executor.clone();
            let request = run.request.clone();
            let outcome = tokio::spawn(async move { executor.execute(request).await }).await;

            state.running.store(false, Ordering::SeqCst);
            state.completed.fetch_add(1, Ordering::SeqCst);

            let summary = match outcome {
                Ok(summary) => summary,
                Err(e) => {
                    error!(error = %e, trigger = %run.request.trigger, "Run aborted");
                    let mut summary = RunSummary::start(run.request.stages, run.request.trigger);
                    summary.errors.push(format!("Run aborted: {}", e));
                    summary.end = Some(Utc::now());
                    summary
                }
            };
            if let Some(done) = run.done {
                let _ = done.send(summary);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
