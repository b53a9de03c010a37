//! # Sequence - Single-Writer Task Serializer
//!
//! A FIFO of asynchronous jobs drained by one worker task. Every
//! ledger-visible pool mutation (apply-unconfirmed, undo-unconfirmed,
//! insert, remove) is submitted here, which gives the mempool a
//! single-writer discipline without a lock per index.
//!
//! The worker blocks on the job channel, so there is no polling tick; the
//! overload signal survives as a per-dequeue check: whenever a job is taken
//! with the queue depth at or over `warning_limit`, the observer fires and a
//! warning is logged.
//!
//! Job failures belong to the submitter: a job's output (including an `Err`)
//! travels back through [`Sequence::run`] and never stops the worker.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Depth at which the overload warning starts firing.
pub const DEFAULT_WARNING_LIMIT: usize = 50;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Observer invoked as `(depth, limit)` when the queue is over the limit.
pub type WarningObserver = Box<dyn Fn(usize, usize) + Send + Sync + 'static>;

/// The sequence worker has shut down and can accept no more jobs.
#[derive(Debug, thiserror::Error)]
#[error("Sequence worker has shut down")]
pub struct SequenceClosed;

/// Handle to a single-worker FIFO job serializer.
///
/// Cloning the handle shares the same worker. Dropping every handle lets
/// the worker drain outstanding jobs and exit.
#[derive(Clone)]
pub struct Sequence {
    jobs: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
    warning_limit: usize,
}

impl Sequence {
    /// Spawn a sequence worker with the default warning limit.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: &'static str) -> Self {
        Self::with_warning_limit(name, DEFAULT_WARNING_LIMIT, None)
    }

    /// Spawn a sequence worker with an explicit warning limit and an
    /// optional overload observer.
    pub fn with_warning_limit(
        name: &'static str,
        warning_limit: usize,
        observer: Option<WarningObserver>,
    ) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let depth = Arc::new(AtomicUsize::new(0));

        let worker_depth = Arc::clone(&depth);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let current = worker_depth.load(Ordering::SeqCst);
                if current >= warning_limit {
                    warn!(
                        sequence = name,
                        depth = current,
                        limit = warning_limit,
                        "Sequence queue depth over warning limit"
                    );
                    if let Some(cb) = &observer {
                        cb(current, warning_limit);
                    }
                }
                job.await;
                worker_depth.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Self {
            jobs,
            depth,
            warning_limit,
        }
    }

    /// Enqueue `task` and wait for its result.
    ///
    /// Jobs run strictly one at a time in submission order. The task's
    /// output, success or error, is returned to this caller; the worker
    /// advances regardless.
    pub async fn run<T, F>(&self, task: F) -> Result<T, SequenceClosed>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        self.depth.fetch_add(1, Ordering::SeqCst);

        let job: Job = Box::pin(async move {
            // The submitter may have given up; the send failing must not
            // stall the worker.
            let _ = done_tx.send(task.await);
        });

        if self.jobs.send(job).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(SequenceClosed);
        }
        done_rx.await.map_err(|_| SequenceClosed)
    }

    /// Current queue depth, including the job being executed.
    pub fn count(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// The configured overload threshold.
    pub fn warning_limit(&self) -> usize {
        self.warning_limit
    }
}
