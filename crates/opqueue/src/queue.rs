//! Bounded, priority-ordered task queue with per-task timeouts.
//!
//! Tasks move through Queued -> Running -> {Completed, Failed, TimedOut};
//! submissions that cannot be accepted are Rejected up front (overflow or
//! shutdown). At most `max_concurrency` tasks run at once; everything else
//! waits in a priority heap. Within a priority tier, submission order is
//! preserved via a monotonic sequence number.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Notify};
use tracing::{trace, warn};

use crate::error::{QueueError, QueueResult};
use crate::stats::QueueStats;

/// Priority tier for a queued task.
///
/// Higher tiers are dispatched first. Tasks submitted without an explicit
/// priority get the lowest tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    #[default]
    Low,
    Normal,
    High,
    Critical,
}

/// Queue construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of tasks running simultaneously.
    pub max_concurrency: usize,
    /// Maximum number of tasks waiting to run (running tasks not counted).
    pub max_queue_size: usize,
    /// Default per-task timeout; `enqueue_with` may override per call.
    pub operation_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_queue_size: 64,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    fn validate(&self) -> QueueResult<()> {
        if self.max_concurrency == 0 {
            return Err(QueueError::InvalidConfig(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(QueueError::InvalidConfig(
                "max_queue_size must be greater than zero".to_string(),
            ));
        }
        if self.operation_timeout.is_zero() {
            return Err(QueueError::InvalidConfig(
                "operation_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A task waiting for a slot. Ordering: higher priority first, then earlier
/// submission (lower sequence number).
struct PendingTask {
    priority: TaskPriority,
    seq: u64,
    job: BoxFuture<'static, ()>,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    pending: BinaryHeap<PendingTask>,
    running: usize,
    shutting_down: bool,
    next_seq: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    total_execution_ms: AtomicU64,
}

struct Inner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    // Notified after every task completion so drain waiters can re-check.
    drained: Notify,
    counters: Counters,
}

impl Inner {
    /// Move queued tasks into free slots. Called after every enqueue and
    /// after every task completion; loops until slots or the heap run out.
    fn dispatch(inner: &Arc<Inner>) {
        loop {
            let job = {
                let mut state = inner.state.lock().expect("queue state lock poisoned");
                if state.running >= inner.config.max_concurrency {
                    return;
                }
                match state.pending.pop() {
                    Some(task) => {
                        state.running += 1;
                        trace!(
                            seq = task.seq,
                            running = state.running,
                            "dispatching queued task"
                        );
                        task.job
                    }
                    None => return,
                }
            };

            let worker = Arc::clone(inner);
            tokio::spawn(async move {
                job.await;
                {
                    let mut state = worker.state.lock().expect("queue state lock poisoned");
                    state.running -= 1;
                }
                worker.drained.notify_waiters();
                Inner::dispatch(&worker);
            });
        }
    }
}

/// Bounded, priority-ordered operation queue.
///
/// Cloning is cheap; all clones share the same queue.
#[derive(Clone)]
pub struct OperationQueue {
    inner: Arc<Inner>,
}

impl OperationQueue {
    /// Create a queue, validating the configuration.
    ///
    /// Non-positive `max_concurrency`, `max_queue_size`, or
    /// `operation_timeout` are rejected with [`QueueError::InvalidConfig`].
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(QueueState {
                    pending: BinaryHeap::new(),
                    running: 0,
                    shutting_down: false,
                    next_seq: 0,
                }),
                drained: Notify::new(),
                counters: Counters::default(),
            }),
        })
    }

    /// Submit a task at the lowest priority with the default timeout and
    /// await its result.
    pub async fn enqueue<T, F>(&self, task: F) -> QueueResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, String>> + Send + 'static,
    {
        self.enqueue_with(task, TaskPriority::default(), None).await
    }

    /// Submit a task with an explicit priority and optional timeout
    /// override, and await its result.
    ///
    /// Fails immediately with [`QueueError::Overflow`] when the pending
    /// queue is full, or [`QueueError::ShutDown`] after [`shutdown`]
    /// (running and already-queued tasks are unaffected by either).
    /// A task body returning `Err` surfaces as [`QueueError::TaskFailed`];
    /// exceeding the timeout surfaces as [`QueueError::Timeout`] and frees
    /// the slot for the next queued task.
    ///
    /// [`shutdown`]: OperationQueue::shutdown
    pub async fn enqueue_with<T, F>(
        &self,
        task: F,
        priority: TaskPriority,
        timeout_override: Option<Duration>,
    ) -> QueueResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, String>> + Send + 'static,
    {
        let timeout = timeout_override.unwrap_or(self.inner.config.operation_timeout);
        let (tx, rx) = oneshot::channel::<QueueResult<T>>();

        let counters_ref = Arc::clone(&self.inner);
        let job: BoxFuture<'static, ()> = Box::pin(async move {
            let started = Instant::now();
            let outcome = match tokio::time::timeout(timeout, task).await {
                Ok(Ok(value)) => {
                    let counters = &counters_ref.counters;
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    counters
                        .total_execution_ms
                        .fetch_add(started.elapsed().as_millis() as u64, Ordering::Relaxed);
                    Ok(value)
                }
                Ok(Err(reason)) => {
                    let counters = &counters_ref.counters;
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    counters
                        .total_execution_ms
                        .fetch_add(started.elapsed().as_millis() as u64, Ordering::Relaxed);
                    Err(QueueError::TaskFailed(reason))
                }
                Err(_elapsed) => {
                    counters_ref.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                    Err(QueueError::Timeout {
                        limit_ms: timeout.as_millis() as u64,
                    })
                }
            };
            // Receiver may have been dropped (caller gave up); that is fine.
            let _ = tx.send(outcome);
        });

        {
            let mut state = self.inner.state.lock().expect("queue state lock poisoned");
            if state.shutting_down {
                return Err(QueueError::ShutDown);
            }
            if state.pending.len() >= self.inner.config.max_queue_size {
                warn!(
                    queued = state.pending.len(),
                    max = self.inner.config.max_queue_size,
                    "rejecting task: queue full"
                );
                return Err(QueueError::Overflow {
                    queued: state.pending.len(),
                    max_queue_size: self.inner.config.max_queue_size,
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.push(PendingTask { priority, seq, job });
            trace!(seq, ?priority, queued = state.pending.len(), "task queued");
        }
        Inner::dispatch(&self.inner);

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(QueueError::Canceled),
        }
    }

    /// Stop accepting new tasks and wait until running and already-queued
    /// tasks have finished. Idempotent; concurrent callers all wait for the
    /// same quiescence.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().expect("queue state lock poisoned");
            state.shutting_down = true;
        }
        loop {
            let notified = self.inner.drained.notified();
            {
                let state = self.inner.state.lock().expect("queue state lock poisoned");
                if state.running == 0 && state.pending.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Drain accepted work, then stop accepting new tasks.
    /// Equivalent to [`shutdown`](OperationQueue::shutdown).
    pub async fn drain(&self) {
        self.shutdown().await;
    }

    /// Whether [`shutdown`](OperationQueue::shutdown) has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("queue state lock poisoned")
            .shutting_down
    }

    /// The configuration this queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Snapshot of activity counters, queue length, and active-task count.
    pub fn stats(&self) -> QueueStats {
        let (queued, active) = {
            let state = self.inner.state.lock().expect("queue state lock poisoned");
            (state.pending.len(), state.running)
        };
        let counters = &self.inner.counters;
        let completed = counters.completed.load(Ordering::Relaxed);
        let failed = counters.failed.load(Ordering::Relaxed);
        let timed_out = counters.timed_out.load(Ordering::Relaxed);
        let total_execution_ms = counters.total_execution_ms.load(Ordering::Relaxed);
        let finished = completed + failed;
        let avg_execution_ms = if finished == 0 {
            0
        } else {
            total_execution_ms / finished
        };

        QueueStats {
            completed,
            failed,
            timed_out,
            total_execution_ms,
            avg_execution_ms,
            queued,
            active,
        }
    }
}
