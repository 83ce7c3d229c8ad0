//! Error types for the operation queue.

/// Errors produced by the operation queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("queue overflow: {queued} task(s) already waiting (max {max_queue_size})")]
    Overflow { queued: usize, max_queue_size: usize },

    #[error("task timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("queue shut down: no new tasks accepted")]
    ShutDown,

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("task was dropped before producing a result")]
    Canceled,
}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
