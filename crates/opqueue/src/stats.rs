//! Aggregated queue activity counters.

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of queue activity.
///
/// `avg_execution_ms` averages over tasks that ran to completion (successes
/// and failures); timed-out tasks are counted separately because their true
/// duration is unknown beyond the timeout limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks that finished successfully.
    pub completed: u64,
    /// Tasks whose body returned an error.
    pub failed: u64,
    /// Tasks rejected by the per-task timeout.
    pub timed_out: u64,
    /// Summed wall-clock execution time of completed + failed tasks.
    pub total_execution_ms: u64,
    /// Mean wall-clock execution time of completed + failed tasks.
    pub avg_execution_ms: u64,
    /// Tasks currently waiting for a slot.
    pub queued: usize,
    /// Tasks currently running.
    pub active: usize,
}
