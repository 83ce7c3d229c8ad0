//! Opqueue: Bounded Operation Queue
//!
//! This crate provides the concurrency primitive underneath the directive
//! runtime: a priority-ordered task queue with a hard concurrency cap,
//! queue-overflow rejection, per-task timeouts, and graceful draining.
//!
//! ## Layer 0 - Scheduling
//!
//! Focus: backpressure, fairness, and bounded resource usage.
//!
//! ## Key Components
//!
//! - `OperationQueue`: submit tasks, await their results
//! - `QueueConfig`: concurrency / queue-size / timeout limits
//! - `TaskPriority`: four tiers, FIFO within a tier
//! - `QueueStats`: activity counters for observability

mod error;
mod queue;
mod stats;

pub use error::{QueueError, QueueResult};
pub use queue::{OperationQueue, QueueConfig, TaskPriority};
pub use stats::QueueStats;
