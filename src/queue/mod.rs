//! Durable job queue and worker
//!
//! This module contains:
//! - `job` - Job model, retry policy, and queue counts
//! - `broker` - The `Broker` trait and the Redis-backed broker
//! - `memory` - In-process broker with the same contract
//! - `worker` - The job processor that drives executions end to end

pub mod broker;
pub mod job;
pub mod memory;
pub mod worker;

pub use broker::{Broker, QueueError, RedisBroker};
pub use job::{backoff_delay, Job, JobPayload, JobState, QueueCounts};
pub use memory::MemoryBroker;
pub use worker::{LoggingListener, QueueListener, Worker, WorkerError, WorkerOptions};
