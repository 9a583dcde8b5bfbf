//! Job model and retry policy

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::script::Action;

/// Attempts before a job is terminally failed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base of the exponential backoff curve
pub const BACKOFF_BASE_MS: u64 = 2_000;

/// Completed jobs retained for inspection
pub const COMPLETED_RETENTION: usize = 100;

/// Failed jobs are kept longer than completed ones
pub const FAILED_RETENTION: usize = 200;

/// What a job carries: which execution to drive and with what script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub execution_id: String,
    pub steps: Vec<Action>,
    pub prompt: String,
}

/// A queued unit of work wrapping one execution.
///
/// Delivery is at-least-once: a stalled or failed job re-enters the waiting
/// set until its attempts are exhausted, so everything a job does to the
/// execution store must be an idempotent overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub data: JobPayload,
    /// Attempts started, including the current one
    pub attempts_made: u32,
    pub max_attempts: u32,
}

impl Job {
    pub fn new(data: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            attempts_made: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// True when this job may not be retried again.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }
}

/// Job lifecycle: waiting → active → completed, or active → delayed →
/// waiting while attempts remain, else active → failed. A stalled active
/// job re-enters waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

/// Aggregate queue counts for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.waiting + self.active + self.delayed + self.completed + self.failed
    }
}

/// Delay before retry `attempt` (1-based): `base × 2^(attempt-1)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    backoff_delay_with_base(attempt, BACKOFF_BASE_MS)
}

pub fn backoff_delay_with_base(attempt: u32, base_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Action;

    fn payload() -> JobPayload {
        JobPayload {
            execution_id: "e1".into(),
            steps: vec![Action::screenshot()],
            prompt: "take a screenshot".into(),
        }
    }

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new(payload());
        assert_eq!(job.attempts_made, 0);
        assert_eq!(job.max_attempts, 3);
        assert!(!job.attempts_exhausted());
    }

    #[test]
    fn test_backoff_curve() {
        assert_eq!(backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(2), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(3), Duration::from_millis(8_000));
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        // Attempt numbers far past the retry cap must not panic.
        let _ = backoff_delay(200);
    }

    #[test]
    fn test_job_roundtrips_through_json() {
        let job = Job::new(payload());
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.data.execution_id, "e1");
    }
}
