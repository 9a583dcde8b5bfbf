//! In-process broker
//!
//! Same contract as the Redis broker, kept entirely in memory behind one
//! mutex. Used by the test suite and by single-process deployments that do
//! not need cross-process durability.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

use super::broker::{Broker, QueueError, LEASE_MS};
use super::job::{Job, QueueCounts, COMPLETED_RETENTION, FAILED_RETENTION};

#[derive(Default)]
struct State {
    waiting: VecDeque<String>,
    active: Vec<String>,
    /// (ready_at unix ms, job id)
    delayed: Vec<(i64, String)>,
    completed: VecDeque<String>,
    failed: VecDeque<String>,
    jobs: HashMap<String, Job>,
    errors: HashMap<String, String>,
    leases: HashMap<String, Instant>,
}

pub struct MemoryBroker {
    state: Mutex<State>,
    lease: Duration,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_lease(Duration::from_millis(LEASE_MS))
    }

    /// A broker with a custom lease duration, for exercising stall handling
    /// without waiting out the production lease.
    pub fn with_lease(lease: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            lease,
        }
    }

    /// Last recorded error for a job, if any.
    pub async fn last_error(&self, job_id: &str) -> Option<String> {
        self.state.lock().await.errors.get(job_id).cloned()
    }

    /// Current snapshot of a job body.
    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.state.lock().await.jobs.get(job_id).cloned()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn remove(list: &mut Vec<String>, job_id: &str) {
    list.retain(|id| id != job_id);
}

fn prune(list: &mut VecDeque<String>, keep: usize, jobs: &mut HashMap<String, Job>) {
    while list.len() > keep {
        if let Some(expired) = list.pop_back() {
            jobs.remove(&expired);
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.jobs.insert(job.id.clone(), job.clone());
        state.waiting.push_back(job.id.clone());
        Ok(())
    }

    async fn reserve(&self) -> Result<Option<Job>, QueueError> {
        let mut state = self.state.lock().await;
        let Some(job_id) = state.waiting.pop_front() else {
            return Ok(None);
        };

        state.active.push(job_id.clone());
        let lease_until = Instant::now() + self.lease;
        state.leases.insert(job_id.clone(), lease_until);

        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.clone()))?;
        job.attempts_made += 1;
        Ok(Some(job.clone()))
    }

    async fn heartbeat(&self, job_id: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let lease_until = Instant::now() + self.lease;
        state.leases.insert(job_id.to_string(), lease_until);
        Ok(())
    }

    async fn complete(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        remove(&mut state.active, &job.id);
        state.leases.remove(&job.id);
        state.completed.push_front(job.id.clone());
        let State {
            completed, jobs, ..
        } = &mut *state;
        prune(completed, COMPLETED_RETENTION, jobs);
        Ok(())
    }

    async fn retry_later(
        &self,
        job: &Job,
        error: &str,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        remove(&mut state.active, &job.id);
        state.leases.remove(&job.id);
        state.jobs.insert(job.id.clone(), job.clone());
        state.errors.insert(job.id.clone(), error.to_string());
        let ready_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        state.delayed.push((ready_at, job.id.clone()));
        Ok(())
    }

    async fn fail(&self, job: &Job, error: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        remove(&mut state.active, &job.id);
        state.leases.remove(&job.id);
        state.jobs.insert(job.id.clone(), job.clone());
        state.errors.insert(job.id.clone(), error.to_string());
        state.failed.push_front(job.id.clone());
        let State { failed, jobs, .. } = &mut *state;
        prune(failed, FAILED_RETENTION, jobs);
        Ok(())
    }

    async fn promote_due(&self) -> Result<u64, QueueError> {
        let mut state = self.state.lock().await;
        let now = Utc::now().timestamp_millis();
        let (due, pending): (Vec<_>, Vec<_>) = state
            .delayed
            .drain(..)
            .partition(|(ready_at, _)| *ready_at <= now);
        state.delayed = pending;
        let promoted = due.len() as u64;
        for (_, job_id) in due {
            state.waiting.push_back(job_id);
        }
        Ok(promoted)
    }

    async fn requeue_stalled(&self) -> Result<Vec<String>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let stalled: Vec<String> = state
            .active
            .iter()
            .filter(|id| {
                state
                    .leases
                    .get(*id)
                    .map(|until| *until <= now)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        for job_id in &stalled {
            warn!(job_id = %job_id, "requeuing stalled job");
            remove(&mut state.active, job_id);
            state.leases.remove(job_id);
            state.waiting.push_back(job_id.clone());
        }
        Ok(stalled)
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let state = self.state.lock().await;
        Ok(QueueCounts {
            waiting: state.waiting.len() as u64,
            active: state.active.len() as u64,
            delayed: state.delayed.len() as u64,
            completed: state.completed.len() as u64,
            failed: state.failed.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::JobPayload;

    fn job() -> Job {
        Job::new(JobPayload {
            execution_id: "e1".into(),
            steps: vec![],
            prompt: "p".into(),
        })
    }

    #[tokio::test]
    async fn test_reserve_starts_an_attempt() {
        let broker = MemoryBroker::new();
        broker.enqueue(&job()).await.unwrap();

        let reserved = broker.reserve().await.unwrap().unwrap();
        assert_eq!(reserved.attempts_made, 1);
        assert_eq!(broker.counts().await.unwrap().active, 1);
        assert!(broker.reserve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let broker = MemoryBroker::new();
        let first = job();
        let second = job();
        broker.enqueue(&first).await.unwrap();
        broker.enqueue(&second).await.unwrap();

        assert_eq!(broker.reserve().await.unwrap().unwrap().id, first.id);
        assert_eq!(broker.reserve().await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_retry_later_then_promote() {
        let broker = MemoryBroker::new();
        broker.enqueue(&job()).await.unwrap();
        let reserved = broker.reserve().await.unwrap().unwrap();

        broker
            .retry_later(&reserved, "boom", Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(broker.counts().await.unwrap().delayed, 1);

        assert_eq!(broker.promote_due().await.unwrap(), 1);
        let again = broker.reserve().await.unwrap().unwrap();
        assert_eq!(again.attempts_made, 2);
        assert_eq!(broker.last_error(&again.id).await.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_future_delay_is_not_promoted() {
        let broker = MemoryBroker::new();
        broker.enqueue(&job()).await.unwrap();
        let reserved = broker.reserve().await.unwrap().unwrap();
        broker
            .retry_later(&reserved, "boom", Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(broker.promote_due().await.unwrap(), 0);
        assert!(broker.reserve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stalled_job_reenters_waiting() {
        let broker = MemoryBroker::with_lease(Duration::from_millis(0));
        broker.enqueue(&job()).await.unwrap();
        let reserved = broker.reserve().await.unwrap().unwrap();

        let stalled = broker.requeue_stalled().await.unwrap();
        assert_eq!(stalled, vec![reserved.id.clone()]);
        assert_eq!(broker.counts().await.unwrap().waiting, 1);
        assert_eq!(broker.counts().await.unwrap().active, 0);
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_job_active() {
        let broker = MemoryBroker::with_lease(Duration::from_secs(60));
        broker.enqueue(&job()).await.unwrap();
        let reserved = broker.reserve().await.unwrap().unwrap();
        broker.heartbeat(&reserved.id).await.unwrap();

        assert!(broker.requeue_stalled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_retention_is_bounded() {
        let broker = MemoryBroker::new();
        for _ in 0..COMPLETED_RETENTION + 20 {
            let j = job();
            broker.enqueue(&j).await.unwrap();
            let reserved = broker.reserve().await.unwrap().unwrap();
            broker.complete(&reserved).await.unwrap();
        }
        assert_eq!(
            broker.counts().await.unwrap().completed,
            COMPLETED_RETENTION as u64
        );
    }
}
