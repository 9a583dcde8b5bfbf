//! Broker trait and the Redis-backed broker
//!
//! The broker is the only state shared between worker processes. Jobs live
//! in a waiting list, an active list, a delayed set (scored by ready time),
//! and bounded completed/failed retention lists. An active job holds a
//! processing lease; a worker that stops heartbeating lets the lease expire
//! and the job is requeued as stalled.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

use super::job::{Job, QueueCounts, COMPLETED_RETENTION, FAILED_RETENTION};

/// How long a reservation stays valid without a heartbeat
pub const LEASE_MS: u64 = 30_000;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Broker(e.to_string())
    }
}

/// Durable distribution of jobs, at-least-once.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Adds a job to the waiting set.
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError>;

    /// Moves the oldest waiting job to active, starts its attempt (the
    /// attempt counter includes the attempt being started), and takes a
    /// processing lease. `None` when nothing is waiting.
    async fn reserve(&self) -> Result<Option<Job>, QueueError>;

    /// Renews the processing lease of an active job.
    async fn heartbeat(&self, job_id: &str) -> Result<(), QueueError>;

    /// Active → completed. Retention is pruned past the most recent window.
    async fn complete(&self, job: &Job) -> Result<(), QueueError>;

    /// Active → delayed; the job re-enters waiting once `delay` has passed.
    async fn retry_later(&self, job: &Job, error: &str, delay: Duration)
        -> Result<(), QueueError>;

    /// Active → failed, terminally. Retention is pruned past the window.
    async fn fail(&self, job: &Job, error: &str) -> Result<(), QueueError>;

    /// Moves delayed jobs whose time has come back to waiting. Returns how
    /// many were promoted.
    async fn promote_due(&self) -> Result<u64, QueueError>;

    /// Returns active jobs with expired leases to waiting. Returns the ids
    /// of the stalled jobs.
    async fn requeue_stalled(&self) -> Result<Vec<String>, QueueError>;

    async fn counts(&self) -> Result<QueueCounts, QueueError>;
}

/// Redis-backed broker. All worker processes share one of these.
pub struct RedisBroker {
    conn: redis::aio::MultiplexedConnection,
    prefix: String,
}

impl RedisBroker {
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            prefix: "webpilot:automation:".to_string(),
        })
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    fn job_key(&self, job_id: &str) -> String {
        self.key(&format!("job:{}", job_id))
    }

    fn lease_key(&self, job_id: &str) -> String {
        self.key(&format!("lease:{}", job_id))
    }

    async fn load_job(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &str,
    ) -> Result<Job, QueueError> {
        let raw: Option<String> = conn.hget(self.job_key(job_id), "data").await?;
        let raw = raw.ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save_job(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job: &Job,
    ) -> Result<(), QueueError> {
        let raw = serde_json::to_string(job)?;
        let _: () = conn.hset(self.job_key(&job.id), "data", raw).await?;
        Ok(())
    }

    async fn take_lease(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &str,
    ) -> Result<(), QueueError> {
        let _: () = redis::cmd("SET")
            .arg(self.lease_key(job_id))
            .arg(1)
            .arg("PX")
            .arg(LEASE_MS)
            .query_async(conn)
            .await?;
        Ok(())
    }

    /// Trims a retention list to `keep` entries, deleting the job bodies
    /// that fall off the end.
    async fn prune(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        list: &str,
        keep: usize,
    ) -> Result<(), QueueError> {
        let expired: Vec<String> = conn.lrange(self.key(list), keep as isize, -1).await?;
        for job_id in &expired {
            let _: () = conn.del(self.job_key(job_id)).await?;
        }
        let _: () = conn.ltrim(self.key(list), 0, keep as isize - 1).await?;
        Ok(())
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        self.save_job(&mut conn, job).await?;
        let _: () = conn.lpush(self.key("waiting"), &job.id).await?;
        debug!(job_id = %job.id, "job enqueued");
        Ok(())
    }

    async fn reserve(&self) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let job_id: Option<String> = conn
            .rpoplpush(self.key("waiting"), self.key("active"))
            .await?;
        let Some(job_id) = job_id else {
            return Ok(None);
        };

        let mut job = self.load_job(&mut conn, &job_id).await?;
        job.attempts_made += 1;
        self.save_job(&mut conn, &job).await?;
        self.take_lease(&mut conn, &job_id).await?;
        Ok(Some(job))
    }

    async fn heartbeat(&self, job_id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        self.take_lease(&mut conn, job_id).await
    }

    async fn complete(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(self.key("active"), 0, &job.id).await?;
        let _: () = conn.del(self.lease_key(&job.id)).await?;
        let _: () = conn.lpush(self.key("completed"), &job.id).await?;
        self.prune(&mut conn, "completed", COMPLETED_RETENTION).await
    }

    async fn retry_later(
        &self,
        job: &Job,
        error: &str,
        delay: Duration,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(self.key("active"), 0, &job.id).await?;
        let _: () = conn.del(self.lease_key(&job.id)).await?;
        self.save_job(&mut conn, job).await?;
        let _: () = conn
            .hset(self.job_key(&job.id), "error", error)
            .await?;
        let ready_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let _: () = conn.zadd(self.key("delayed"), &job.id, ready_at).await?;
        Ok(())
    }

    async fn fail(&self, job: &Job, error: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lrem(self.key("active"), 0, &job.id).await?;
        let _: () = conn.del(self.lease_key(&job.id)).await?;
        self.save_job(&mut conn, job).await?;
        let _: () = conn
            .hset(self.job_key(&job.id), "error", error)
            .await?;
        let _: () = conn.lpush(self.key("failed"), &job.id).await?;
        self.prune(&mut conn, "failed", FAILED_RETENTION).await
    }

    async fn promote_due(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore(self.key("delayed"), i64::MIN, now)
            .await?;
        for job_id in &due {
            let _: () = conn.zrem(self.key("delayed"), job_id).await?;
            let _: () = conn.lpush(self.key("waiting"), job_id).await?;
        }
        Ok(due.len() as u64)
    }

    async fn requeue_stalled(&self) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn.clone();
        let active: Vec<String> = conn.lrange(self.key("active"), 0, -1).await?;
        let mut stalled = Vec::new();
        for job_id in active {
            let leased: bool = conn.exists(self.lease_key(&job_id)).await?;
            if !leased {
                warn!(job_id = %job_id, "requeuing stalled job");
                let _: () = conn.lrem(self.key("active"), 0, &job_id).await?;
                let _: () = conn.lpush(self.key("waiting"), &job_id).await?;
                stalled.push(job_id);
            }
        }
        Ok(stalled)
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.llen(self.key("waiting")).await?;
        let active: u64 = conn.llen(self.key("active")).await?;
        let delayed: u64 = conn.zcard(self.key("delayed")).await?;
        let completed: u64 = conn.llen(self.key("completed")).await?;
        let failed: u64 = conn.llen(self.key("failed")).await?;
        Ok(QueueCounts {
            waiting,
            active,
            delayed,
            completed,
            failed,
        })
    }
}
