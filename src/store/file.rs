//! File-backed execution store
//!
//! Keeps all executions in one pretty-printed JSON array. Read-modify-write
//! happens under an async mutex, so concurrent job slots in one process
//! cannot interleave writes.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ExecutionStore, StoreError};
use crate::engine::result::{Execution, ExecutionStatus, ExecutionUpdate, NewExecution};

pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) the store under `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join("executions.json");
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, "[]").await?;
        }
        info!(path = %path.display(), "file-based execution store initialized");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    async fn read_all(&self) -> Result<Vec<Execution>, StoreError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_all(&self, executions: &[Execution]) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(executions)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for FileStore {
    async fn create_execution(&self, fields: NewExecution) -> Result<Execution, StoreError> {
        let _guard = self.lock.lock().await;

        let execution = Execution {
            id: Uuid::new_v4().to_string(),
            prompt: fields.prompt,
            workflow_id: fields.workflow_id,
            status: ExecutionStatus::Running,
            steps: fields.steps,
            results: Vec::new(),
            screenshot: None,
            video_url: None,
            error_log: None,
            start_time: Utc::now(),
            end_time: None,
        };

        let mut executions = self.read_all().await?;
        executions.push(execution.clone());
        self.write_all(&executions).await?;

        info!(execution_id = %execution.id, "execution created");
        Ok(execution)
    }

    async fn update_execution(
        &self,
        id: &str,
        update: ExecutionUpdate,
    ) -> Result<Option<Execution>, StoreError> {
        let _guard = self.lock.lock().await;

        let mut executions = self.read_all().await?;
        let Some(execution) = executions.iter_mut().find(|e| e.id == id) else {
            warn!(execution_id = %id, "update for unknown execution");
            return Ok(None);
        };

        update.apply(execution);
        let updated = execution.clone();
        self.write_all(&executions).await?;
        Ok(Some(updated))
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError> {
        let executions = self.read_all().await?;
        Ok(executions.into_iter().find(|e| e.id == id))
    }
}
