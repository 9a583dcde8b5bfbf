//! Execution store
//!
//! Persistence for execution records, consumed only through create and
//! update-by-id. Because jobs are delivered at least once, every update is
//! an idempotent overwrite: applying the same terminal update twice leaves
//! one record, not two.

use async_trait::async_trait;

use crate::engine::result::{Execution, ExecutionUpdate, NewExecution};

pub mod file;

pub use file::FileStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Creates a record with a fresh id, status `running`, and
    /// `start_time = now`.
    async fn create_execution(&self, fields: NewExecution) -> Result<Execution, StoreError>;

    /// Overwrites the set fields of the record with this id. An unknown id
    /// is a local warning, never an error; `None` is returned.
    async fn update_execution(
        &self,
        id: &str,
        update: ExecutionUpdate,
    ) -> Result<Option<Execution>, StoreError>;

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>, StoreError>;
}
