//! # webpilot
//!
//! A browser automation engine that turns declarative action scripts into
//! executed browser behavior, reliably, under concurrency, with a full audit
//! trail: a per-step result log, screenshots, and a session recording.
//!
//! ## Architecture
//!
//! - **Bridge** - JSON-RPC driver for a Playwright sidecar process
//! - **Script** - The closed action vocabulary and the prompt planner
//! - **Engine** - Action interpreter and sequential step executor with
//!   per-step failure isolation
//! - **Pool** - Bounded cache of reusable browser sessions
//! - **Queue** - Durable Redis-backed job queue with retry, backoff, and
//!   stalled-job recovery, plus the worker that drives executions
//! - **Store** - Idempotent, overwrite-by-id execution persistence
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webpilot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver: Arc<dyn BrowserDriver> = Arc::new(PlaywrightDriver::start().await?);
//!     let pool = Arc::new(BrowserPool::new(driver.clone(), 3, true, (1920, 1080)));
//!     let store = Arc::new(FileStore::open("./data").await?);
//!     let broker = Arc::new(RedisBroker::connect("redis://127.0.0.1:6379").await?);
//!
//!     let execution = store
//!         .create_execution(NewExecution {
//!             prompt: "search google for rust".into(),
//!             workflow_id: None,
//!             steps: vec![
//!                 Action::navigate("https://www.google.com"),
//!                 Action::type_into("textarea[name=q]", "rust"),
//!                 Action::type_into("textarea[name=q]", "\n"),
//!             ],
//!         })
//!         .await?;
//!
//!     broker
//!         .enqueue(&Job::new(JobPayload {
//!             execution_id: execution.id,
//!             steps: execution.steps.clone(),
//!             prompt: execution.prompt,
//!         }))
//!         .await?;
//!
//!     let worker = Arc::new(Worker::new(
//!         driver,
//!         pool,
//!         broker,
//!         store,
//!         WorkerOptions::default(),
//!     ));
//!     worker.run().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod engine;
pub mod pool;
pub mod queue;
pub mod script;
pub mod store;

// Re-export main types
pub use bridge::{
    BridgeError, BrowserDriver, ContextOptions, DialogResponse, MouseButton, PageTarget,
    PlaywrightDriver,
};
pub use config::Config;
pub use engine::{
    EngineError, Execution, ExecutionStatus, ExecutionUpdate, Interpreter, NewExecution, Pacing,
    StepExecutor, StepResult,
};
pub use pool::{BrowserPool, BrowserSession};
pub use queue::{
    backoff_delay, Broker, Job, JobPayload, JobState, MemoryBroker, QueueCounts, QueueError,
    QueueListener, RedisBroker, Worker, WorkerError, WorkerOptions,
};
pub use script::{
    ensure_trailing_screenshot, fallback_script, Action, ActionCategory, ActionKind,
    OllamaPlanner, ScriptPlanner,
};
pub use store::{ExecutionStore, FileStore, StoreError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{BrowserDriver, PageTarget, PlaywrightDriver};
    pub use crate::config::Config;
    pub use crate::engine::{
        ExecutionStatus, ExecutionUpdate, NewExecution, Pacing, StepExecutor, StepResult,
    };
    pub use crate::pool::BrowserPool;
    pub use crate::queue::{
        Broker, Job, JobPayload, MemoryBroker, QueueListener, RedisBroker, Worker, WorkerOptions,
    };
    pub use crate::script::{Action, ActionKind, OllamaPlanner, ScriptPlanner};
    pub use crate::store::{ExecutionStore, FileStore};
}
