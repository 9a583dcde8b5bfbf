//! Automation execution engine
//!
//! This module contains:
//! - `interpreter` - Maps one action to browser driver calls
//! - `executor` - Runs an action list sequentially with per-step isolation
//! - `pacing` - Human-like timing jitter
//! - `result` - Step results and execution records
//! - `error` - Engine error types

pub mod error;
pub mod executor;
pub mod interpreter;
pub mod pacing;
pub mod result;

pub use error::EngineError;
pub use executor::StepExecutor;
pub use interpreter::Interpreter;
pub use pacing::Pacing;
pub use result::{
    Execution, ExecutionStatus, ExecutionUpdate, NewExecution, StepResult,
};
