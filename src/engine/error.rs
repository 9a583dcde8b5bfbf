//! Engine error types

use crate::bridge::BridgeError;
use crate::script::ActionKind;

/// Errors that can occur while interpreting or executing actions
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Driver error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Action '{action}' missing required field '{param}'")]
    MissingParameter {
        action: ActionKind,
        param: &'static str,
    },

    #[error("Action '{action}' has invalid value: {reason}")]
    InvalidParameter { action: ActionKind, reason: String },
}
