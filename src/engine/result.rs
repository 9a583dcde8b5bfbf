//! Step results and execution records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::script::{Action, ActionKind};

/// The recorded outcome of executing one action.
///
/// Results are append-only and kept in execution order. One action may emit
/// zero, one, or two of these (e.g. an extracted value plus its outcome
/// record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepResult {
    /// A page capture, base64-encoded PNG
    Screenshot {
        data: String,
        timestamp: DateTime<Utc>,
    },
    /// The answer to a pure page query
    ExtractedValue {
        kind: ActionKind,
        data: Value,
        timestamp: DateTime<Utc>,
    },
    /// Whether an action ran to completion
    Action {
        action: ActionKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl StepResult {
    pub fn screenshot(data: impl Into<String>) -> Self {
        StepResult::Screenshot {
            data: data.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn extracted(kind: ActionKind, data: Value) -> Self {
        StepResult::ExtractedValue {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn outcome_ok(action: &Action) -> Self {
        StepResult::Action {
            action: action.kind,
            reasoning: action.reasoning.clone(),
            success: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn outcome_err(action: &Action, error: impl Into<String>) -> Self {
        StepResult::Action {
            action: action.kind,
            reasoning: action.reasoning.clone(),
            success: false,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_action_outcome(&self) -> bool {
        matches!(self, StepResult::Action { .. })
    }

    pub fn is_screenshot(&self) -> bool {
        matches!(self, StepResult::Screenshot { .. })
    }
}

/// Lifecycle of one persisted execution: `running` at submission, then
/// exactly one transition to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// One full, persisted run of an action script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub status: ExecutionStatus,
    /// Snapshot of the script; immutable once set
    pub steps: Vec<Action>,
    #[serde(default)]
    pub results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Fields for creating an execution record
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub prompt: String,
    pub workflow_id: Option<String>,
    pub steps: Vec<Action>,
}

/// Partial update applied to an execution by id. Unset fields are left
/// untouched; the update is a plain overwrite and safe to apply twice.
#[derive(Debug, Clone, Default)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub results: Option<Vec<StepResult>>,
    pub screenshot: Option<String>,
    pub video_url: Option<String>,
    pub error_log: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ExecutionUpdate {
    pub fn completed(
        results: Vec<StepResult>,
        screenshot: String,
        video_url: String,
    ) -> Self {
        Self {
            status: Some(ExecutionStatus::Success),
            results: Some(results),
            screenshot: Some(screenshot),
            video_url: Some(video_url),
            error_log: None,
            end_time: Some(Utc::now()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            results: None,
            screenshot: None,
            video_url: None,
            error_log: Some(error.into()),
            end_time: Some(Utc::now()),
        }
    }

    /// Overwrite `execution` with the set fields.
    pub fn apply(&self, execution: &mut Execution) {
        if let Some(status) = self.status {
            execution.status = status;
        }
        if let Some(results) = &self.results {
            execution.results = results.clone();
        }
        if let Some(screenshot) = &self.screenshot {
            execution.screenshot = Some(screenshot.clone());
        }
        if let Some(video_url) = &self.video_url {
            execution.video_url = Some(video_url.clone());
        }
        if let Some(error_log) = &self.error_log {
            execution.error_log = Some(error_log.clone());
        }
        if let Some(end_time) = self.end_time {
            execution.end_time = Some(end_time);
        }
    }
}
