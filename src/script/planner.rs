//! Script planning - turning a prompt into an action script
//!
//! The planner is an external collaborator consumed as an opaque function:
//! give it a prompt, get back a script. It never fails outward — malformed
//! or empty model output is replaced by a minimal safe default script, so a
//! bad upstream answer degrades the run instead of killing it.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::action::{ensure_trailing_screenshot, Action};

const SYSTEM_PROMPT: &str = "You are a browser automation expert. Convert user requests into a \
series of browser automation steps.\n\
Common selectors and patterns:\n\
- Google search box: textarea[name=\"q\"]\n\
- YouTube search box: input#search\n\
- Wikipedia search: input#searchInput\n\
- Common form inputs: input[name=\"email\"], input[name=\"password\"]\n\
- Links: a[href*=\"keyword\"]\n\
For search boxes submitted with the Enter key, emit a final type action \
whose value is \"\\n\" instead of a click.";

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid script JSON: {0}")]
    Script(#[from] serde_json::Error),
}

/// Produces an action script for a natural-language prompt.
#[async_trait]
pub trait ScriptPlanner: Send + Sync {
    async fn plan(&self, prompt: &str) -> Vec<Action>;
}

/// The minimal safe script used whenever planning fails.
pub fn fallback_script() -> Vec<Action> {
    vec![
        Action::navigate("https://www.google.com"),
        Action::screenshot(),
    ]
}

/// Planner backed by a local Ollama chat endpoint with structured output.
pub struct OllamaPlanner {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaPlanner {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn request_plan(&self, prompt: &str) -> Result<Vec<Action>, PlanError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Convert this request into browser automation steps: \"{}\". \
                         Return ONLY a JSON array of steps.",
                        prompt
                    ),
                },
            ],
            "stream": false,
            "format": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "action": { "type": "string" },
                        "selector": { "type": "string" },
                        "value": { "type": "string" },
                        "reasoning": { "type": "string" },
                    },
                    "required": ["action"],
                },
            },
            "options": { "temperature": 0 },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value: Value = response.json().await?;
        let content = value["message"]["content"]
            .as_str()
            .ok_or_else(|| PlanError::Malformed("no message content".to_string()))?;

        debug!(content = %content, "planner response");
        Ok(serde_json::from_str(content)?)
    }
}

#[async_trait]
impl ScriptPlanner for OllamaPlanner {
    async fn plan(&self, prompt: &str) -> Vec<Action> {
        match self.request_plan(prompt).await {
            Ok(steps) if !steps.is_empty() => ensure_trailing_screenshot(steps),
            Ok(_) => {
                warn!("planner returned an empty script, using fallback");
                fallback_script()
            }
            Err(e) => {
                warn!(error = %e, "planning failed, using fallback");
                fallback_script()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ActionKind;

    #[test]
    fn test_fallback_script_shape() {
        let script = fallback_script();
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].kind, ActionKind::Navigate);
        assert_eq!(script[0].value(), Some("https://www.google.com"));
        assert_eq!(script[1].kind, ActionKind::Screenshot);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        // Nothing listens here; planning must degrade, not error.
        let planner = OllamaPlanner::new("http://127.0.0.1:1", "test-model");
        let script = planner.plan("search for rust").await;
        assert_eq!(script, fallback_script());
    }
}
