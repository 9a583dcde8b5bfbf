//! Step executor - runs an action list with per-step failure isolation
//!
//! Actions run strictly in order: action i+1 never begins before action i's
//! side effects, including its screenshot, are recorded. Each action runs
//! inside its own failure boundary; a failing step is recorded and the
//! script continues. Partial progress and diagnostics outrank fail-fast for
//! unattended runs.

use tracing::{error, info, warn};

use crate::bridge::{BrowserDriver, PageTarget};
use crate::engine::interpreter::Interpreter;
use crate::engine::pacing::Pacing;
use crate::engine::result::StepResult;
use crate::script::Action;

pub struct StepExecutor<'a> {
    driver: &'a dyn BrowserDriver,
    context_id: &'a str,
    pacing: Pacing,
}

impl<'a> StepExecutor<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, context_id: &'a str) -> Self {
        Self {
            driver,
            context_id,
            pacing: Pacing::human(),
        }
    }

    pub fn with_pacing(driver: &'a dyn BrowserDriver, context_id: &'a str, pacing: Pacing) -> Self {
        Self {
            driver,
            context_id,
            pacing,
        }
    }

    /// Runs the script on the page, returning the complete result sequence
    /// regardless of individual step failures. Exactly one action-outcome
    /// record is appended per input action.
    ///
    /// Overall execution status is the worker's decision, not made here.
    pub async fn run(&self, page_id: &str, steps: &[Action]) -> Vec<StepResult> {
        let interpreter = Interpreter::new(self.driver, self.context_id, &self.pacing);
        let mut results = Vec::new();
        // The current page/frame is threaded explicitly; switch actions
        // replace it rather than mutating driver-side state.
        let mut target = PageTarget::main(page_id);

        for (index, step) in steps.iter().enumerate() {
            info!(step = index + 1, action = %step.kind, "running step");

            match interpreter.apply(step, &mut target, &mut results).await {
                Ok(()) => {
                    results.push(StepResult::outcome_ok(step));
                }
                Err(e) => {
                    error!(step = index + 1, action = %step.kind, error = %e, "step failed");
                    results.push(StepResult::outcome_err(step, e.to_string()));

                    // Capture the page as it looked at the moment of
                    // failure; a second failure here is swallowed.
                    match self.driver.screenshot(&target.page_id, true).await {
                        Ok(data) => results.push(StepResult::screenshot(data)),
                        Err(screenshot_err) => {
                            warn!(error = %screenshot_err, "failed to take error screenshot");
                        }
                    }
                }
            }
        }

        results
    }
}
