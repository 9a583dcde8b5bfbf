//! Action interpreter - maps one action to browser driver calls
//!
//! The interpreter is a pure mapping: it carries no retry logic and decides
//! only which driver primitives to issue and what, if anything, to record.
//! Human pacing comes from [`Pacing`]; failure isolation belongs to the
//! executor.

use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bridge::{BrowserDriver, DialogResponse, MouseButton, PageTarget};
use crate::engine::error::EngineError;
use crate::engine::pacing::Pacing;
use crate::engine::result::StepResult;
use crate::script::{Action, ActionKind};

/// Typing a value of exactly this means "press Enter and await navigation".
pub const ENTER_SENTINEL: &str = "\n";

/// Default per-action and per-navigation timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Shorter settle window after clicks; many clicks never navigate.
const CLICK_SETTLE_MS: u64 = 10_000;

/// Best-effort settle before captures.
const CAPTURE_SETTLE_MS: u64 = 5_000;

/// How long to wait for a tab opened by a previous action.
const NEW_TAB_WAIT_MS: u64 = 5_000;

/// Interprets single actions against a browser driver.
pub struct Interpreter<'a> {
    driver: &'a dyn BrowserDriver,
    context_id: &'a str,
    pacing: &'a Pacing,
}

impl<'a> Interpreter<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, context_id: &'a str, pacing: &'a Pacing) -> Self {
        Self {
            driver,
            context_id,
            pacing,
        }
    }

    /// Executes one action. Driver calls go to `target`; recorded output is
    /// appended to `results`. The action-outcome record itself is appended
    /// by the executor, not here.
    ///
    /// `target` is replaced in place by the frame/window switching actions.
    pub async fn apply(
        &self,
        action: &Action,
        target: &mut PageTarget,
        results: &mut Vec<StepResult>,
    ) -> Result<(), EngineError> {
        debug!(action = %action.kind, selector = action.selector(), "executing action");

        if action.kind.changes_state() {
            sleep(self.pacing.pre_action_delay()).await;
        }

        match action.kind {
            ActionKind::Navigate => {
                let url = require_value(action)?;
                self.driver.goto(&target.page_id, url).await?;
                self.settle(&target.page_id, DEFAULT_TIMEOUT_MS).await;
            }
            ActionKind::Click => {
                let selector = require_selector(action)?;
                self.driver.wait_for_selector(target, selector, None).await?;
                // Human pointing: move to the element, hesitate, then click.
                self.driver.hover(target, selector).await?;
                sleep(self.pacing.pre_action_delay()).await;
                self.driver
                    .click(target, selector, MouseButton::Left, 1)
                    .await?;
                self.settle(&target.page_id, CLICK_SETTLE_MS).await;
            }
            ActionKind::DoubleClick => {
                let selector = require_selector(action)?;
                self.driver.wait_for_selector(target, selector, None).await?;
                self.driver.double_click(target, selector).await?;
            }
            ActionKind::RightClick => {
                let selector = require_selector(action)?;
                self.driver.wait_for_selector(target, selector, None).await?;
                self.driver
                    .click(target, selector, MouseButton::Right, 1)
                    .await?;
            }
            ActionKind::Hover => {
                let selector = require_selector(action)?;
                self.driver.wait_for_selector(target, selector, None).await?;
                self.driver.hover(target, selector).await?;
            }
            ActionKind::DragAndDrop => {
                let source = require_selector(action)?;
                let destination = require_value(action)?;
                self.driver.drag_and_drop(target, source, destination).await?;
            }

            ActionKind::Type => {
                let text = require_value(action)?;
                if text == ENTER_SENTINEL {
                    self.press_enter_and_await_navigation(target).await?;
                } else {
                    let selector = require_selector(action)?;
                    self.human_type(target, selector, text).await?;
                }
            }
            ActionKind::TypeText => {
                let text = require_value(action)?;
                for ch in text.chars() {
                    let delay = self.pacing.keystroke_delay().as_millis() as u64;
                    self.driver
                        .keyboard_type(target, &ch.to_string(), delay)
                        .await?;
                    sleep(self.pacing.inter_key_pause()).await;
                }
            }
            ActionKind::ClearInput => {
                let selector = require_selector(action)?;
                self.driver.fill(target, selector, "").await?;
            }
            ActionKind::Focus => {
                let selector = require_selector(action)?;
                self.driver.focus(target, selector).await?;
            }
            ActionKind::PressKey => {
                let key = require_value(action)?;
                self.driver.press_key(target, key).await?;
            }
            ActionKind::CheckCheckbox => {
                let selector = require_selector(action)?;
                self.driver.set_checked(target, selector, true).await?;
            }
            ActionKind::UncheckCheckbox => {
                let selector = require_selector(action)?;
                self.driver.set_checked(target, selector, false).await?;
            }
            ActionKind::SelectDropdown => {
                let selector = require_selector(action)?;
                let value = require_value(action)?;
                self.driver.select_option(target, selector, value).await?;
            }
            ActionKind::SelectText => {
                // Triple-click selects the element's text.
                let selector = require_selector(action)?;
                self.driver
                    .click(target, selector, MouseButton::Left, 3)
                    .await?;
            }

            ActionKind::UploadFile => {
                let selector = require_selector(action)?;
                let path = require_value(action)?;
                self.driver.set_input_files(target, selector, path).await?;
            }
            ActionKind::DownloadFile => {
                let selector = require_selector(action)?;
                let filename = self.driver.download(target, selector).await?;
                debug!(filename = %filename, "download completed");
            }

            ActionKind::GoBack => {
                self.driver.go_back(&target.page_id).await?;
                self.settle(&target.page_id, DEFAULT_TIMEOUT_MS).await;
            }
            ActionKind::GoForward => {
                self.driver.go_forward(&target.page_id).await?;
                self.settle(&target.page_id, DEFAULT_TIMEOUT_MS).await;
            }
            ActionKind::Reload => {
                self.driver.reload(&target.page_id).await?;
                self.settle(&target.page_id, DEFAULT_TIMEOUT_MS).await;
            }
            ActionKind::CloseTab => {
                self.driver.page_close(&target.page_id).await?;
            }

            ActionKind::SwitchToIframe => {
                let selector = require_selector(action)?;
                self.driver.wait_for_selector(target, selector, None).await?;
                *target = target.with_frame(selector);
            }
            ActionKind::SwitchToMainFrame => {
                *target = target.main_frame();
            }
            ActionKind::SwitchToNewTab => {
                let page_id = match self
                    .driver
                    .wait_for_page(self.context_id, NEW_TAB_WAIT_MS)
                    .await?
                {
                    Some(page_id) => page_id,
                    // Nothing opened a tab; give the script a fresh one.
                    None => self.driver.page_new(self.context_id).await?,
                };
                self.driver
                    .set_default_timeout(&page_id, DEFAULT_TIMEOUT_MS)
                    .await?;
                *target = PageTarget::main(page_id);
            }

            ActionKind::ExtractText => {
                let selector = require_selector(action)?;
                let text = self.driver.text_content(target, selector).await?;
                results.push(StepResult::extracted(action.kind, json!(text)));
            }
            ActionKind::GetAttribute => {
                let selector = require_selector(action)?;
                let name = require_value(action)?;
                let value = self.driver.get_attribute(target, selector, name).await?;
                results.push(StepResult::extracted(action.kind, json!(value)));
            }
            ActionKind::GetTitle => {
                let title = self.driver.title(&target.page_id).await?;
                results.push(StepResult::extracted(action.kind, json!(title)));
            }
            ActionKind::GetUrl => {
                let url = self.driver.url(&target.page_id).await?;
                results.push(StepResult::extracted(action.kind, json!(url)));
            }
            ActionKind::ElementExists => {
                let selector = require_selector(action)?;
                let exists = self.driver.element_exists(target, selector).await?;
                results.push(StepResult::extracted(action.kind, json!(exists)));
            }
            ActionKind::IsVisible => {
                let selector = require_selector(action)?;
                let visible = self.driver.is_visible(target, selector).await?;
                results.push(StepResult::extracted(action.kind, json!(visible)));
            }
            ActionKind::GetElementCount => {
                let selector = require_selector(action)?;
                let count = self.driver.element_count(target, selector).await?;
                results.push(StepResult::extracted(action.kind, json!(count)));
            }
            ActionKind::GetCookies => {
                let cookies = self.driver.cookies(self.context_id).await?;
                results.push(StepResult::extracted(action.kind, cookies));
            }

            ActionKind::GetAlertText => {
                // Arm capture for the next dialog, then report whatever has
                // been captured so far. Arming must precede the trigger.
                self.driver
                    .dialog_arm(&target.page_id, DialogResponse::Capture)
                    .await?;
                let message = self.driver.dialog_message(&target.page_id).await?;
                results.push(StepResult::extracted(
                    action.kind,
                    json!(message.unwrap_or_default()),
                ));
            }
            ActionKind::AcceptAlert => {
                self.driver
                    .dialog_arm(&target.page_id, DialogResponse::Accept)
                    .await?;
            }
            ActionKind::DismissAlert => {
                self.driver
                    .dialog_arm(&target.page_id, DialogResponse::Dismiss)
                    .await?;
            }

            ActionKind::WaitForElement => {
                let selector = require_selector(action)?;
                self.driver
                    .wait_for_selector(target, selector, Some(DEFAULT_TIMEOUT_MS))
                    .await?;
            }
            ActionKind::WaitForNavigation => {
                self.driver
                    .wait_for_navigation(&target.page_id, DEFAULT_TIMEOUT_MS)
                    .await?;
            }
            ActionKind::WaitForTimeout => {
                let ms = require_value(action)?
                    .parse::<u64>()
                    .map_err(|_| EngineError::InvalidParameter {
                        action: action.kind,
                        reason: "value must be a duration in milliseconds".into(),
                    })?;
                sleep(std::time::Duration::from_millis(ms)).await;
            }
            ActionKind::WaitForUrl => {
                let pattern = require_value(action)?;
                self.driver
                    .wait_for_url(&target.page_id, pattern, DEFAULT_TIMEOUT_MS)
                    .await?;
            }

            ActionKind::ScrollTo => {
                let selector = require_selector(action)?;
                self.driver.scroll_into_view(target, selector).await?;
            }
            ActionKind::ScrollToTop => {
                self.driver.scroll_to_edge(&target.page_id, true).await?;
            }
            ActionKind::ScrollToBottom => {
                self.driver.scroll_to_edge(&target.page_id, false).await?;
            }
            ActionKind::ScrollBy => {
                let dy = require_value(action)?
                    .parse::<i64>()
                    .map_err(|_| EngineError::InvalidParameter {
                        action: action.kind,
                        reason: "value must be a pixel delta".into(),
                    })?;
                self.driver.scroll_by(&target.page_id, 0, dy).await?;
            }

            ActionKind::Screenshot => {
                self.capture(&target.page_id, results).await?;
            }
            ActionKind::ScreenshotElement => {
                let selector = require_selector(action)?;
                let data = self.driver.screenshot_element(target, selector).await?;
                results.push(StepResult::screenshot(data));
            }

            ActionKind::SetCookie => {
                let raw = require_value(action)?;
                let cookie: serde_json::Value =
                    serde_json::from_str(raw).map_err(|e| EngineError::InvalidParameter {
                        action: action.kind,
                        reason: format!("value is not a serialized cookie: {}", e),
                    })?;
                self.driver
                    .add_cookies(self.context_id, json!([cookie]))
                    .await?;
            }
            ActionKind::ClearCookies => {
                self.driver.clear_cookies(self.context_id).await?;
            }

            ActionKind::ExecuteJavascript => {
                let script = require_value(action)?;
                let value = self.driver.evaluate(&target.page_id, script).await?;
                debug!(result = %value, "script evaluated");
            }

            ActionKind::Unknown => {
                warn!(selector = action.selector(), "unknown action kind, skipping");
                return Ok(());
            }
        }

        if action.kind.changes_visible_state() {
            self.capture(&target.page_id, results).await?;
        }

        Ok(())
    }

    /// Character-by-character typing with randomized per-keystroke delay and
    /// an extra pause between characters.
    async fn human_type(
        &self,
        target: &PageTarget,
        selector: &str,
        text: &str,
    ) -> Result<(), EngineError> {
        self.driver.wait_for_selector(target, selector, None).await?;
        self.driver.focus(target, selector).await?;

        for ch in text.chars() {
            let delay = self.pacing.keystroke_delay().as_millis() as u64;
            self.driver
                .type_text(target, selector, &ch.to_string(), delay)
                .await?;
            sleep(self.pacing.inter_key_pause()).await;
        }
        Ok(())
    }

    /// Press Enter while already awaiting the navigation it may trigger, so
    /// a fast response is not missed. Navigation is best-effort; the
    /// keypress itself must succeed.
    async fn press_enter_and_await_navigation(
        &self,
        target: &PageTarget,
    ) -> Result<(), EngineError> {
        let (nav, press) = tokio::join!(
            self.driver
                .wait_for_navigation(&target.page_id, DEFAULT_TIMEOUT_MS),
            self.driver.press_key(target, "Enter"),
        );
        if let Err(e) = nav {
            debug!(error = %e, "no navigation after Enter");
        }
        press?;
        sleep(self.pacing.pre_action_delay()).await;
        Ok(())
    }

    /// Full-page capture appended to the result log. Waits for the network
    /// to settle first, best effort.
    async fn capture(
        &self,
        page_id: &str,
        results: &mut Vec<StepResult>,
    ) -> Result<(), EngineError> {
        if let Err(e) = self
            .driver
            .wait_for_load_state(page_id, "networkidle", CAPTURE_SETTLE_MS)
            .await
        {
            debug!(error = %e, "page did not settle before capture");
        }
        let data = self.driver.screenshot(page_id, true).await?;
        results.push(StepResult::screenshot(data));
        Ok(())
    }

    /// Best-effort wait for the network to go idle after a state change.
    async fn settle(&self, page_id: &str, timeout_ms: u64) {
        if let Err(e) = self
            .driver
            .wait_for_load_state(page_id, "networkidle", timeout_ms)
            .await
        {
            debug!(error = %e, "page did not reach network idle");
        }
    }
}

fn require_selector(action: &Action) -> Result<&str, EngineError> {
    action.selector().ok_or(EngineError::MissingParameter {
        action: action.kind,
        param: "selector",
    })
}

fn require_value(action: &Action) -> Result<&str, EngineError> {
    action.value().ok_or(EngineError::MissingParameter {
        action: action.kind,
        param: "value",
    })
}
