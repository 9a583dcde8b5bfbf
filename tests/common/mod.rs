#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Mutex;

use webpilot::{
    Action, BridgeError, BrowserDriver, ContextOptions, DialogResponse, MouseButton, PageTarget,
};

/// Scripted in-memory browser driver. Records every primitive call and can
/// be told to fail launches or to never find certain selectors.
pub struct FakeDriver {
    calls: Mutex<Vec<String>>,
    missing_selectors: Mutex<HashSet<String>>,
    launch_failures: Mutex<u32>,
    dialog_message: Mutex<Option<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            missing_selectors: Mutex::new(HashSet::new()),
            launch_failures: Mutex::new(0),
            dialog_message: Mutex::new(None),
        }
    }

    /// Selectors that will time out in `wait_for_selector`.
    pub fn with_missing_selector(self, selector: &str) -> Self {
        self.missing_selectors
            .lock()
            .unwrap()
            .insert(selector.to_string());
        self
    }

    /// Makes the next `n` launches fail.
    pub fn fail_launches(self, n: u32) -> Self {
        *self.launch_failures.lock().unwrap() = n;
        self
    }

    pub fn set_dialog_message(&self, message: &str) {
        *self.dialog_message.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Index of the first call starting with `prefix`, if any.
    pub fn first_call(&self, prefix: &str) -> Option<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .position(|call| call.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_selector(&self, selector: &str) -> Result<(), BridgeError> {
        if self.missing_selectors.lock().unwrap().contains(selector) {
            return Err(BridgeError::ServerError(format!(
                "Timeout 30000ms exceeded waiting for selector \"{}\"",
                selector
            )));
        }
        Ok(())
    }
}

fn scoped(target: &PageTarget, selector: &str) -> String {
    match &target.frame_selector {
        Some(frame) => format!("frame={} {}", frame, selector),
        None => selector.to_string(),
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(&self, _headless: bool, _viewport: (u32, u32)) -> Result<String, BridgeError> {
        self.record("launch".into());
        let mut failures = self.launch_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(BridgeError::ServerError("browser launch failed".into()));
        }
        Ok(format!("b{}", self.calls.lock().unwrap().len()))
    }

    async fn is_connected(&self, _browser_id: &str) -> Result<bool, BridgeError> {
        Ok(true)
    }

    async fn close_browser(&self, browser_id: &str) -> Result<(), BridgeError> {
        self.record(format!("close_browser {}", browser_id));
        Ok(())
    }

    async fn context_new(
        &self,
        _browser_id: &str,
        _options: &ContextOptions,
    ) -> Result<String, BridgeError> {
        self.record("context_new".into());
        Ok("ctx1".into())
    }

    async fn context_close(&self, _context_id: &str) -> Result<(), BridgeError> {
        self.record("context_close".into());
        Ok(())
    }

    async fn page_new(&self, _context_id: &str) -> Result<String, BridgeError> {
        self.record("page_new".into());
        Ok("page1".into())
    }

    async fn page_close(&self, page_id: &str) -> Result<(), BridgeError> {
        self.record(format!("page_close {}", page_id));
        Ok(())
    }

    async fn set_default_timeout(&self, _page_id: &str, _ms: u64) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn wait_for_page(
        &self,
        _context_id: &str,
        _timeout_ms: u64,
    ) -> Result<Option<String>, BridgeError> {
        self.record("wait_for_page".into());
        Ok(Some("page2".into()))
    }

    async fn goto(&self, _page_id: &str, url: &str) -> Result<(), BridgeError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn go_back(&self, _page_id: &str) -> Result<(), BridgeError> {
        self.record("go_back".into());
        Ok(())
    }

    async fn go_forward(&self, _page_id: &str) -> Result<(), BridgeError> {
        self.record("go_forward".into());
        Ok(())
    }

    async fn reload(&self, _page_id: &str) -> Result<(), BridgeError> {
        self.record("reload".into());
        Ok(())
    }

    async fn wait_for_load_state(
        &self,
        _page_id: &str,
        _state: &str,
        _timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn wait_for_navigation(
        &self,
        _page_id: &str,
        _timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.record("wait_for_navigation".into());
        Ok(())
    }

    async fn wait_for_url(
        &self,
        _page_id: &str,
        pattern: &str,
        _timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.record(format!("wait_for_url {}", pattern));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        target: &PageTarget,
        selector: &str,
        _timeout_ms: Option<u64>,
    ) -> Result<(), BridgeError> {
        self.record(format!("wait_for_selector {}", scoped(target, selector)));
        self.check_selector(selector)
    }

    async fn click(
        &self,
        target: &PageTarget,
        selector: &str,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), BridgeError> {
        self.record(format!(
            "click {} button={} count={}",
            scoped(target, selector),
            button.as_str(),
            click_count
        ));
        self.check_selector(selector)
    }

    async fn double_click(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.record(format!("double_click {}", scoped(target, selector)));
        Ok(())
    }

    async fn hover(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.record(format!("hover {}", scoped(target, selector)));
        Ok(())
    }

    async fn drag_and_drop(
        &self,
        target: &PageTarget,
        source: &str,
        destination: &str,
    ) -> Result<(), BridgeError> {
        self.record(format!(
            "drag_and_drop {} -> {}",
            scoped(target, source),
            destination
        ));
        Ok(())
    }

    async fn focus(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.record(format!("focus {}", scoped(target, selector)));
        Ok(())
    }

    async fn fill(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        self.record(format!("fill {} {}", scoped(target, selector), value));
        Ok(())
    }

    async fn type_text(
        &self,
        target: &PageTarget,
        selector: &str,
        text: &str,
        _delay_ms: u64,
    ) -> Result<(), BridgeError> {
        self.record(format!("type_text {} {}", scoped(target, selector), text));
        Ok(())
    }

    async fn press_key(&self, _target: &PageTarget, key: &str) -> Result<(), BridgeError> {
        self.record(format!("press_key {}", key));
        Ok(())
    }

    async fn keyboard_type(
        &self,
        _target: &PageTarget,
        text: &str,
        _delay_ms: u64,
    ) -> Result<(), BridgeError> {
        self.record(format!("keyboard_type {}", text));
        Ok(())
    }

    async fn set_checked(
        &self,
        target: &PageTarget,
        selector: &str,
        checked: bool,
    ) -> Result<(), BridgeError> {
        self.record(format!(
            "set_checked {} {}",
            scoped(target, selector),
            checked
        ));
        Ok(())
    }

    async fn select_option(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        self.record(format!(
            "select_option {} {}",
            scoped(target, selector),
            value
        ));
        Ok(())
    }

    async fn set_input_files(
        &self,
        target: &PageTarget,
        selector: &str,
        path: &str,
    ) -> Result<(), BridgeError> {
        self.record(format!(
            "set_input_files {} {}",
            scoped(target, selector),
            path
        ));
        Ok(())
    }

    async fn download(&self, target: &PageTarget, selector: &str) -> Result<String, BridgeError> {
        self.record(format!("download {}", scoped(target, selector)));
        Ok("download.txt".into())
    }

    async fn url(&self, _page_id: &str) -> Result<String, BridgeError> {
        self.record("url".into());
        Ok("https://example.com/".into())
    }

    async fn title(&self, _page_id: &str) -> Result<String, BridgeError> {
        self.record("title".into());
        Ok("Example Domain".into())
    }

    async fn text_content(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<Option<String>, BridgeError> {
        self.record(format!("text_content {}", scoped(target, selector)));
        Ok(Some("extracted text".into()))
    }

    async fn get_attribute(
        &self,
        target: &PageTarget,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BridgeError> {
        self.record(format!(
            "get_attribute {} {}",
            scoped(target, selector),
            name
        ));
        Ok(Some("attr-value".into()))
    }

    async fn element_count(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<u64, BridgeError> {
        self.record(format!("element_count {}", scoped(target, selector)));
        Ok(3)
    }

    async fn is_visible(&self, target: &PageTarget, selector: &str) -> Result<bool, BridgeError> {
        self.record(format!("is_visible {}", scoped(target, selector)));
        Ok(true)
    }

    async fn element_exists(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<bool, BridgeError> {
        self.record(format!("element_exists {}", scoped(target, selector)));
        Ok(!self.missing_selectors.lock().unwrap().contains(selector))
    }

    async fn scroll_into_view(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<(), BridgeError> {
        self.record(format!("scroll_into_view {}", scoped(target, selector)));
        Ok(())
    }

    async fn scroll_by(&self, _page_id: &str, dx: i64, dy: i64) -> Result<(), BridgeError> {
        self.record(format!("scroll_by {} {}", dx, dy));
        Ok(())
    }

    async fn scroll_to_edge(&self, _page_id: &str, top: bool) -> Result<(), BridgeError> {
        self.record(format!("scroll_to_edge top={}", top));
        Ok(())
    }

    async fn evaluate(&self, _page_id: &str, script: &str) -> Result<Value, BridgeError> {
        self.record(format!("evaluate {}", script));
        Ok(Value::Null)
    }

    async fn screenshot(&self, _page_id: &str, _full_page: bool) -> Result<String, BridgeError> {
        self.record("screenshot".into());
        Ok("aGVsbG8=".into())
    }

    async fn screenshot_to_file(
        &self,
        _page_id: &str,
        path: &str,
        _full_page: bool,
    ) -> Result<(), BridgeError> {
        self.record(format!("screenshot_to_file {}", path));
        Ok(())
    }

    async fn screenshot_element(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<String, BridgeError> {
        self.record(format!("screenshot_element {}", scoped(target, selector)));
        Ok("aGVsbG8=".into())
    }

    async fn video_path(&self, _page_id: &str) -> Result<Option<String>, BridgeError> {
        self.record("video_path".into());
        Ok(Some("/tmp/uploads/recording.webm".into()))
    }

    async fn cookies(&self, _context_id: &str) -> Result<Value, BridgeError> {
        self.record("cookies".into());
        Ok(json!([{ "name": "session", "value": "abc" }]))
    }

    async fn add_cookies(&self, _context_id: &str, cookies: Value) -> Result<(), BridgeError> {
        self.record(format!("add_cookies {}", cookies));
        Ok(())
    }

    async fn clear_cookies(&self, _context_id: &str) -> Result<(), BridgeError> {
        self.record("clear_cookies".into());
        Ok(())
    }

    async fn dialog_arm(
        &self,
        _page_id: &str,
        response: DialogResponse,
    ) -> Result<(), BridgeError> {
        self.record(format!("dialog_arm {}", response.as_str()));
        Ok(())
    }

    async fn dialog_message(&self, _page_id: &str) -> Result<Option<String>, BridgeError> {
        self.record("dialog_message".into());
        Ok(self.dialog_message.lock().unwrap().clone())
    }
}

/// A three-step search script: navigate, type a query, submit with Enter.
pub fn search_script() -> Vec<Action> {
    vec![
        Action::navigate("https://www.google.com"),
        Action::type_into("textarea[name=q]", "hello"),
        Action::type_into("textarea[name=q]", "\n"),
    ]
}
