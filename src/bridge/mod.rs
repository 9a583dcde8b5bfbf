//! Browser driver bridge
//!
//! The engine never talks to a browser directly; it goes through the
//! [`BrowserDriver`] trait. The production implementation is
//! [`PlaywrightDriver`], which drives a Playwright sidecar process over
//! JSON-RPC on stdin/stdout. Tests substitute a scripted driver.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub mod playwright;
pub mod rpc;

pub use playwright::PlaywrightDriver;

/// Common error type for driver operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to start sidecar: {0}")]
    StartupFailed(String),

    #[error("Sidecar disconnected")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Driver error: {0}")]
    ServerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Addresses the page (and optionally a frame within it) an element
/// operation applies to. The executor threads this through the action loop
/// instead of relying on hidden "current frame" state in the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub page_id: String,
    /// Selector of the iframe to operate inside, when set
    pub frame_selector: Option<String>,
}

impl PageTarget {
    pub fn main(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            frame_selector: None,
        }
    }

    pub fn with_frame(&self, selector: impl Into<String>) -> Self {
        Self {
            page_id: self.page_id.clone(),
            frame_selector: Some(selector.into()),
        }
    }

    pub fn main_frame(&self) -> Self {
        Self {
            page_id: self.page_id.clone(),
            frame_selector: None,
        }
    }
}

/// Mouse button for click operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// How an armed one-shot dialog handler responds to the next dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResponse {
    Accept,
    Dismiss,
    /// Capture the message, then dismiss
    Capture,
}

impl DialogResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogResponse::Accept => "accept",
            DialogResponse::Dismiss => "dismiss",
            DialogResponse::Capture => "capture",
        }
    }
}

/// Browsing-context configuration applied to every new context.
///
/// The values model an ordinary desktop Chrome on Windows; they are applied
/// identically every time so pooled and fresh sessions are indistinguishable
/// from the page's point of view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub timezone_id: String,
    pub geolocation: (f64, f64),
    pub extra_http_headers: Vec<(String, String)>,
    /// Directory for continuous session recording; the video path resolves
    /// once the context closes.
    pub record_video_dir: String,
}

impl ContextOptions {
    pub fn desktop_chrome(viewport: (u32, u32), record_video_dir: impl Into<String>) -> Self {
        const UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        Self {
            user_agent: UA.to_string(),
            viewport_width: viewport.0,
            viewport_height: viewport.1,
            locale: "en-US".to_string(),
            timezone_id: "America/New_York".to_string(),
            // New York
            geolocation: (-73.935242, 40.730610),
            extra_http_headers: vec![
                (
                    "Accept".into(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8".into(),
                ),
                ("Accept-Language".into(), "en-US,en;q=0.9".into()),
                (
                    "Sec-Ch-Ua".into(),
                    "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\"".into(),
                ),
                ("Sec-Ch-Ua-Mobile".into(), "?0".into()),
                ("Sec-Ch-Ua-Platform".into(), "\"Windows\"".into()),
                ("Sec-Fetch-Dest".into(), "document".into()),
                ("Sec-Fetch-Mode".into(), "navigate".into()),
                ("Sec-Fetch-Site".into(), "none".into()),
                ("Sec-Fetch-User".into(), "?1".into()),
                ("Upgrade-Insecure-Requests".into(), "1".into()),
            ],
            record_video_dir: record_video_dir.into(),
        }
    }
}

/// The primitive operations the engine needs from a browser.
///
/// One method per driver call; no retry logic, no pacing — both live in the
/// interpreter. Methods that address elements take a [`PageTarget`] so frame
/// scoping is explicit at every call site.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    // Browser lifecycle
    async fn launch(&self, headless: bool, viewport: (u32, u32)) -> Result<String, BridgeError>;
    async fn is_connected(&self, browser_id: &str) -> Result<bool, BridgeError>;
    async fn close_browser(&self, browser_id: &str) -> Result<(), BridgeError>;

    // Context lifecycle
    async fn context_new(
        &self,
        browser_id: &str,
        options: &ContextOptions,
    ) -> Result<String, BridgeError>;
    async fn context_close(&self, context_id: &str) -> Result<(), BridgeError>;

    // Page lifecycle
    async fn page_new(&self, context_id: &str) -> Result<String, BridgeError>;
    async fn page_close(&self, page_id: &str) -> Result<(), BridgeError>;
    async fn set_default_timeout(&self, page_id: &str, ms: u64) -> Result<(), BridgeError>;
    /// Waits briefly for a page opened since the last call (e.g. via
    /// `target=_blank`); `None` when nothing appeared.
    async fn wait_for_page(
        &self,
        context_id: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>, BridgeError>;

    // Navigation
    async fn goto(&self, page_id: &str, url: &str) -> Result<(), BridgeError>;
    async fn go_back(&self, page_id: &str) -> Result<(), BridgeError>;
    async fn go_forward(&self, page_id: &str) -> Result<(), BridgeError>;
    async fn reload(&self, page_id: &str) -> Result<(), BridgeError>;
    async fn wait_for_load_state(
        &self,
        page_id: &str,
        state: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError>;
    async fn wait_for_navigation(&self, page_id: &str, timeout_ms: u64)
        -> Result<(), BridgeError>;
    async fn wait_for_url(
        &self,
        page_id: &str,
        pattern: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError>;

    // Element interaction
    async fn wait_for_selector(
        &self,
        target: &PageTarget,
        selector: &str,
        timeout_ms: Option<u64>,
    ) -> Result<(), BridgeError>;
    async fn click(
        &self,
        target: &PageTarget,
        selector: &str,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), BridgeError>;
    async fn double_click(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError>;
    async fn hover(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError>;
    async fn drag_and_drop(
        &self,
        target: &PageTarget,
        source: &str,
        destination: &str,
    ) -> Result<(), BridgeError>;
    async fn focus(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError>;
    async fn fill(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError>;
    /// Types `text` into the element, one keystroke per `delay_ms`.
    async fn type_text(
        &self,
        target: &PageTarget,
        selector: &str,
        text: &str,
        delay_ms: u64,
    ) -> Result<(), BridgeError>;
    /// Presses a key against the currently focused element.
    async fn press_key(&self, target: &PageTarget, key: &str) -> Result<(), BridgeError>;
    /// Types at the current focus, one keystroke per `delay_ms`.
    async fn keyboard_type(
        &self,
        target: &PageTarget,
        text: &str,
        delay_ms: u64,
    ) -> Result<(), BridgeError>;
    async fn set_checked(
        &self,
        target: &PageTarget,
        selector: &str,
        checked: bool,
    ) -> Result<(), BridgeError>;
    async fn select_option(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError>;
    async fn set_input_files(
        &self,
        target: &PageTarget,
        selector: &str,
        path: &str,
    ) -> Result<(), BridgeError>;
    /// Clicks `selector` and waits for the download it triggers; returns the
    /// suggested filename.
    async fn download(&self, target: &PageTarget, selector: &str) -> Result<String, BridgeError>;

    // Page state queries
    async fn url(&self, page_id: &str) -> Result<String, BridgeError>;
    async fn title(&self, page_id: &str) -> Result<String, BridgeError>;
    async fn text_content(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<Option<String>, BridgeError>;
    async fn get_attribute(
        &self,
        target: &PageTarget,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BridgeError>;
    async fn element_count(&self, target: &PageTarget, selector: &str)
        -> Result<u64, BridgeError>;
    async fn is_visible(&self, target: &PageTarget, selector: &str) -> Result<bool, BridgeError>;
    async fn element_exists(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<bool, BridgeError>;

    // Scrolling
    async fn scroll_into_view(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<(), BridgeError>;
    async fn scroll_by(&self, page_id: &str, dx: i64, dy: i64) -> Result<(), BridgeError>;
    /// Scrolls to the top (`top == true`) or bottom of the page.
    async fn scroll_to_edge(&self, page_id: &str, top: bool) -> Result<(), BridgeError>;

    // Script evaluation
    async fn evaluate(&self, page_id: &str, script: &str) -> Result<Value, BridgeError>;

    // Screenshots & video
    /// Full-page or viewport screenshot, returned base64-encoded.
    async fn screenshot(&self, page_id: &str, full_page: bool) -> Result<String, BridgeError>;
    async fn screenshot_to_file(
        &self,
        page_id: &str,
        path: &str,
        full_page: bool,
    ) -> Result<(), BridgeError>;
    async fn screenshot_element(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<String, BridgeError>;
    /// Path of the session recording; only resolvable after the owning
    /// context has closed.
    async fn video_path(&self, page_id: &str) -> Result<Option<String>, BridgeError>;

    // Cookies
    async fn cookies(&self, context_id: &str) -> Result<Value, BridgeError>;
    async fn add_cookies(&self, context_id: &str, cookies: Value) -> Result<(), BridgeError>;
    async fn clear_cookies(&self, context_id: &str) -> Result<(), BridgeError>;

    // Dialogs
    /// Arms a one-shot handler for the *next* dialog on the page. Must be
    /// armed before the action that triggers the dialog.
    async fn dialog_arm(&self, page_id: &str, response: DialogResponse)
        -> Result<(), BridgeError>;
    /// Message of the most recently captured dialog, if any fired.
    async fn dialog_message(&self, page_id: &str) -> Result<Option<String>, BridgeError>;
}
