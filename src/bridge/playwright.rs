//! Playwright driver - browser primitives via a JSON-RPC sidecar

use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use super::rpc::{send_request, spawn_communication_task, RequestSender};
use super::{BridgeError, BrowserDriver, ContextOptions, DialogResponse, MouseButton, PageTarget};

const SIDECAR_SCRIPT: &str = "extensions/playwright/server.js";

pub struct PlaywrightDriver {
    request_tx: RequestSender,
    #[allow(dead_code)]
    child: Child,
}

impl PlaywrightDriver {
    /// Spawns the Playwright sidecar and connects to it over stdio.
    pub async fn start() -> Result<Self, BridgeError> {
        let node = which::which("node")
            .map_err(|e| BridgeError::StartupFailed(format!("node not found: {}", e)))?;

        let mut child = Command::new(node)
            .arg(SIDECAR_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BridgeError::StartupFailed(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("sidecar stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("sidecar stdout unavailable".into()))?;

        let (request_tx, request_rx) = mpsc::channel(100);
        spawn_communication_task(request_rx, stdin, stdout);

        Ok(Self { request_tx, child })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        send_request(&self.request_tx, method, params).await
    }

    /// Element-call params: page, optional frame scope, selector.
    fn element_params(target: &PageTarget, selector: &str) -> Value {
        json!({
            "pageId": target.page_id,
            "frame": target.frame_selector,
            "selector": selector,
        })
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn launch(&self, headless: bool, viewport: (u32, u32)) -> Result<String, BridgeError> {
        let result = self
            .request(
                "browser.launch",
                json!({
                    "headless": headless,
                    "args": [
                        "--disable-blink-features=AutomationControlled",
                        "--disable-features=IsolateOrigins,site-per-process",
                        format!("--window-size={},{}", viewport.0, viewport.1),
                    ],
                }),
            )
            .await?;
        result["browserId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no browser ID returned".to_string()))
    }

    async fn is_connected(&self, browser_id: &str) -> Result<bool, BridgeError> {
        let result = self
            .request("browser.isConnected", json!({ "browserId": browser_id }))
            .await?;
        Ok(result["connected"].as_bool().unwrap_or(false))
    }

    async fn close_browser(&self, browser_id: &str) -> Result<(), BridgeError> {
        self.request("browser.close", json!({ "browserId": browser_id }))
            .await?;
        Ok(())
    }

    async fn context_new(
        &self,
        browser_id: &str,
        options: &ContextOptions,
    ) -> Result<String, BridgeError> {
        let result = self
            .request(
                "context.new",
                json!({ "browserId": browser_id, "options": options }),
            )
            .await?;
        result["contextId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no context ID returned".to_string()))
    }

    async fn context_close(&self, context_id: &str) -> Result<(), BridgeError> {
        self.request("context.close", json!({ "contextId": context_id }))
            .await?;
        Ok(())
    }

    async fn page_new(&self, context_id: &str) -> Result<String, BridgeError> {
        let result = self
            .request("page.new", json!({ "contextId": context_id }))
            .await?;
        result["pageId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no page ID returned".to_string()))
    }

    async fn page_close(&self, page_id: &str) -> Result<(), BridgeError> {
        self.request("page.close", json!({ "pageId": page_id }))
            .await?;
        Ok(())
    }

    async fn set_default_timeout(&self, page_id: &str, ms: u64) -> Result<(), BridgeError> {
        self.request(
            "page.setDefaultTimeout",
            json!({ "pageId": page_id, "timeout": ms }),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_page(
        &self,
        context_id: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>, BridgeError> {
        let result = self
            .request(
                "context.waitForPage",
                json!({ "contextId": context_id, "timeout": timeout_ms }),
            )
            .await?;
        Ok(result["pageId"].as_str().map(|s| s.to_string()))
    }

    async fn goto(&self, page_id: &str, url: &str) -> Result<(), BridgeError> {
        self.request("page.goto", json!({ "pageId": page_id, "url": url }))
            .await?;
        Ok(())
    }

    async fn go_back(&self, page_id: &str) -> Result<(), BridgeError> {
        self.request("page.goBack", json!({ "pageId": page_id }))
            .await?;
        Ok(())
    }

    async fn go_forward(&self, page_id: &str) -> Result<(), BridgeError> {
        self.request("page.goForward", json!({ "pageId": page_id }))
            .await?;
        Ok(())
    }

    async fn reload(&self, page_id: &str) -> Result<(), BridgeError> {
        self.request("page.reload", json!({ "pageId": page_id }))
            .await?;
        Ok(())
    }

    async fn wait_for_load_state(
        &self,
        page_id: &str,
        state: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.request(
            "wait.loadState",
            json!({ "pageId": page_id, "state": state, "timeout": timeout_ms }),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_navigation(
        &self,
        page_id: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.request(
            "wait.navigation",
            json!({ "pageId": page_id, "timeout": timeout_ms }),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_url(
        &self,
        page_id: &str,
        pattern: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.request(
            "wait.url",
            json!({ "pageId": page_id, "pattern": pattern, "timeout": timeout_ms }),
        )
        .await?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        target: &PageTarget,
        selector: &str,
        timeout_ms: Option<u64>,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["timeout"] = json!(timeout_ms);
        self.request("wait.selector", params).await?;
        Ok(())
    }

    async fn click(
        &self,
        target: &PageTarget,
        selector: &str,
        button: MouseButton,
        click_count: u32,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["button"] = json!(button.as_str());
        params["clickCount"] = json!(click_count);
        self.request("element.click", params).await?;
        Ok(())
    }

    async fn double_click(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.request("element.dblclick", Self::element_params(target, selector))
            .await?;
        Ok(())
    }

    async fn hover(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.request("element.hover", Self::element_params(target, selector))
            .await?;
        Ok(())
    }

    async fn drag_and_drop(
        &self,
        target: &PageTarget,
        source: &str,
        destination: &str,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, source);
        params["destination"] = json!(destination);
        self.request("element.dragAndDrop", params).await?;
        Ok(())
    }

    async fn focus(&self, target: &PageTarget, selector: &str) -> Result<(), BridgeError> {
        self.request("element.focus", Self::element_params(target, selector))
            .await?;
        Ok(())
    }

    async fn fill(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["value"] = json!(value);
        self.request("element.fill", params).await?;
        Ok(())
    }

    async fn type_text(
        &self,
        target: &PageTarget,
        selector: &str,
        text: &str,
        delay_ms: u64,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["text"] = json!(text);
        params["delay"] = json!(delay_ms);
        self.request("element.type", params).await?;
        Ok(())
    }

    async fn press_key(&self, target: &PageTarget, key: &str) -> Result<(), BridgeError> {
        self.request(
            "keyboard.press",
            json!({ "pageId": target.page_id, "frame": target.frame_selector, "key": key }),
        )
        .await?;
        Ok(())
    }

    async fn keyboard_type(
        &self,
        target: &PageTarget,
        text: &str,
        delay_ms: u64,
    ) -> Result<(), BridgeError> {
        self.request(
            "keyboard.type",
            json!({
                "pageId": target.page_id,
                "frame": target.frame_selector,
                "text": text,
                "delay": delay_ms,
            }),
        )
        .await?;
        Ok(())
    }

    async fn set_checked(
        &self,
        target: &PageTarget,
        selector: &str,
        checked: bool,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["checked"] = json!(checked);
        self.request("element.setChecked", params).await?;
        Ok(())
    }

    async fn select_option(
        &self,
        target: &PageTarget,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["value"] = json!(value);
        self.request("element.selectOption", params).await?;
        Ok(())
    }

    async fn set_input_files(
        &self,
        target: &PageTarget,
        selector: &str,
        path: &str,
    ) -> Result<(), BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["path"] = json!(path);
        self.request("element.setInputFiles", params).await?;
        Ok(())
    }

    async fn download(&self, target: &PageTarget, selector: &str) -> Result<String, BridgeError> {
        let result = self
            .request("element.download", Self::element_params(target, selector))
            .await?;
        result["filename"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no download filename returned".to_string()))
    }

    async fn url(&self, page_id: &str) -> Result<String, BridgeError> {
        let result = self.request("page.url", json!({ "pageId": page_id })).await?;
        result["url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no URL returned".to_string()))
    }

    async fn title(&self, page_id: &str) -> Result<String, BridgeError> {
        let result = self
            .request("page.title", json!({ "pageId": page_id }))
            .await?;
        result["title"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no title returned".to_string()))
    }

    async fn text_content(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<Option<String>, BridgeError> {
        let result = self
            .request("element.textContent", Self::element_params(target, selector))
            .await?;
        Ok(result["text"].as_str().map(|s| s.to_string()))
    }

    async fn get_attribute(
        &self,
        target: &PageTarget,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BridgeError> {
        let mut params = Self::element_params(target, selector);
        params["attribute"] = json!(name);
        let result = self.request("element.getAttribute", params).await?;
        Ok(result["value"].as_str().map(|s| s.to_string()))
    }

    async fn element_count(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<u64, BridgeError> {
        let result = self
            .request("element.count", Self::element_params(target, selector))
            .await?;
        Ok(result["count"].as_u64().unwrap_or(0))
    }

    async fn is_visible(&self, target: &PageTarget, selector: &str) -> Result<bool, BridgeError> {
        let result = self
            .request("element.isVisible", Self::element_params(target, selector))
            .await?;
        Ok(result["visible"].as_bool().unwrap_or(false))
    }

    async fn element_exists(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<bool, BridgeError> {
        let result = self
            .request("element.exists", Self::element_params(target, selector))
            .await?;
        Ok(result["exists"].as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<(), BridgeError> {
        self.request("element.scrollIntoView", Self::element_params(target, selector))
            .await?;
        Ok(())
    }

    async fn scroll_by(&self, page_id: &str, dx: i64, dy: i64) -> Result<(), BridgeError> {
        self.request(
            "page.scrollBy",
            json!({ "pageId": page_id, "dx": dx, "dy": dy }),
        )
        .await?;
        Ok(())
    }

    async fn scroll_to_edge(&self, page_id: &str, top: bool) -> Result<(), BridgeError> {
        self.request(
            "page.scrollToEdge",
            json!({ "pageId": page_id, "top": top }),
        )
        .await?;
        Ok(())
    }

    async fn evaluate(&self, page_id: &str, script: &str) -> Result<Value, BridgeError> {
        let result = self
            .request(
                "page.evaluate",
                json!({ "pageId": page_id, "script": script }),
            )
            .await?;
        Ok(result["value"].clone())
    }

    async fn screenshot(&self, page_id: &str, full_page: bool) -> Result<String, BridgeError> {
        let result = self
            .request(
                "page.screenshot",
                json!({ "pageId": page_id, "fullPage": full_page }),
            )
            .await?;
        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no screenshot data returned".to_string()))
    }

    async fn screenshot_to_file(
        &self,
        page_id: &str,
        path: &str,
        full_page: bool,
    ) -> Result<(), BridgeError> {
        self.request(
            "page.screenshot",
            json!({ "pageId": page_id, "path": path, "fullPage": full_page }),
        )
        .await?;
        Ok(())
    }

    async fn screenshot_element(
        &self,
        target: &PageTarget,
        selector: &str,
    ) -> Result<String, BridgeError> {
        let result = self
            .request("element.screenshot", Self::element_params(target, selector))
            .await?;
        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::ServerError("no screenshot data returned".to_string()))
    }

    async fn video_path(&self, page_id: &str) -> Result<Option<String>, BridgeError> {
        let result = self
            .request("page.videoPath", json!({ "pageId": page_id }))
            .await?;
        Ok(result["path"].as_str().map(|s| s.to_string()))
    }

    async fn cookies(&self, context_id: &str) -> Result<Value, BridgeError> {
        let result = self
            .request("context.cookies", json!({ "contextId": context_id }))
            .await?;
        Ok(result["cookies"].clone())
    }

    async fn add_cookies(&self, context_id: &str, cookies: Value) -> Result<(), BridgeError> {
        self.request(
            "context.addCookies",
            json!({ "contextId": context_id, "cookies": cookies }),
        )
        .await?;
        Ok(())
    }

    async fn clear_cookies(&self, context_id: &str) -> Result<(), BridgeError> {
        self.request("context.clearCookies", json!({ "contextId": context_id }))
            .await?;
        Ok(())
    }

    async fn dialog_arm(
        &self,
        page_id: &str,
        response: DialogResponse,
    ) -> Result<(), BridgeError> {
        self.request(
            "dialog.arm",
            json!({ "pageId": page_id, "response": response.as_str() }),
        )
        .await?;
        Ok(())
    }

    async fn dialog_message(&self, page_id: &str) -> Result<Option<String>, BridgeError> {
        let result = self
            .request("dialog.message", json!({ "pageId": page_id }))
            .await?;
        Ok(result["message"].as_str().map(|s| s.to_string()))
    }
}
