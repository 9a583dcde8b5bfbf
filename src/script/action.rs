//! Action types and the closed action vocabulary
//!
//! A script is a JSON array of actions: `{action, selector?, value?,
//! reasoning?}`. The `action` field is one of a closed set of kinds; anything
//! outside the vocabulary deserializes to [`ActionKind::Unknown`] and is
//! skipped at execution time rather than rejected at parse time.

use serde::{Deserialize, Serialize};

/// Categories of actions in the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    BasicInteraction, // navigate, click, hover, drag_and_drop, ...
    FormInput,        // type, press_key, check_checkbox, ...
    FileOperation,    // upload_file, download_file
    Navigation,       // go_back, go_forward, reload, close_tab
    FrameWindow,      // switch_to_iframe, switch_to_main_frame, switch_to_new_tab
    Extraction,       // extract_text, get_title, get_cookies, ...
    Waiting,          // wait_for_element, wait_for_timeout, ...
    Scrolling,        // scroll_to, scroll_by, ...
    Screenshot,       // screenshot, screenshot_element
    CookieStorage,    // set_cookie, clear_cookies
    Dialog,           // accept_alert, dismiss_alert, get_alert_text
    Advanced,         // execute_javascript
    Unknown,
}

/// The closed vocabulary of browser actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    // Basic interaction
    Navigate,
    Click,
    DoubleClick,
    RightClick,
    Hover,
    DragAndDrop,
    // Form input
    Type,
    TypeText,
    ClearInput,
    Focus,
    PressKey,
    CheckCheckbox,
    UncheckCheckbox,
    SelectDropdown,
    SelectText,
    // File operations
    UploadFile,
    DownloadFile,
    // Navigation
    GoBack,
    GoForward,
    Reload,
    CloseTab,
    // Frame & window
    SwitchToIframe,
    SwitchToMainFrame,
    SwitchToNewTab,
    // Data extraction
    ExtractText,
    GetAttribute,
    GetTitle,
    GetUrl,
    ElementExists,
    IsVisible,
    GetElementCount,
    GetCookies,
    GetAlertText,
    // Waiting
    WaitForElement,
    WaitForNavigation,
    WaitForTimeout,
    WaitForUrl,
    // Scrolling
    ScrollTo,
    ScrollToTop,
    ScrollToBottom,
    ScrollBy,
    // Screenshots
    Screenshot,
    ScreenshotElement,
    // Cookie management
    SetCookie,
    ClearCookies,
    // Alert handling
    AcceptAlert,
    DismissAlert,
    // Advanced
    ExecuteJavascript,
    /// Anything outside the vocabulary. Executes as a logged no-op.
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn category(&self) -> ActionCategory {
        use ActionKind::*;
        match self {
            Navigate | Click | DoubleClick | RightClick | Hover | DragAndDrop => {
                ActionCategory::BasicInteraction
            }
            Type | TypeText | ClearInput | Focus | PressKey | CheckCheckbox | UncheckCheckbox
            | SelectDropdown | SelectText => ActionCategory::FormInput,
            UploadFile | DownloadFile => ActionCategory::FileOperation,
            GoBack | GoForward | Reload | CloseTab => ActionCategory::Navigation,
            SwitchToIframe | SwitchToMainFrame | SwitchToNewTab => ActionCategory::FrameWindow,
            ExtractText | GetAttribute | GetTitle | GetUrl | ElementExists | IsVisible
            | GetElementCount | GetCookies => ActionCategory::Extraction,
            GetAlertText | AcceptAlert | DismissAlert => ActionCategory::Dialog,
            WaitForElement | WaitForNavigation | WaitForTimeout | WaitForUrl => {
                ActionCategory::Waiting
            }
            ScrollTo | ScrollToTop | ScrollToBottom | ScrollBy => ActionCategory::Scrolling,
            Screenshot | ScreenshotElement => ActionCategory::Screenshot,
            SetCookie | ClearCookies => ActionCategory::CookieStorage,
            ExecuteJavascript => ActionCategory::Advanced,
            Unknown => ActionCategory::Unknown,
        }
    }

    /// Pure page queries: these record an extracted value and take no
    /// screenshot.
    pub fn is_query(&self) -> bool {
        matches!(self.category(), ActionCategory::Extraction)
    }

    /// Dialog-class actions arm a one-shot handler for the next dialog event
    /// instead of acting synchronously.
    pub fn is_dialog(&self) -> bool {
        matches!(self.category(), ActionCategory::Dialog)
    }

    /// State-changing actions get a human-pacing delay before they run.
    pub fn changes_state(&self) -> bool {
        use ActionCategory::*;
        matches!(
            self.category(),
            BasicInteraction
                | FormInput
                | FileOperation
                | Navigation
                | Scrolling
                | CookieStorage
                | Advanced
        ) || *self == ActionKind::SwitchToNewTab
    }

    /// Actions that change *visible* state are followed by a screenshot.
    /// Cookie writes and tab closure change state without anything to
    /// capture.
    pub fn changes_visible_state(&self) -> bool {
        self.changes_state()
            && !matches!(
                self,
                ActionKind::CloseTab | ActionKind::SetCookie | ActionKind::ClearCookies
            )
    }

    /// Wire name of the kind, as it appears in the JSON `action` field.
    pub fn as_str(&self) -> &'static str {
        use ActionKind::*;
        match self {
            Navigate => "navigate",
            Click => "click",
            DoubleClick => "double_click",
            RightClick => "right_click",
            Hover => "hover",
            DragAndDrop => "drag_and_drop",
            Type => "type",
            TypeText => "type_text",
            ClearInput => "clear_input",
            Focus => "focus",
            PressKey => "press_key",
            CheckCheckbox => "check_checkbox",
            UncheckCheckbox => "uncheck_checkbox",
            SelectDropdown => "select_dropdown",
            SelectText => "select_text",
            UploadFile => "upload_file",
            DownloadFile => "download_file",
            GoBack => "go_back",
            GoForward => "go_forward",
            Reload => "reload",
            CloseTab => "close_tab",
            SwitchToIframe => "switch_to_iframe",
            SwitchToMainFrame => "switch_to_main_frame",
            SwitchToNewTab => "switch_to_new_tab",
            ExtractText => "extract_text",
            GetAttribute => "get_attribute",
            GetTitle => "get_title",
            GetUrl => "get_url",
            ElementExists => "element_exists",
            IsVisible => "is_visible",
            GetElementCount => "get_element_count",
            GetCookies => "get_cookies",
            GetAlertText => "get_alert_text",
            WaitForElement => "wait_for_element",
            WaitForNavigation => "wait_for_navigation",
            WaitForTimeout => "wait_for_timeout",
            WaitForUrl => "wait_for_url",
            ScrollTo => "scroll_to",
            ScrollToTop => "scroll_to_top",
            ScrollToBottom => "scroll_to_bottom",
            ScrollBy => "scroll_by",
            Screenshot => "screenshot",
            ScreenshotElement => "screenshot_element",
            SetCookie => "set_cookie",
            ClearCookies => "clear_cookies",
            AcceptAlert => "accept_alert",
            DismissAlert => "dismiss_alert",
            ExecuteJavascript => "execute_javascript",
            Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative unit of browser instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            selector: None,
            value: None,
            reasoning: None,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Navigate,
            selector: None,
            value: Some(url.into()),
            reasoning: None,
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Click,
            selector: Some(selector.into()),
            value: None,
            reasoning: None,
        }
    }

    pub fn type_into(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Type,
            selector: Some(selector.into()),
            value: Some(text.into()),
            reasoning: None,
        }
    }

    pub fn screenshot() -> Self {
        Self::new(ActionKind::Screenshot)
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Scripts conventionally end with a screenshot so every run leaves a final
/// capture. Appends one when the producing collaborator omitted it.
pub fn ensure_trailing_screenshot(mut script: Vec<Action>) -> Vec<Action> {
    match script.last() {
        Some(last) if last.kind == ActionKind::Screenshot => script,
        _ => {
            script.push(Action::screenshot());
            script
        }
    }
}
