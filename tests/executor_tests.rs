mod common;

use common::*;
use webpilot::{Action, ActionKind, Pacing, StepExecutor, StepResult};

fn executor(driver: &FakeDriver) -> StepExecutor<'_> {
    StepExecutor::with_pacing(driver, "ctx1", Pacing::none())
}

fn action_outcomes(results: &[StepResult]) -> Vec<(ActionKind, bool)> {
    results
        .iter()
        .filter_map(|r| match r {
            StepResult::Action {
                action, success, ..
            } => Some((*action, *success)),
            _ => None,
        })
        .collect()
}

fn screenshot_count(results: &[StepResult]) -> usize {
    results.iter().filter(|r| r.is_screenshot()).count()
}

#[tokio::test]
async fn test_search_script_succeeds_with_screenshots() {
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &search_script()).await;

    let outcomes = action_outcomes(&results);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|(_, success)| *success));
    assert!(screenshot_count(&results) >= 2);
}

#[tokio::test]
async fn test_one_outcome_per_action() {
    let script = vec![
        Action::navigate("https://example.com"),
        Action::new(ActionKind::GetTitle),
        Action::click("#link"),
        Action::new(ActionKind::ScrollToBottom),
        Action::screenshot(),
    ];
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &script).await;

    assert_eq!(action_outcomes(&results).len(), script.len());
}

#[tokio::test]
async fn test_newline_sentinel_presses_enter_instead_of_typing() {
    let driver = FakeDriver::new();
    let script = vec![Action::type_into("textarea[name=q]", "\n")];
    executor(&driver).run("page1", &script).await;

    assert_eq!(driver.count_calls("type_text"), 0);
    assert_eq!(driver.count_calls("press_key Enter"), 1);
    assert_eq!(driver.count_calls("wait_for_navigation"), 1);
}

#[tokio::test]
async fn test_typing_is_character_by_character() {
    let driver = FakeDriver::new();
    let script = vec![Action::type_into("input#name", "hello")];
    executor(&driver).run("page1", &script).await;

    assert_eq!(driver.count_calls("type_text"), 5);
    let calls = driver.calls();
    let typed: String = calls
        .iter()
        .filter_map(|c| c.strip_prefix("type_text input#name "))
        .collect();
    assert_eq!(typed, "hello");
}

#[tokio::test]
async fn test_failing_step_is_isolated() {
    // Step 2's selector never appears; steps 1 and 3 still run.
    let driver = FakeDriver::new().with_missing_selector("#never");
    let script = vec![
        Action::navigate("https://example.com"),
        Action::click("#never"),
        Action::screenshot(),
    ];
    let results = executor(&driver).run("page1", &script).await;

    let outcomes = action_outcomes(&results);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], (ActionKind::Navigate, true));
    assert_eq!(outcomes[1], (ActionKind::Click, false));
    assert_eq!(outcomes[2], (ActionKind::Screenshot, true));

    let error = results
        .iter()
        .find_map(|r| match r {
            StepResult::Action {
                success: false,
                error,
                ..
            } => error.clone(),
            _ => None,
        })
        .unwrap();
    assert!(error.contains("Timeout"), "error was: {error}");

    // Failure screenshot plus the ones from steps 1 and 3.
    assert!(screenshot_count(&results) >= 3);
}

#[tokio::test]
async fn test_failed_step_gets_a_screenshot_right_after_its_outcome() {
    let driver = FakeDriver::new().with_missing_selector("#never");
    let script = vec![Action::click("#never")];
    let results = executor(&driver).run("page1", &script).await;

    assert!(results[0].is_action_outcome());
    assert!(results[1].is_screenshot());
}

#[tokio::test]
async fn test_unknown_action_is_a_logged_noop() {
    let script: Vec<Action> = serde_json::from_str(
        r#"[
            {"action": "summon_dragon", "value": "now"},
            {"action": "get_url"}
        ]"#,
    )
    .unwrap();
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &script).await;

    let outcomes = action_outcomes(&results);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0], (ActionKind::Unknown, true));
    assert_eq!(outcomes[1], (ActionKind::GetUrl, true));
}

#[tokio::test]
async fn test_queries_extract_and_take_no_screenshot() {
    let script = vec![
        Action::new(ActionKind::GetTitle),
        Action::new(ActionKind::GetUrl),
        Action {
            kind: ActionKind::GetElementCount,
            selector: Some(".item".into()),
            value: None,
            reasoning: None,
        },
    ];
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &script).await;

    assert_eq!(screenshot_count(&results), 0);
    let extracted: Vec<_> = results
        .iter()
        .filter_map(|r| match r {
            StepResult::ExtractedValue { kind, data, .. } => Some((*kind, data.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(extracted.len(), 3);
    assert_eq!(extracted[0].1, serde_json::json!("Example Domain"));
    assert_eq!(extracted[2].1, serde_json::json!(3));
}

#[tokio::test]
async fn test_dialog_handler_is_armed_before_the_trigger() {
    let script = vec![
        Action::new(ActionKind::AcceptAlert),
        Action::click("#open-alert"),
    ];
    let driver = FakeDriver::new();
    executor(&driver).run("page1", &script).await;

    let armed = driver.first_call("dialog_arm accept").unwrap();
    let clicked = driver.first_call("click #open-alert").unwrap();
    assert!(armed < clicked, "dialog must be armed before the click");
}

#[tokio::test]
async fn test_get_alert_text_reports_captured_message() {
    let driver = FakeDriver::new();
    driver.set_dialog_message("Are you sure?");
    let script = vec![Action::new(ActionKind::GetAlertText)];
    let results = executor(&driver).run("page1", &script).await;

    assert_eq!(driver.count_calls("dialog_arm capture"), 1);
    let extracted = results
        .iter()
        .find_map(|r| match r {
            StepResult::ExtractedValue { data, .. } => Some(data.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(extracted, serde_json::json!("Are you sure?"));
}

#[tokio::test]
async fn test_frame_switch_threads_the_target() {
    let script = vec![
        Action {
            kind: ActionKind::SwitchToIframe,
            selector: Some("#payment-frame".into()),
            value: None,
            reasoning: None,
        },
        Action {
            kind: ActionKind::ExtractText,
            selector: Some(".total".into()),
            value: None,
            reasoning: None,
        },
        Action::new(ActionKind::SwitchToMainFrame),
        Action {
            kind: ActionKind::ExtractText,
            selector: Some(".header".into()),
            value: None,
            reasoning: None,
        },
    ];
    let driver = FakeDriver::new();
    executor(&driver).run("page1", &script).await;

    let calls = driver.calls();
    assert!(calls.contains(&"text_content frame=#payment-frame .total".to_string()));
    assert!(calls.contains(&"text_content .header".to_string()));
}

#[tokio::test]
async fn test_new_tab_switch_moves_subsequent_actions() {
    let script = vec![
        Action::new(ActionKind::SwitchToNewTab),
        Action::new(ActionKind::GetUrl),
    ];
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &script).await;

    assert_eq!(driver.count_calls("wait_for_page"), 1);
    assert_eq!(action_outcomes(&results).len(), 2);
}

#[tokio::test]
async fn test_click_hovers_first() {
    let driver = FakeDriver::new();
    executor(&driver)
        .run("page1", &[Action::click("#submit")])
        .await;

    let hovered = driver.first_call("hover #submit").unwrap();
    let clicked = driver.first_call("click #submit").unwrap();
    assert!(hovered < clicked);
}

#[tokio::test]
async fn test_empty_script_yields_no_results() {
    let driver = FakeDriver::new();
    let results = executor(&driver).run("page1", &[]).await;
    assert!(results.is_empty());
}
