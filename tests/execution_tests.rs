//! Test-case loop scenarios driven through a recording driver.
//!
//! 通过记录型驱动执行的测试用例循环场景。

mod common;

use std::path::PathBuf;

use common::{LOGIN_WORKBOOK, MemoryStore, RecordingDriver, context, layout, workbook};
use grid_runner::core::execution::{run_test_case, run_test_cases};
use grid_runner::core::planner::{ExecutionPlan, PlannedTestCase, plan_execution};
use grid_runner::core::tracker::ExecutionTracker;
use grid_runner::models::{RunPhase, Status, StepRow};
use tokio_util::sync::CancellationToken;

fn login_plan() -> ExecutionPlan {
    plan_execution(&workbook(LOGIN_WORKBOOK), "Test", "Module").unwrap()
}

fn case<'a>(plan: &'a ExecutionPlan, name: &str) -> &'a PlannedTestCase {
    plan.test_cases.iter().find(|c| c.name == name).unwrap()
}

/// A failing element action on row 2 of 3 stops the test case after two
/// recorded steps, and both executed rows leave a screenshot behind.
///
/// 3 行中第 2 行的元素操作失败时，测试用例在记录两个步骤后停止，且两行都留下截图。
#[tokio::test]
async fn failing_row_stops_its_test_case() {
    let plan = login_plan();
    let mut driver = RecordingDriver::failing_on_element_call(1);
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();

    let result = run_test_case(
        case(&plan, "TestCheckout"),
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
    )
    .await;

    assert!(result.is_err());
    let run = tracker.get("TestCheckout").unwrap();
    assert_eq!(run.steps.len(), 2);
    assert_eq!(run.status, Status::Failed);
    assert_eq!(run.first_failure_step, Some(2));
    assert!(run.first_failure_message.as_deref().unwrap().contains("#add"));
    assert_eq!(run.phase(), RunPhase::Completed);
    assert!(run.end_time.is_some());

    assert_eq!(
        store.stored(),
        vec![
            PathBuf::from("shots/2025-03-14/TestCheckout/Step_1_OPENURL.png"),
            PathBuf::from("shots/2025-03-14/TestCheckout/Step_2_CLICKBUTTON.png"),
        ]
    );
    // Row 3 never reached the driver.
    assert_eq!(driver.count("check Visible"), 0);
}

/// A test case made of one `GETMODULE` row records the module's inner rows,
/// each tagged with the module name.
///
/// 仅由一行 `GETMODULE` 组成的测试用例会记录模块的内部行，每行都带有模块名标记。
#[tokio::test]
async fn module_step_records_inner_rows() {
    let plan = login_plan();
    let mut driver = RecordingDriver::default();
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();

    run_test_case(
        case(&plan, "TestLogin"),
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
    )
    .await
    .unwrap();

    let run = tracker.get("TestLogin").unwrap();
    let descriptions: Vec<&str> = run
        .steps
        .iter()
        .map(|s| s.step_description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec!["[Module: Login] Enter user", "[Module: Login] Press login"]
    );
    assert_eq!(run.status, Status::Passed);
    assert_eq!(
        store.stored(),
        vec![
            PathBuf::from("shots/2025-03-14/TestLogin/Module_Login_Step_1_FILL.png"),
            PathBuf::from("shots/2025-03-14/TestLogin/Module_Login_Step_2_CLICKBUTTON.png"),
        ]
    );
    assert_eq!(
        driver.calls,
        vec!["prepare", "fill tom", "screenshot", "click", "screenshot"]
    );
}

#[tokio::test]
async fn loop_continues_after_a_failed_test_case() {
    let plan = login_plan();
    // The first element call belongs to TestLogin, which comes first in the workbook.
    let mut driver = RecordingDriver::failing_on_element_call(1);
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();

    let report = run_test_cases(
        &plan,
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.executed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 0);
    let names: Vec<&str> = tracker.runs().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["TestLogin", "TestCheckout"]);
    assert_eq!(tracker.get("TestLogin").unwrap().status, Status::Failed);
    assert_eq!(tracker.get("TestCheckout").unwrap().status, Status::Passed);
    assert_eq!(tracker.get("TestCheckout").unwrap().steps.len(), 3);
    assert_eq!(driver.count("prepare"), 2);
}

#[tokio::test]
async fn cancelled_run_starts_no_test_case() {
    let plan = login_plan();
    let mut driver = RecordingDriver::default();
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();
    let stop = CancellationToken::new();
    stop.cancel();

    let report = run_test_cases(
        &plan,
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
        &stop,
    )
    .await;

    assert_eq!(report.executed, 0);
    assert_eq!(report.skipped, 2);
    assert!(tracker.is_empty());
    assert!(driver.calls.is_empty());
}

#[tokio::test]
async fn unsupported_action_fails_without_touching_the_page() {
    let plan = ExecutionPlan {
        test_cases: vec![PlannedTestCase {
            name: "TestOdd".into(),
            rows: vec![
                StepRow::new(1, "Teleport", "TELEPORT"),
                StepRow::new(2, "Never runs", "OPENURL").with_input("https://example.com"),
            ],
        }],
        ..ExecutionPlan::default()
    };
    let mut driver = RecordingDriver::default();
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();

    let err = run_test_case(
        &plan.test_cases[0],
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
    )
    .await
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("TELEPORT"), "{message}");
    assert!(message.contains("OPENURL"), "available actions listed: {message}");
    assert_eq!(driver.calls, vec!["prepare", "screenshot"]);
    let run = tracker.get("TestOdd").unwrap();
    assert_eq!(run.steps.len(), 1);
    assert_eq!(run.first_failure_step, Some(1));
}

#[tokio::test]
async fn prepare_failure_is_recorded_on_the_first_row() {
    let plan = login_plan();
    let mut driver = RecordingDriver::failing_prepare();
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();

    let result = run_test_case(
        case(&plan, "TestCheckout"),
        &mut driver,
        &mut tracker,
        context(&store, &plan.modules, &layout),
    )
    .await;

    assert!(result.is_err());
    let run = tracker.get("TestCheckout").unwrap();
    assert_eq!(run.steps.len(), 1);
    assert_eq!(run.steps[0].step, 1);
    assert_eq!(run.steps[0].status, Status::Failed);
    assert!(store.stored().is_empty());
}

#[tokio::test]
async fn running_the_same_test_case_twice_is_rejected() {
    let plan = login_plan();
    let mut driver = RecordingDriver::default();
    let mut tracker = ExecutionTracker::new();
    let store = MemoryStore::default();
    let layout = layout();
    let checkout = case(&plan, "TestCheckout");

    run_test_case(checkout, &mut driver, &mut tracker, context(&store, &plan.modules, &layout))
        .await
        .unwrap();
    let second =
        run_test_case(checkout, &mut driver, &mut tracker, context(&store, &plan.modules, &layout))
            .await;

    assert!(second.unwrap_err().to_string().contains("already been started"));
    assert_eq!(tracker.get("TestCheckout").unwrap().steps.len(), 3);
    assert_eq!(tracker.len(), 1);
}
