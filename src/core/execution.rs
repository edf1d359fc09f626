//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! Runs the planned test cases strictly one after another. A failing step
//! stops its own test case only; the loop always moves on to the next one.
//!
//! 严格按顺序依次运行计划中的测试用例。失败的步骤只会停止其所在的测试用例；
//! 循环总是继续执行下一个。

use colored::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::dispatcher::{ActionDispatcher, DispatchContext};
use crate::core::driver::BrowserDriver;
use crate::core::error::TestCaseError;
use crate::core::models::StepOutcome;
use crate::core::planner::{ExecutionPlan, PlannedTestCase};
use crate::core::tracker::ExecutionTracker;
use crate::infra::t;

/// Counts of one pass over the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub executed: usize,
    pub failed: usize,
    /// Test cases not started because the run was cancelled.
    pub skipped: usize,
}

/// Runs every planned test case in order.
///
/// `stop` is only checked between test cases; a test case already running
/// finishes its current step sequence.
///
/// `stop` 仅在测试用例之间检查；已在运行的测试用例会完成其当前步骤序列。
pub async fn run_test_cases(
    plan: &ExecutionPlan,
    driver: &mut dyn BrowserDriver,
    tracker: &mut ExecutionTracker,
    ctx: DispatchContext<'_>,
    stop: &CancellationToken,
) -> LoopReport {
    let mut report = LoopReport::default();

    for (index, case) in plan.test_cases.iter().enumerate() {
        if stop.is_cancelled() {
            report.skipped = plan.test_cases.len() - index;
            println!(
                "{}",
                t!("run.cancelled_remaining", count = report.skipped).yellow()
            );
            break;
        }

        report.executed += 1;
        match run_test_case(case, driver, tracker, ctx).await {
            Ok(()) => println!("{}", t!("run.case_passed", name = &case.name).green()),
            Err(e) => {
                report.failed += 1;
                error!(test_case = %case.name, error = %e, "test case failed");
                println!(
                    "{}",
                    t!("run.case_failed", name = &case.name, error = e.to_string()).red()
                );
            }
        }
    }

    info!(
        executed = report.executed,
        failed = report.failed,
        skipped = report.skipped,
        "test case loop finished"
    );
    report
}

/// Runs one test case: opens its tracker entry, streams its rows through a
/// dispatcher and closes the entry on every exit path.
pub async fn run_test_case(
    case: &PlannedTestCase,
    driver: &mut dyn BrowserDriver,
    tracker: &mut ExecutionTracker,
    ctx: DispatchContext<'_>,
) -> Result<(), TestCaseError> {
    println!("\n{}", t!("run.suite_start", name = &case.name).bold());
    tracker.start_test_case(&case.name)?;

    let result = run_rows(case, driver, tracker, ctx).await;
    tracker.end_test_case(&case.name);
    result
}

async fn run_rows(
    case: &PlannedTestCase,
    driver: &mut dyn BrowserDriver,
    tracker: &mut ExecutionTracker,
    ctx: DispatchContext<'_>,
) -> Result<(), TestCaseError> {
    println!(
        "{}",
        t!("run.reading_steps", count = case.rows.len(), name = &case.name)
    );

    if let Err(e) = driver.prepare().await {
        // Nothing ran, so the first declared row carries the failure.
        if let Some(first) = case.rows.first() {
            tracker.record_step(&case.name, StepOutcome::failed(first, e.to_string()));
        }
        return Err(TestCaseError::Prepare(e));
    }

    let mut dispatcher = ActionDispatcher::new(driver, tracker, ctx, case.name.as_str());
    for row in &case.rows {
        dispatcher.execute(row).await?;
    }

    println!(
        "{}",
        t!("run.all_steps_executed", count = case.rows.len(), name = &case.name).green()
    );
    Ok(())
}
