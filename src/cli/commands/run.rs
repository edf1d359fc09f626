//! # Run Command Module / 运行命令模块
//!
//! Loads the configuration and workbook, plans the run, drives every test
//! case through a WebDriver session and persists the summaries.
//!
//! 加载配置和工作簿，规划运行，通过 WebDriver 会话驱动每个测试用例并持久化摘要。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{
    artifacts::ScreenshotLayout,
    config::{ConfigOverrides, RunnerConfig, load_config},
    dispatcher::DispatchContext,
    driver::BrowserDriver,
    execution::{LoopReport, run_test_cases},
    planner::{ExecutionPlan, plan_execution},
    source::StepSource,
    tracker::{ExecutionSummary, ExecutionTracker},
};
use crate::infra::{fs::FsArtifactStore, t, webdriver::WebDriverSession, workbook::Workbook};
use crate::reporting::{console::print_saved_reports, print_summary, save_html, save_json};

/// Result of one run over a plan.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: ExecutionSummary,
    pub report: LoopReport,
    pub json_path: PathBuf,
    pub html_path: PathBuf,
}

impl RunOutcome {
    /// True when a tracked test case failed or the loop rejected one
    /// before it could be tracked.
    pub fn has_failures(&self) -> bool {
        self.report.failed > 0 || self.summary.stats().has_failures()
    }

    pub fn failed_count(&self) -> usize {
        self.report.failed.max(self.summary.stats().failed_test_cases)
    }
}

/// Executes the run command.
///
/// Fails when planning fails, when the session cannot be started, or when
/// at least one test case failed.
///
/// 规划失败、会话无法启动或至少一个测试用例失败时返回错误。
pub async fn execute(config_path: &Path, overrides: ConfigOverrides) -> Result<()> {
    let explicit_language = overrides.language.is_some();
    let mut config = load_config(config_path)?;
    config.apply(overrides);
    if !explicit_language && !config.language.is_empty() {
        crate::set_language(&config.language);
    }

    let workbook_path = config.workbook_path()?;
    println!(
        "{}",
        t!("run.loading_workbook", path = workbook_path.display()).cyan()
    );
    let workbook = Workbook::load(&workbook_path)?;
    let plan = plan_execution(&workbook, &config.sheet_prefix, &config.module_sheet)?;

    let stop = setup_signal_handler();

    let mut session = WebDriverSession::start(
        &config.browser,
        Duration::from_millis(config.execution.assertion_timeout_ms),
    )
    .await
    .with_context(|| t!("run.session_failed", url = &config.browser.webdriver_url).to_string())?;

    let outcome = run_plan(&config, &plan, &mut session, &stop).await;
    if let Err(e) = session.quit().await {
        warn!(error = %e, "webdriver session could not be closed");
    }
    let outcome = outcome?;

    if outcome.has_failures() {
        anyhow::bail!(
            t!(
                "run.failed_cases",
                count = outcome.failed_count()
            )
            .to_string()
        );
    }
    println!("\n{}", t!("run.all_passed").green().bold());
    Ok(())
}

/// Plans `source` and runs it on `driver`, then prints and persists the summary.
///
/// Planning errors abort before any test case starts. Test-case failures do
/// not; they are visible in the returned summary.
///
/// 规划错误会在任何测试用例开始之前中止。测试用例失败不会中止运行；它们体现在返回的摘要中。
pub async fn run_with_driver(
    config: &RunnerConfig,
    source: &dyn StepSource,
    driver: &mut dyn BrowserDriver,
    stop: &CancellationToken,
) -> Result<RunOutcome> {
    let plan = plan_execution(source, &config.sheet_prefix, &config.module_sheet)?;
    run_plan(config, &plan, driver, stop).await
}

/// Runs an already validated plan on `driver`.
pub async fn run_plan(
    config: &RunnerConfig,
    plan: &ExecutionPlan,
    driver: &mut dyn BrowserDriver,
    stop: &CancellationToken,
) -> Result<RunOutcome> {
    let mut tracker = ExecutionTracker::new();
    let layout = ScreenshotLayout::new(
        config.screenshot_root()?,
        tracker.overall_start().date_naive(),
    );
    let store = FsArtifactStore;
    let ctx = DispatchContext {
        artifacts: &store,
        modules: &plan.modules,
        layout: &layout,
        options: config.execution.dispatch_options(),
    };

    let report = run_test_cases(plan, driver, &mut tracker, ctx, stop).await;
    info!(
        executed = report.executed,
        failed = report.failed,
        "run finished"
    );

    let summary = tracker.snapshot();
    print_summary(&summary);

    let summary_dir = config.summary_root()?;
    let generated_at = Utc::now();
    let json_path = save_json(&summary, &summary_dir, generated_at)?;
    let html_path = save_html(&summary, &layout, &summary_dir, generated_at)?;
    print_saved_reports(&json_path, &html_path);

    Ok(RunOutcome {
        summary,
        report,
        json_path,
        html_path,
    })
}

/// Sets up a signal handler for graceful shutdown.
/// The token is checked between test cases.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        println!("\n{}", t!("run.shutdown_signal").yellow());
        token_clone.cancel();
    });

    token
}
