//! # Action Dispatcher / 动作分发器
//!
//! Interprets one `StepRow` at a time against a `BrowserDriver`. Every step
//! that reaches the driver is closed by exactly one screenshot and reported
//! to the tracker exactly once, whatever the outcome.
//!
//! 针对 `BrowserDriver` 一次解释一个 `StepRow`。每个到达驱动的步骤都以
//! 恰好一张截图结束，并且无论结果如何都只向跟踪器报告一次。

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::*;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::core::action::{Action, Assertion, ElementOp};
use crate::core::artifacts::{ArtifactStore, ScreenshotLayout};
use crate::core::driver::BrowserDriver;
use crate::core::error::{StepError, StepFailure};
use crate::core::models::{StepOutcome, StepRow};
use crate::core::modules::ModuleTable;
use crate::core::tracker::ExecutionTracker;
use crate::infra::t;

/// Timeouts and limits applied while dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Explicit timeout of `ValidateElementtobeVisible`.
    pub visible_timeout: Duration,
    /// Timeout of the other assertions; `None` leaves it to the driver.
    pub assertion_timeout: Option<Duration>,
    /// Maximum nesting of `GETMODULE` expansions.
    pub max_module_depth: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            visible_timeout: Duration::from_millis(5000),
            assertion_timeout: None,
            max_module_depth: 16,
        }
    }
}

/// Read-only collaborators shared by every test case of a run.
///
/// 一次运行中所有测试用例共享的只读协作者。
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    pub artifacts: &'a dyn ArtifactStore,
    pub modules: &'a ModuleTable,
    pub layout: &'a ScreenshotLayout,
    pub options: DispatchOptions,
}

/// Drives the steps of a single test case.
///
/// The dispatcher borrows the page (through the driver) and the tracker for
/// the duration of one test case and never touches a `TestCaseRun` directly.
pub struct ActionDispatcher<'a> {
    driver: &'a mut dyn BrowserDriver,
    tracker: &'a mut ExecutionTracker,
    ctx: DispatchContext<'a>,
    test_case: String,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(
        driver: &'a mut dyn BrowserDriver,
        tracker: &'a mut ExecutionTracker,
        ctx: DispatchContext<'a>,
        test_case: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            tracker,
            ctx,
            test_case: test_case.into(),
        }
    }

    pub fn test_case(&self) -> &str {
        &self.test_case
    }

    /// Executes `row`. On failure the step has already been recorded and
    /// screenshotted; the returned error only tells the caller to stop.
    ///
    /// 执行 `row`。失败时该步骤已被记录并截图；返回的错误只用于通知调用方停止。
    pub async fn execute(&mut self, row: &StepRow) -> Result<(), StepFailure> {
        self.execute_scoped(row.clone(), None, 0).await
    }

    fn execute_scoped(
        &mut self,
        row: StepRow,
        module: Option<String>,
        depth: usize,
    ) -> BoxFuture<'_, Result<(), StepFailure>> {
        Box::pin(async move {
            println!(
                "{}",
                t!("step.executing", step = row.step, description = &row.step_description).blue()
            );

            let action = match Action::from_row(&row) {
                Ok(action) => action,
                Err(err) => return self.conclude(&row, module.as_deref(), true, Err(err)).await,
            };

            if let Action::GetModule { name } = &action {
                let rows = match self.resolve_module(name, depth) {
                    Ok(rows) => rows,
                    Err(err) => return self.conclude(&row, module.as_deref(), true, Err(err)).await,
                };
                for inner in rows {
                    self.execute_scoped(inner, Some(name.clone()), depth + 1)
                        .await?;
                }
                println!(
                    "{}",
                    t!("step.completed", step = row.step, detail = describe(&action)).green()
                );
                return Ok(());
            }

            let outcome = self.perform(&action, &row).await.map(|()| describe(&action));
            self.conclude(&row, module.as_deref(), action.captures_screenshot(), outcome)
                .await
        })
    }

    fn resolve_module(&self, name: &str, depth: usize) -> Result<Vec<StepRow>, StepError> {
        let max_depth = self.ctx.options.max_module_depth;
        if depth >= max_depth {
            return Err(StepError::ModuleDepthExceeded {
                name: name.to_string(),
                max_depth,
            });
        }
        if depth == 0 {
            self.ctx.modules.check_references(name, max_depth)?;
        }
        let rows = self.ctx.modules.expand(name)?;
        println!(
            "{}",
            t!("step.module_expanded", name = name, count = rows.len()).cyan()
        );
        Ok(rows)
    }

    /// One driver primitive per action.
    async fn perform(&mut self, action: &Action, row: &StepRow) -> Result<(), StepError> {
        match action {
            Action::OpenUrl { url } => self.driver.goto(url).await?,
            Action::Wait { duration } => self.driver.wait(*duration).await?,
            Action::ClosePage => self.driver.close_page().await?,
            Action::FullPageScreenshot { path } => {
                let target = self.full_page_path(row.step, path.as_deref());
                let bytes = self.driver.screenshot(true).await?;
                self.store(&target, &bytes)?;
            }
            Action::Element { locator, op } => self.driver.perform(locator, op).await?,
            Action::Assert { locator, assertion } => {
                let timeout = match assertion {
                    Assertion::Visible => Some(self.ctx.options.visible_timeout),
                    _ => self.ctx.options.assertion_timeout,
                };
                self.driver.check(locator, *assertion, timeout).await?;
            }
            // Expanded by `execute_scoped`; never reaches the driver.
            Action::GetModule { .. } => {}
        }
        Ok(())
    }

    /// Closes the step span: screenshot, console line, tracker record.
    async fn conclude(
        &mut self,
        row: &StepRow,
        module: Option<&str>,
        capture: bool,
        mut outcome: Result<String, StepError>,
    ) -> Result<(), StepFailure> {
        if capture {
            let path = self.ctx.layout.step_path(
                &self.test_case,
                module,
                row.step,
                &row.action_type,
            );
            match self.capture(&path).await {
                Ok(()) => println!(
                    "{}",
                    t!("step.screenshot_taken", step = row.step, path = path.display()).dimmed()
                ),
                Err(err) if outcome.is_ok() => outcome = Err(err),
                Err(err) => warn!(
                    test_case = %self.test_case,
                    step = row.step,
                    error = %err,
                    "screenshot after failed step could not be captured"
                ),
            }
        }

        match outcome {
            Ok(detail) => {
                println!(
                    "{}",
                    t!("step.completed", step = row.step, detail = detail).green()
                );
                self.tracker
                    .record_step(&self.test_case, StepOutcome::passed(row));
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                println!(
                    "{}",
                    t!("step.failed", step = row.step, error = &message).red()
                );
                self.tracker
                    .record_step(&self.test_case, StepOutcome::failed(row, message));
                Err(StepFailure::new(row.step, row.action_type.clone(), err))
            }
        }
    }

    async fn capture(&mut self, path: &Path) -> Result<(), StepError> {
        let bytes = self.driver.screenshot(false).await?;
        self.store(path, &bytes)
    }

    fn store(&self, path: &Path, bytes: &[u8]) -> Result<(), StepError> {
        debug!(path = %path.display(), bytes = bytes.len(), "storing screenshot");
        self.ctx
            .artifacts
            .store(path, bytes)
            .map_err(|e| StepError::Artifact {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn full_page_path(&self, step: u32, requested: Option<&str>) -> PathBuf {
        let file = requested
            .map(str::to_string)
            .unwrap_or_else(|| format!("fullpage_screenshot_step_{step}.png"));
        self.ctx.layout.test_case_dir(&self.test_case).join(file)
    }
}

/// Localized detail of a completed action, as shown in the progress log.
fn describe(action: &Action) -> String {
    let detail = match action {
        Action::OpenUrl { url } => t!("step.detail.open_url", url = url),
        Action::Wait { duration } => t!("step.detail.wait", ms = duration.as_millis()),
        Action::ClosePage => t!("step.detail.close_page"),
        Action::FullPageScreenshot { path } => match path {
            Some(path) => t!("step.detail.full_page_at", path = path),
            None => t!("step.detail.full_page"),
        },
        Action::Element { op, .. } => match op {
            ElementOp::Fill(_) => t!("step.detail.fill"),
            ElementOp::Click => t!("step.detail.click"),
            ElementOp::DoubleClick => t!("step.detail.double_click"),
            ElementOp::Clear => t!("step.detail.clear"),
            ElementOp::SelectOption { label } => t!("step.detail.select_option", label = label),
            ElementOp::Hover => t!("step.detail.hover"),
            ElementOp::RightClick => t!("step.detail.right_click"),
            ElementOp::PressKey(key) => t!("step.detail.press_key", key = key),
            ElementOp::Check => t!("step.detail.check"),
            ElementOp::Uncheck => t!("step.detail.uncheck"),
            ElementOp::UploadFile(file) => t!("step.detail.upload_file", file = file),
            ElementOp::RadioSelect => t!("step.detail.radio_select"),
            ElementOp::RadioDeselect => t!("step.detail.radio_deselect"),
        },
        Action::Assert { assertion, .. } => match assertion {
            Assertion::Visible => t!("step.detail.visible"),
            Assertion::Hidden => t!("step.detail.hidden"),
            Assertion::Enabled => t!("step.detail.enabled"),
            Assertion::Disabled => t!("step.detail.disabled"),
            Assertion::Empty => t!("step.detail.empty"),
        },
        Action::GetModule { name } => t!("step.detail.module", name = name),
    };
    detail.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DriverError;
    use crate::core::locator::Locator;
    use crate::core::modules::ModuleRow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Memory {
        files: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl ArtifactStore for Memory {
        fn store(&self, path: &Path, _bytes: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::other("disk full"));
            }
            self.files.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn list(&self, _path: &Path) -> io::Result<Vec<PathBuf>> {
            Ok(self.files.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct Scripted {
        calls: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl Scripted {
        fn call(&mut self, name: &str) -> Result<(), DriverError> {
            self.calls.push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(DriverError::NoSuchElement {
                    locator: name.to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserDriver for Scripted {
        async fn goto(&mut self, _url: &str) -> Result<(), DriverError> {
            self.call("goto")
        }

        async fn wait(&mut self, _duration: Duration) -> Result<(), DriverError> {
            self.call("wait")
        }

        async fn close_page(&mut self) -> Result<(), DriverError> {
            self.call("close_page")
        }

        async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
            self.calls
                .push(if full_page { "screenshot_full" } else { "screenshot" }.into());
            Ok(vec![0x89, b'P', b'N', b'G'])
        }

        async fn perform(&mut self, _locator: &Locator, op: &ElementOp) -> Result<(), DriverError> {
            let name = match op {
                ElementOp::Click => "click",
                ElementOp::Fill(_) => "fill",
                _ => "element",
            };
            self.call(name)
        }

        async fn check(
            &mut self,
            _locator: &Locator,
            _assertion: Assertion,
            _timeout: Option<Duration>,
        ) -> Result<(), DriverError> {
            self.call("check")
        }
    }

    fn layout() -> ScreenshotLayout {
        ScreenshotLayout::new("shots", NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
    }

    #[tokio::test]
    async fn unsupported_action_records_one_failure_without_driver_action() {
        let mut driver = Scripted::default();
        let mut tracker = ExecutionTracker::new();
        let store = Memory::default();
        let modules = ModuleTable::default();
        let layout = layout();
        let ctx = DispatchContext {
            artifacts: &store,
            modules: &modules,
            layout: &layout,
            options: DispatchOptions::default(),
        };
        tracker.start_test_case("TestA").unwrap();

        let err = {
            let mut dispatcher = ActionDispatcher::new(&mut driver, &mut tracker, ctx, "TestA");
            dispatcher
                .execute(&StepRow::new(4, "?", "TELEPORT"))
                .await
                .unwrap_err()
        };

        assert_eq!(err.step, 4);
        assert!(matches!(err.source, StepError::UnsupportedActionType { .. }));
        assert_eq!(driver.calls, vec!["screenshot"]);
        let run = tracker.get("TestA").unwrap();
        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.first_failure_step, Some(4));
    }

    #[tokio::test]
    async fn screenshot_failure_fails_a_successful_step() {
        let mut driver = Scripted::default();
        let mut tracker = ExecutionTracker::new();
        let store = Memory {
            fail: true,
            ..Memory::default()
        };
        let modules = ModuleTable::default();
        let layout = layout();
        let ctx = DispatchContext {
            artifacts: &store,
            modules: &modules,
            layout: &layout,
            options: DispatchOptions::default(),
        };
        tracker.start_test_case("TestA").unwrap();

        let row = StepRow::new(1, "open", "OPENURL").with_input("https://example.com");
        let err = ActionDispatcher::new(&mut driver, &mut tracker, ctx, "TestA")
            .execute(&row)
            .await
            .unwrap_err();

        assert!(matches!(err.source, StepError::Artifact { .. }));
        assert_eq!(tracker.get("TestA").unwrap().failed_steps(), 1);
    }

    #[tokio::test]
    async fn close_page_takes_no_screenshot() {
        let mut driver = Scripted::default();
        let mut tracker = ExecutionTracker::new();
        let store = Memory::default();
        let modules = ModuleTable::default();
        let layout = layout();
        let ctx = DispatchContext {
            artifacts: &store,
            modules: &modules,
            layout: &layout,
            options: DispatchOptions::default(),
        };
        tracker.start_test_case("TestA").unwrap();

        ActionDispatcher::new(&mut driver, &mut tracker, ctx, "TestA")
            .execute(&StepRow::new(9, "close", "CLOSEPAGE"))
            .await
            .unwrap();

        assert_eq!(driver.calls, vec!["close_page"]);
        assert!(store.files.lock().unwrap().is_empty());
        assert_eq!(tracker.get("TestA").unwrap().passed_steps(), 1);
    }

    #[tokio::test]
    async fn nested_module_failure_is_recorded_once_with_module_prefix() {
        let mut driver = Scripted {
            fail_on: Some("click"),
            ..Scripted::default()
        };
        let mut tracker = ExecutionTracker::new();
        let store = Memory::default();
        let modules = ModuleTable::new(vec![
            ModuleRow::marker("Outer_Start"),
            ModuleRow::step(StepRow::new(1, "inner", "GETMODULE").with_input("Inner")),
            ModuleRow::marker("Outer_End"),
            ModuleRow::marker("Inner_Start"),
            ModuleRow::step(StepRow::new(1, "click", "CLICKBUTTON").with_locator("getByText", "Go")),
            ModuleRow::marker("Inner_End"),
        ]);
        let layout = layout();
        let ctx = DispatchContext {
            artifacts: &store,
            modules: &modules,
            layout: &layout,
            options: DispatchOptions::default(),
        };
        tracker.start_test_case("TestA").unwrap();

        let row = StepRow::new(3, "outer", "GETMODULE").with_input("Outer");
        let err = ActionDispatcher::new(&mut driver, &mut tracker, ctx, "TestA")
            .execute(&row)
            .await
            .unwrap_err();

        assert_eq!(err.step, 1);
        let run = tracker.get("TestA").unwrap();
        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.steps[0].step_description, "[Module: Inner] click");
        assert_eq!(
            store.files.lock().unwrap().as_slice(),
            [PathBuf::from("shots/2025-01-02/TestA/Module_Inner_Step_1_CLICKBUTTON.png")]
        );
    }

    #[tokio::test]
    async fn self_referencing_module_is_rejected_before_running() {
        let mut driver = Scripted::default();
        let mut tracker = ExecutionTracker::new();
        let store = Memory::default();
        let modules = ModuleTable::new(vec![
            ModuleRow::marker("Loop_Start"),
            ModuleRow::step(StepRow::new(1, "again", "GETMODULE").with_input("Loop")),
            ModuleRow::marker("Loop_End"),
        ]);
        let layout = layout();
        let ctx = DispatchContext {
            artifacts: &store,
            modules: &modules,
            layout: &layout,
            options: DispatchOptions::default(),
        };
        tracker.start_test_case("TestA").unwrap();

        let row = StepRow::new(2, "loop", "GETMODULE").with_input("Loop");
        let err = ActionDispatcher::new(&mut driver, &mut tracker, ctx, "TestA")
            .execute(&row)
            .await
            .unwrap_err();

        assert!(matches!(err.source, StepError::ModuleCycle { .. }));
        assert_eq!(driver.calls, vec!["screenshot"]);
        let run = tracker.get("TestA").unwrap();
        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.steps[0].action_type, "GETMODULE");
    }
}
