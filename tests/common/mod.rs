// Shared test helpers for integration tests
#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use grid_runner::config::RunnerConfig;
use grid_runner::core::action::{Assertion, ElementOp};
use grid_runner::core::artifacts::{ArtifactStore, ScreenshotLayout};
use grid_runner::core::dispatcher::{DispatchContext, DispatchOptions};
use grid_runner::core::driver::BrowserDriver;
use grid_runner::core::error::DriverError;
use grid_runner::core::locator::Locator;
use grid_runner::core::modules::ModuleTable;
use grid_runner::infra::workbook::Workbook;
use tempfile::TempDir;

/// A driver that records every primitive it receives and fails on demand.
#[derive(Default)]
pub struct RecordingDriver {
    pub calls: Vec<String>,
    /// The n-th (1-based) element interaction fails with `NoSuchElement`.
    pub fail_element_call: Option<usize>,
    pub fail_prepare: bool,
    element_calls: usize,
}

impl RecordingDriver {
    pub fn failing_on_element_call(n: usize) -> Self {
        Self {
            fail_element_call: Some(n),
            ..Self::default()
        }
    }

    pub fn failing_prepare() -> Self {
        Self {
            fail_prepare: true,
            ..Self::default()
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == name).count()
    }

    fn element(&mut self, name: String, locator: &Locator) -> Result<(), DriverError> {
        self.calls.push(name);
        self.element_calls += 1;
        if self.fail_element_call == Some(self.element_calls) {
            return Err(DriverError::NoSuchElement {
                locator: locator.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    async fn prepare(&mut self) -> Result<(), DriverError> {
        self.calls.push("prepare".into());
        if self.fail_prepare {
            return Err(DriverError::PageClosed);
        }
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.calls.push(format!("goto {url}"));
        Ok(())
    }

    async fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.calls.push(format!("wait {}", duration.as_millis()));
        Ok(())
    }

    async fn close_page(&mut self) -> Result<(), DriverError> {
        self.calls.push("close_page".into());
        Ok(())
    }

    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.calls
            .push(if full_page { "screenshot_full" } else { "screenshot" }.into());
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn perform(&mut self, locator: &Locator, op: &ElementOp) -> Result<(), DriverError> {
        let name = match op {
            ElementOp::Click => "click".to_string(),
            ElementOp::Fill(text) => format!("fill {text}"),
            other => format!("{other:?}").to_lowercase(),
        };
        self.element(name, locator)
    }

    async fn check(
        &mut self,
        locator: &Locator,
        assertion: Assertion,
        _timeout: Option<Duration>,
    ) -> Result<(), DriverError> {
        self.element(format!("check {assertion:?}"), locator)
    }
}

/// Keeps stored artifacts in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub files: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
    pub fn stored(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn store(&self, path: &Path, _bytes: &[u8]) -> io::Result<()> {
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        files.sort();
        Ok(files)
    }
}

pub fn workbook(toml: &str) -> Workbook {
    Workbook::from_toml_str(toml).expect("test workbook must parse")
}

pub fn layout() -> ScreenshotLayout {
    ScreenshotLayout::new("shots", NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
}

pub fn context<'a>(
    store: &'a MemoryStore,
    modules: &'a ModuleTable,
    layout: &'a ScreenshotLayout,
) -> DispatchContext<'a> {
    DispatchContext {
        artifacts: store,
        modules,
        layout,
        options: DispatchOptions::default(),
    }
}

/// A configuration whose output directories all live in `dir`.
pub fn config_in(dir: &TempDir) -> RunnerConfig {
    let root = dir.path().display().to_string();
    RunnerConfig {
        language: "en".into(),
        workbook: format!("{root}/workbook.toml"),
        screenshot_dir: format!("{root}/screenshots"),
        summary_dir: format!("{root}/report-summary"),
        analytics_dir: format!("{root}/report-summary/reports"),
        ..RunnerConfig::default()
    }
}

/// Login module plus three test-case sheets, one of which fails on its second row
/// when the driver is told to fail the second element interaction.
pub const LOGIN_WORKBOOK: &str = r##"
[[sheet]]
name = "Module"
rows = [
  { MODULENAME = "Login_Start" },
  { STEP = 1, STEPDESCRIPTION = "Enter user", ACTIONTYPE = "FILL", LOCATORPATHTYPE = "getByLabel", LOCATORPATH = "Username", INPUTDATA = "tom" },
  { STEP = 2, STEPDESCRIPTION = "Press login", ACTIONTYPE = "CLICKBUTTON", LOCATORPATHTYPE = "getByRole", LOCATORPATH = "button" },
  { MODULENAME = "Login_End" },
]

[[sheet]]
name = "TestLogin"
rows = [
  { STEP = 1, STEPDESCRIPTION = "Log in", ACTIONTYPE = "GETMODULE", INPUTDATA = "Login" },
]

[[sheet]]
name = "Setup"
rows = [
  { STEP = 1, STEPDESCRIPTION = "Not a test case", ACTIONTYPE = "OPENURL", INPUTDATA = "https://example.com" },
]

[[sheet]]
name = "TestCheckout"
rows = [
  { STEP = 1, STEPDESCRIPTION = "Open shop", ACTIONTYPE = "OPENURL", INPUTDATA = "https://shop.example.com" },
  { STEP = 2, STEPDESCRIPTION = "Add to cart", ACTIONTYPE = "CLICKBUTTON", LOCATORPATHTYPE = "locator", LOCATORPATH = "#add" },
  { STEP = 3, STEPDESCRIPTION = "Cart badge visible", ACTIONTYPE = "ValidateElementtobeVisible", LOCATORPATHTYPE = "locator", LOCATORPATH = "#badge" },
]
"##;
