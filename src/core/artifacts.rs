//! # Screenshot Artifacts / 截图产物
//!
//! Storage interface for step screenshots and the directory layout shared
//! with the analytics pass:
//! `<root>/<YYYY-MM-DD>/<testCase>/[Module_<module>_]Step_<n>_<action>.png`.
//!
//! 步骤截图的存储接口，以及与分析流程共享的目录布局。

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Minimal byte store: write bytes at a path, list files under a path.
pub trait ArtifactStore: Send + Sync {
    fn store(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Lists every file below `path`, recursively, in a stable order.
    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Computes screenshot locations for one run.
///
/// 计算一次运行中的截图位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotLayout {
    root: PathBuf,
    date: NaiveDate,
}

impl ScreenshotLayout {
    pub fn new(root: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            root: root.into(),
            date,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `<root>/<YYYY-MM-DD>`
    pub fn date_dir(&self) -> PathBuf {
        self.root.join(self.date.format("%Y-%m-%d").to_string())
    }

    /// `<root>/<YYYY-MM-DD>/<testCase>`
    pub fn test_case_dir(&self, test_case: &str) -> PathBuf {
        self.date_dir().join(test_case)
    }

    pub fn step_path(
        &self,
        test_case: &str,
        module: Option<&str>,
        step: u32,
        action_type: &str,
    ) -> PathBuf {
        self.test_case_dir(test_case)
            .join(step_file_name(module, step, action_type))
    }
}

/// `Step_<n>_<action>.png`, prefixed with `Module_<module>_` for expanded steps.
pub fn step_file_name(module: Option<&str>, step: u32, action_type: &str) -> String {
    match module {
        Some(module) => format!("Module_{module}_Step_{step}_{action_type}.png"),
        None => format!("Step_{step}_{action_type}.png"),
    }
}
