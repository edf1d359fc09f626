//! # Runner Configuration / 运行器配置
//!
//! `GridRunner.toml` layout. Every field has a default, so an empty file is a
//! valid configuration.
//!
//! `GridRunner.toml` 的结构。每个字段都有默认值，因此空文件也是有效配置。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dispatcher::DispatchOptions;

pub const DEFAULT_CONFIG_FILE: &str = "GridRunner.toml";

/// Top-level runner configuration.
/// 顶层运行器配置。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Output language (`"en"`, `"zh-CN"`). Empty means "detect from the system".
    /// 输出语言。为空表示从系统检测。
    pub language: String,
    /// Path of the workbook (`.toml` or `.json`) holding the sheets.
    /// 包含工作表的工作簿路径（`.toml` 或 `.json`）。
    pub workbook: String,
    /// Only sheets whose name starts with this prefix are test cases.
    /// 只有名称以此前缀开头的工作表才是测试用例。
    pub sheet_prefix: String,
    /// Name of the sheet holding module blocks.
    /// 包含模块块的工作表名称。
    pub module_sheet: String,
    /// Root of the screenshot tree / 截图树的根目录
    pub screenshot_dir: String,
    /// Directory receiving the JSON and HTML summaries / 接收 JSON 和 HTML 摘要的目录
    pub summary_dir: String,
    /// Directory receiving the analytics report / 接收分析报告的目录
    pub analytics_dir: String,
    pub browser: BrowserConfig,
    pub execution: ExecutionConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            language: String::new(),
            workbook: "tests/TestTemplate.toml".to_string(),
            sheet_prefix: "Test".to_string(),
            module_sheet: "Module".to_string(),
            screenshot_dir: "screenshots".to_string(),
            summary_dir: "report-summary/summaries".to_string(),
            analytics_dir: "report-summary/reports".to_string(),
            browser: BrowserConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

/// WebDriver connection settings / WebDriver 连接设置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Endpoint of a running WebDriver server (chromedriver, geckodriver, ...).
    pub webdriver_url: String,
    /// W3C `browserName` capability.
    pub browser: String,
    pub headless: bool,
    /// Implicit element wait in milliseconds.
    pub implicit_wait_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: false,
            implicit_wait_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout of `ValidateElementtobeVisible`.
    pub visible_timeout_ms: u64,
    /// Driver default timeout used by the other assertions.
    pub assertion_timeout_ms: u64,
    pub max_module_depth: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            visible_timeout_ms: 5000,
            assertion_timeout_ms: 5000,
            max_module_depth: 16,
        }
    }
}

impl ExecutionConfig {
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            visible_timeout: Duration::from_millis(self.visible_timeout_ms),
            assertion_timeout: None,
            max_module_depth: self.max_module_depth,
        }
    }
}

/// Values given on the command line; each `Some` wins over the file.
/// 命令行给出的值；每个 `Some` 都优先于文件中的值。
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub language: Option<String>,
    pub workbook: Option<String>,
    pub sheet_prefix: Option<String>,
    pub screenshot_dir: Option<String>,
    pub summary_dir: Option<String>,
    pub webdriver_url: Option<String>,
    pub headless: bool,
}

impl RunnerConfig {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            language,
            workbook,
            sheet_prefix,
            screenshot_dir,
            summary_dir,
            webdriver_url,
            headless,
        } = overrides;

        if let Some(v) = language {
            self.language = v;
        }
        if let Some(v) = workbook {
            self.workbook = v;
        }
        if let Some(v) = sheet_prefix {
            self.sheet_prefix = v;
        }
        if let Some(v) = screenshot_dir {
            self.screenshot_dir = v;
        }
        if let Some(v) = summary_dir {
            self.summary_dir = v;
        }
        if let Some(v) = webdriver_url {
            self.browser.webdriver_url = v;
        }
        self.browser.headless |= headless;
    }

    pub fn workbook_path(&self) -> Result<PathBuf> {
        expand_path(&self.workbook)
    }

    pub fn screenshot_root(&self) -> Result<PathBuf> {
        expand_path(&self.screenshot_dir)
    }

    pub fn summary_root(&self) -> Result<PathBuf> {
        expand_path(&self.summary_dir)
    }

    pub fn analytics_root(&self) -> Result<PathBuf> {
        expand_path(&self.analytics_dir)
    }
}

/// Loads a configuration file. A missing file yields the defaults.
///
/// 加载配置文件。文件不存在时返回默认配置。
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(RunnerConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Expands `~` and environment variables in `raw`.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
