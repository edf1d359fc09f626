//! # Error Types / 错误类型
//!
//! Semantic error enums for conditions a caller might inspect. Opaque
//! `anyhow::Error` is reserved for the command boundary.
//!
//! 调用方可能检查的语义错误枚举。不透明的 `anyhow::Error` 仅用于命令边界。

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a browser driver implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("no element matches {locator}")]
    NoSuchElement { locator: String },

    #[error("the page has been closed")]
    PageClosed,

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("webdriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Everything that can go wrong while interpreting a single step.
///
/// 解释单个步骤时可能出现的所有错误。
#[derive(Debug, Error)]
pub enum StepError {
    #[error("unsupported locator strategy '{raw}' (supported: {supported})")]
    UnsupportedLocatorStrategy { raw: String, supported: String },

    #[error("unsupported action type '{received}' (available: {available})")]
    UnsupportedActionType { received: String, available: String },

    #[error("module '{name}' not found (available modules: {available})")]
    ModuleNotFound { name: String, available: String },

    #[error("module '{name}' has a start marker but no matching '{name}_End' marker")]
    ModuleUnterminated { name: String },

    #[error("module '{name}' is malformed: start marker at row {start} is not before end marker at row {end}")]
    ModuleMalformed { name: String, start: usize, end: usize },

    #[error("module '{name}' contains no steps between its markers")]
    ModuleEmpty { name: String },

    #[error("module reference cycle detected: {chain}")]
    ModuleCycle { chain: String },

    #[error("module expansion of '{name}' exceeds the maximum depth of {max_depth}")]
    ModuleDepthExceeded { name: String, max_depth: usize },

    #[error("missing required field '{field}' for action '{action}'")]
    MissingRequiredField { field: &'static str, action: String },

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidInputData {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    DriverOperationFailed(#[from] DriverError),

    #[error("failed to store artifact at {path}: {message}")]
    Artifact { path: PathBuf, message: String },
}

/// A step-level error annotated with the offending step.
///
/// 附带出错步骤信息的步骤级错误。
#[derive(Debug, Error)]
#[error("step {step} ({action_type}) failed: {source}")]
pub struct StepFailure {
    pub step: u32,
    pub action_type: String,
    #[source]
    pub source: StepError,
}

impl StepFailure {
    pub fn new(step: u32, action_type: impl Into<String>, source: StepError) -> Self {
        Self {
            step,
            action_type: action_type.into(),
            source,
        }
    }
}

/// Violations of the tracker contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("test case '{0}' has already been started in this run")]
    DuplicateTestCase(String),
}

/// Why a single test case stopped early. Never aborts the other test cases.
#[derive(Debug, Error)]
pub enum TestCaseError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Step(#[from] StepFailure),

    #[error("browser page could not be prepared: {0}")]
    Prepare(DriverError),
}

/// Fatal startup-phase errors. Any of these aborts the run before a test case starts.
///
/// 致命的启动阶段错误。任何一个都会在测试用例开始之前中止运行。
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no test cases found matching filter '{prefix}'. Available sheets: {available}")]
    NoTestCases { prefix: String, available: String },

    #[error("sheet '{0}' does not exist in the workbook")]
    MissingSheet(String),

    #[error("sheet name '{0}' appears more than once in the workbook")]
    DuplicateSheet(String),

    #[error("no test steps found in sheet '{0}'; the sheet is empty or missing data")]
    EmptySheet(String),

    #[error("sheet '{sheet}' row {row}: missing required column '{column}'")]
    MissingColumn {
        sheet: String,
        row: usize,
        column: &'static str,
    },

    #[error("sheet '{sheet}' row {row}: {reason}")]
    InvalidRow {
        sheet: String,
        row: usize,
        reason: String,
    },
}
