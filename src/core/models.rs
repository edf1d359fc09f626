//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the grid runner:
//! declared step rows, immutable step outcomes, the mutable per-test-case run
//! record and the aggregate statistics derived from them.
//!
//! 此模块定义了整个表格运行器中使用的核心数据结构：
//! 声明的步骤行、不可变的步骤结果、可变的测试用例运行记录以及由它们派生的汇总统计。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One declared instruction row of a test case.
/// Rows are positionally ordered; their order is the execution order.
///
/// 测试用例中声明的一行指令。
/// 行按位置排序，其顺序即执行顺序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRow {
    /// 1-based step number. Not required to be unique, but used as a report key.
    /// 从 1 开始的步骤编号。不要求唯一，但用作报告键。
    pub step: u32,
    /// Free-text description shown in reports / 报告中显示的描述
    pub step_description: String,
    /// Case-sensitive action keyword / 区分大小写的动作关键字
    pub action_type: String,
    /// Locator strategy keyword, e.g. `getByRole` / 定位策略关键字
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_path_type: Option<String>,
    /// Locator argument / 定位参数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_path: Option<String>,
    /// Action input (URL, text, key, module name, ...) / 动作输入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<String>,
}

impl StepRow {
    /// Creates a row with only the mandatory fields set.
    pub fn new(step: u32, description: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            step,
            step_description: description.into(),
            action_type: action_type.into(),
            locator_path_type: None,
            locator_path: None,
            input_data: None,
        }
    }

    /// Sets the locator columns.
    pub fn with_locator(mut self, path_type: impl Into<String>, path: impl Into<String>) -> Self {
        self.locator_path_type = Some(path_type.into());
        self.locator_path = Some(path.into());
        self
    }

    /// Sets the input column.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input_data = Some(input.into());
        self
    }
}

/// Pass/fail status shared by steps and test cases.
/// 步骤和测试用例共享的通过/失败状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one executed step.
/// Once appended to a test case's step list it is never mutated.
///
/// 单个已执行步骤的不可变记录。
/// 一旦追加到测试用例的步骤列表中便不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: u32,
    pub step_description: String,
    pub action_type: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StepOutcome {
    /// Builds a passed outcome for `row`, stamped now.
    pub fn passed(row: &StepRow) -> Self {
        Self::from_row(row, Status::Passed, None)
    }

    /// Builds a failed outcome for `row` carrying `error`, stamped now.
    pub fn failed(row: &StepRow, error: impl Into<String>) -> Self {
        Self::from_row(row, Status::Failed, Some(error.into()))
    }

    fn from_row(row: &StepRow, status: Status, error: Option<String>) -> Self {
        Self {
            step: row.step,
            step_description: row.step_description.clone(),
            action_type: row.action_type.clone(),
            status,
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Lifecycle of a tracked test case: `NotStarted -> Running -> Completed`.
/// `NotStarted` is represented by the absence of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Completed,
}

/// Mutable aggregate for one test case, owned exclusively by the execution tracker.
/// The serialized field names are consumed by downstream analytics and must stay stable.
///
/// 单个测试用例的可变聚合，由执行跟踪器独占。
/// 序列化字段名被下游分析工具使用，必须保持稳定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRun {
    #[serde(rename = "testCaseName")]
    pub name: String,
    pub status: Status,
    pub steps: Vec<StepOutcome>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in milliseconds / 持续时间（毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(rename = "errorStep", default, skip_serializing_if = "Option::is_none")]
    pub first_failure_step: Option<u32>,
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub first_failure_message: Option<String>,
    #[serde(skip, default = "completed_phase")]
    pub(crate) phase: RunPhase,
}

fn completed_phase() -> RunPhase {
    RunPhase::Completed
}

impl TestCaseRun {
    pub(crate) fn start(name: &str, at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Passed,
            steps: Vec::new(),
            start_time: at,
            end_time: None,
            duration: None,
            first_failure_step: None,
            first_failure_message: None,
            phase: RunPhase::Running,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status == Status::Passed).count()
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status == Status::Failed).count()
    }

    pub fn failed_step_outcomes(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.status.is_failed())
    }

    /// Latest instant this run is known to have been active.
    pub(crate) fn last_activity(&self) -> DateTime<Utc> {
        let last_step = self.steps.last().map(|s| s.timestamp);
        [Some(self.start_time), self.end_time, last_step]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(self.start_time)
    }
}

/// Aggregate statistics, always derived on demand from the tracked runs.
/// 汇总统计，总是按需从跟踪的运行记录中派生。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_test_cases: usize,
    pub passed_test_cases: usize,
    pub failed_test_cases: usize,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    /// Percentage of passed steps with two decimals, or `"0"` when no step ran.
    pub success_rate: String,
    /// Human readable run duration, e.g. `"1m 5s"`.
    pub duration: String,
    pub duration_ms: u64,
}

impl ExecutionStats {
    /// Computes statistics over `runs` for a run that began at `overall_start`.
    pub fn compute<'a>(
        runs: impl IntoIterator<Item = &'a TestCaseRun>,
        overall_start: DateTime<Utc>,
    ) -> Self {
        let mut stats = ExecutionStats {
            total_test_cases: 0,
            passed_test_cases: 0,
            failed_test_cases: 0,
            total_steps: 0,
            passed_steps: 0,
            failed_steps: 0,
            success_rate: String::new(),
            duration: String::new(),
            duration_ms: 0,
        };
        let mut last_activity = overall_start;

        for run in runs {
            stats.total_test_cases += 1;
            match run.status {
                Status::Passed => stats.passed_test_cases += 1,
                Status::Failed => stats.failed_test_cases += 1,
            }
            stats.total_steps += run.steps.len();
            stats.passed_steps += run.passed_steps();
            last_activity = last_activity.max(run.last_activity());
        }
        stats.failed_steps = stats.total_steps - stats.passed_steps;
        stats.success_rate = percentage(stats.passed_steps, stats.total_steps);
        stats.duration_ms = (last_activity - overall_start).num_milliseconds().max(0) as u64;
        stats.duration = format_duration(stats.duration_ms);
        stats
    }

    pub fn has_failures(&self) -> bool {
        self.failed_test_cases > 0
    }
}

/// Formats `part / total` as a percentage with two decimals, `"0"` for an empty total.
pub fn percentage(part: usize, total: usize) -> String {
    if total == 0 {
        "0".to_string()
    } else {
        format!("{:.2}", part as f64 / total as f64 * 100.0)
    }
}

/// Formats milliseconds as `"Xm Ys"` or `"Ys"`.
/// 将毫秒格式化为 `"Xm Ys"` 或 `"Ys"`。
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {remaining}s")
    } else {
        format!("{seconds}s")
    }
}
