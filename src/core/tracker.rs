//! # Execution Tracker / 执行跟踪器
//!
//! Owns every `TestCaseRun` of a run and is the only place they are mutated.
//! The tracker is an explicitly passed value: the test-case loop owns it and
//! lends it to the dispatcher. It is not synchronized; do not share it across
//! parallel executors.
//!
//! 拥有一次运行中的所有 `TestCaseRun`，并且是唯一修改它们的地方。
//! 跟踪器是显式传递的值：测试用例循环拥有它并借给分发器。
//! 它没有同步机制；不要在并行执行器之间共享。

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::error::TrackerError;
use crate::core::models::{ExecutionStats, RunPhase, Status, StepOutcome, TestCaseRun};

#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    overall_start: DateTime<Utc>,
    runs: IndexMap<String, TestCaseRun>,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(overall_start: DateTime<Utc>) -> Self {
        Self {
            overall_start,
            runs: IndexMap::new(),
        }
    }

    pub fn overall_start(&self) -> DateTime<Utc> {
        self.overall_start
    }

    /// Creates the `Running` entry for `name`.
    /// Re-starting a name already seen in this run is rejected.
    pub fn start_test_case(&mut self, name: &str) -> Result<(), TrackerError> {
        if self.runs.contains_key(name) {
            return Err(TrackerError::DuplicateTestCase(name.to_string()));
        }
        debug!(test_case = name, "test case started");
        self.runs
            .insert(name.to_string(), TestCaseRun::start(name, Utc::now()));
        Ok(())
    }

    /// Appends `outcome` to the running entry for `name`.
    ///
    /// Steps outside a running test case are silently dropped. The first
    /// failing step fixes the failure fields; later steps still append.
    ///
    /// 不在运行中测试用例内的步骤会被静默丢弃。第一个失败步骤会固定失败字段；
    /// 之后的步骤仍会追加。
    pub fn record_step(&mut self, name: &str, outcome: StepOutcome) {
        let Some(run) = self
            .runs
            .get_mut(name)
            .filter(|run| run.phase == RunPhase::Running)
        else {
            warn!(test_case = name, step = outcome.step, "step recorded outside a running test case; ignored");
            return;
        };

        if outcome.status == Status::Failed && run.status == Status::Passed {
            run.status = Status::Failed;
            run.first_failure_step = Some(outcome.step);
            run.first_failure_message = outcome.error.clone();
        }
        run.steps.push(outcome);
    }

    /// Closes the entry for `name`. Calling it again overwrites the end time.
    pub fn end_test_case(&mut self, name: &str) {
        let Some(run) = self.runs.get_mut(name) else {
            warn!(test_case = name, "end of an untracked test case; ignored");
            return;
        };
        let end = Utc::now();
        run.end_time = Some(end);
        run.duration = Some((end - run.start_time).num_milliseconds().max(0) as u64);
        run.phase = RunPhase::Completed;
        debug!(test_case = name, status = %run.status, "test case completed");
    }

    pub fn get(&self, name: &str) -> Option<&TestCaseRun> {
        self.runs.get(name)
    }

    /// Runs in the order they were started.
    pub fn runs(&self) -> impl Iterator<Item = &TestCaseRun> {
        self.runs.values()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn stats(&self) -> ExecutionStats {
        ExecutionStats::compute(self.runs.values(), self.overall_start)
    }

    pub fn failed_count(&self) -> usize {
        self.runs().filter(|r| r.status.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Freezes the current state into a report input.
    pub fn snapshot(&self) -> ExecutionSummary {
        ExecutionSummary {
            overall_start_time: self.overall_start,
            execution_date: self.overall_start.date_naive(),
            test_cases: self.runs.values().cloned().collect(),
        }
    }
}

/// A closed copy of every run plus the fixed overall start time.
/// Statistics are derived on demand, never cached.
///
/// 所有运行记录的封闭副本以及固定的总体开始时间。统计数据按需派生，从不缓存。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub overall_start_time: DateTime<Utc>,
    pub execution_date: NaiveDate,
    pub test_cases: Vec<TestCaseRun>,
}

impl ExecutionSummary {
    pub fn stats(&self) -> ExecutionStats {
        ExecutionStats::compute(&self.test_cases, self.overall_start_time)
    }

    pub fn execution_date_str(&self) -> String {
        self.execution_date.format("%Y-%m-%d").to_string()
    }
}
