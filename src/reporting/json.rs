//! JSON persistence of an execution summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::core::models::{ExecutionStats, TestCaseRun};
use crate::core::tracker::ExecutionSummary;
use crate::infra::fs::write_report;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDocument<'a> {
    execution_date: String,
    timestamp: String,
    statistics: ExecutionStats,
    test_cases: &'a [TestCaseRun],
}

/// Serializes `summary` as the persisted JSON document.
/// `generated_at` becomes the `timestamp` field.
pub fn render_json(summary: &ExecutionSummary, generated_at: DateTime<Utc>) -> Result<String> {
    let document = SummaryDocument {
        execution_date: summary.execution_date_str(),
        timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        statistics: summary.stats(),
        test_cases: &summary.test_cases,
    };
    serde_json::to_string_pretty(&document).context("Failed to serialize execution summary")
}

/// Writes `execution-summary-<timestamp>.json` into `dir`.
///
/// 将 `execution-summary-<timestamp>.json` 写入 `dir`。
pub fn save_json(summary: &ExecutionSummary, dir: &Path, generated_at: DateTime<Utc>) -> Result<PathBuf> {
    let content = render_json(summary, generated_at)?;
    let file_name = format!("execution-summary-{}.json", file_timestamp(generated_at));
    write_report(dir, &file_name, &content)
}

/// ISO-8601 instant with `:` and `.` replaced, safe for file names.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{StepOutcome, StepRow};
    use crate::core::tracker::ExecutionTracker;
    use chrono::TimeZone;

    #[test]
    fn file_timestamp_has_no_separators() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(file_timestamp(at), "2025-03-04T05-06-07-000Z");
    }

    #[test]
    fn document_has_the_persisted_layout() {
        let mut tracker = ExecutionTracker::new();
        tracker.start_test_case("TestA").unwrap();
        tracker.record_step("TestA", StepOutcome::passed(&StepRow::new(1, "open", "OPENURL")));
        tracker.end_test_case("TestA");

        let at = Utc::now();
        let summary = tracker.snapshot();
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&summary, at).unwrap()).unwrap();
        assert_eq!(json["executionDate"], summary.execution_date_str());
        assert_eq!(json["statistics"]["totalSteps"], 1);
        assert_eq!(json["statistics"]["successRate"], "100.00");
        assert_eq!(json["testCases"][0]["testCaseName"], "TestA");
        assert_eq!(json["testCases"][0]["steps"][0]["actionType"], "OPENURL");
        assert_eq!(render_json(&summary, at).unwrap(), render_json(&summary, at).unwrap());
    }
}
