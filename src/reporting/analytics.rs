//! # Screenshot Analytics / 截图分析
//!
//! Rebuilds past executions from the screenshot tree alone:
//! `<root>/<YYYY-MM-DD>/<testCase>/[Module_<m>_]Step_<n>_<action>.png`.
//!
//! A screenshot only proves that a step ran, not how it ended, so every
//! reconstructed step counts as a success. Descriptions are filled in from
//! the workbook when one is available.
//!
//! 仅根据截图树重建过去的执行。截图只能证明步骤运行过，不能证明其结果，
//! 因此每个重建的步骤都计为成功。如果有工作簿，则从中补充步骤描述。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::core::artifacts::ArtifactStore;
use crate::core::models::StepRow;
use crate::core::modules::ModuleTable;
use crate::core::source::StepSource;
use crate::infra::fs::write_report;
use crate::infra::t;
use crate::reporting::html::HTML_STYLE;

static DATE_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static SCREENSHOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Module_(.+)_)?Step_(\d+)_(.+)\.png$").expect("valid screenshot regex")
});

pub const ANALYTICS_REPORT_FILE: &str = "analytics-report.html";
const TOP_ACTIONS: usize = 10;
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAnalytics {
    pub step: u32,
    pub step_description: String,
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Always `"success"`; see the module docs.
    pub status: &'static str,
    pub screenshot_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseAnalytics {
    pub test_case_name: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub success_rate: f64,
    pub steps: Vec<StepAnalytics>,
}

impl TestCaseAnalytics {
    pub fn passed(&self) -> bool {
        self.failed_steps == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionUsage {
    pub action: String,
    pub count: usize,
}

/// Everything reconstructed for one execution date.
/// 一个执行日期重建出的全部信息。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionAnalytics {
    pub execution_date: String,
    pub total_test_cases: usize,
    pub passed_test_cases: usize,
    pub failed_test_cases: usize,
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub overall_success_rate: f64,
    pub test_cases: Vec<TestCaseAnalytics>,
    /// Action keyword to screenshot count, in first-seen order.
    pub action_type_distribution: IndexMap<String, usize>,
    pub most_used_actions: Vec<ActionUsage>,
}

/// Looks up declared step descriptions in a workbook.
pub struct DescriptionLookup<'a> {
    source: &'a dyn StepSource,
    modules: ModuleTable,
}

impl<'a> DescriptionLookup<'a> {
    /// A missing or unreadable module sheet leaves module steps without descriptions.
    pub fn new(source: &'a dyn StepSource, module_sheet: &str) -> Self {
        let modules = source.module_table(module_sheet).unwrap_or_default();
        Self { source, modules }
    }

    fn describe(&self, test_case: &str, module: Option<&str>, step: u32) -> Option<String> {
        let rows: Vec<StepRow> = match module {
            Some(module) => self.modules.expand(module).ok()?,
            None => self.source.test_steps(test_case).ok()?,
        };
        rows.into_iter()
            .find(|row| row.step == step)
            .map(|row| row.step_description)
    }
}

struct ParsedShot {
    date: String,
    test_case: String,
    module: Option<String>,
    step: u32,
    action: String,
    path: PathBuf,
}

/// Splits `path` (below `root`) into its date, test case and step parts.
/// Anything not matching the layout yields `None`.
fn parse_screenshot(root: &Path, path: &Path) -> Option<ParsedShot> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    let [date, test_case, file] = parts.as_slice() else {
        return None;
    };
    if !DATE_DIR.is_match(date) {
        return None;
    }
    let caps = SCREENSHOT.captures(file)?;
    Some(ParsedShot {
        date: date.to_string(),
        test_case: test_case.to_string(),
        module: caps.get(1).map(|m| m.as_str().to_string()),
        step: caps[2].parse().ok()?,
        action: caps[3].to_string(),
        path: path.to_path_buf(),
    })
}

/// Reconstructs every execution under `root`, oldest date first.
///
/// 重建 `root` 下的每次执行，按日期从旧到新排序。
pub fn analyze_executions(
    store: &dyn ArtifactStore,
    root: &Path,
    lookup: Option<&DescriptionLookup<'_>>,
) -> Result<Vec<ExecutionAnalytics>> {
    let files = store
        .list(root)
        .with_context(|| format!("Failed to list screenshots under {}", root.display()))?;

    // date -> test case -> steps
    let mut tree: BTreeMap<String, BTreeMap<String, Vec<StepAnalytics>>> = BTreeMap::new();
    for shot in files.iter().filter_map(|p| parse_screenshot(root, p)) {
        let description = lookup
            .and_then(|l| l.describe(&shot.test_case, shot.module.as_deref(), shot.step))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        tree.entry(shot.date)
            .or_default()
            .entry(shot.test_case)
            .or_default()
            .push(StepAnalytics {
                step: shot.step,
                step_description: description,
                action_type: shot.action,
                module: shot.module,
                status: "success",
                screenshot_path: shot.path,
            });
    }
    debug!(dates = tree.len(), files = files.len(), "screenshot tree scanned");

    Ok(tree
        .into_iter()
        .map(|(date, cases)| build_execution(date, cases))
        .collect())
}

fn build_execution(date: String, cases: BTreeMap<String, Vec<StepAnalytics>>) -> ExecutionAnalytics {
    let mut distribution: IndexMap<String, usize> = IndexMap::new();
    let test_cases: Vec<TestCaseAnalytics> = cases
        .into_iter()
        .map(|(name, mut steps)| {
            steps.sort_by(|a, b| (a.step, &a.module).cmp(&(b.step, &b.module)));
            for step in &steps {
                *distribution.entry(step.action_type.clone()).or_default() += 1;
            }
            let total_steps = steps.len();
            let completed_steps = steps.iter().filter(|s| s.status == "success").count();
            TestCaseAnalytics {
                test_case_name: name,
                total_steps,
                completed_steps,
                failed_steps: total_steps - completed_steps,
                success_rate: rate(completed_steps, total_steps),
                steps,
            }
        })
        .collect();

    let total_steps: usize = test_cases.iter().map(|tc| tc.total_steps).sum();
    let successful_steps: usize = test_cases.iter().map(|tc| tc.completed_steps).sum();
    let passed_test_cases = test_cases.iter().filter(|tc| tc.passed()).count();

    ExecutionAnalytics {
        execution_date: date,
        total_test_cases: test_cases.len(),
        passed_test_cases,
        failed_test_cases: test_cases.len() - passed_test_cases,
        total_steps,
        successful_steps,
        failed_steps: total_steps - successful_steps,
        overall_success_rate: rate(successful_steps, total_steps),
        most_used_actions: most_used(&distribution, TOP_ACTIONS),
        action_type_distribution: distribution,
        test_cases,
    }
}

/// The `limit` most frequent actions; ties keep first-seen order.
pub fn most_used(distribution: &IndexMap<String, usize>, limit: usize) -> Vec<ActionUsage> {
    let mut usage: Vec<ActionUsage> = distribution
        .iter()
        .map(|(action, &count)| ActionUsage {
            action: action.clone(),
            count,
        })
        .collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count));
    usage.truncate(limit);
    usage
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Renders the report for the latest execution in `executions`.
pub fn render_analytics_html(executions: &[ExecutionAnalytics], generated_at: DateTime<Utc>) -> Result<String> {
    let Some(latest) = executions.last() else {
        bail!(t!("analyze.no_executions").to_string());
    };
    let share = |n: usize| format!("{:.1}", rate(n, latest.total_test_cases));
    let max_usage = latest.most_used_actions.first().map_or(1, |a| a.count.max(1));

    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (t!("analytics.title")) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                div.container {
                    div.header {
                        h1 { (t!("analytics.title")) }
                        p { (t!("analytics.subtitle")) }
                        p { (t!("analytics.latest", date = &latest.execution_date)) }
                    }
                    div.stats {
                        (card(latest.total_test_cases.to_string(), &t!("analytics.total_cases"), String::new(), ""))
                        (card(latest.passed_test_cases.to_string(), &t!("analytics.passed_cases"),
                              t!("analytics.success_share", share = share(latest.passed_test_cases)).to_string(), "passed-text"))
                        (card(latest.failed_test_cases.to_string(), &t!("analytics.failed_cases"),
                              t!("analytics.failure_share", share = share(latest.failed_test_cases)).to_string(), "failed-text"))
                        (card(latest.total_steps.to_string(), &t!("analytics.total_steps"), String::new(), ""))
                        (card(latest.successful_steps.to_string(), &t!("analytics.successful_steps"), String::new(), "passed-text"))
                        (card(format!("{:.1}%", latest.overall_success_rate), &t!("analytics.success_rate"), String::new(), ""))
                    }
                    div.section {
                        h2 { (t!("analytics.top_actions")) }
                        table.steps-table {
                            tbody {
                                @for usage in &latest.most_used_actions {
                                    tr {
                                        td { span.action-badge { (usage.action) } }
                                        td style="width: 60%" {
                                            div.bar {
                                                div.bar-fill style={ "width: " (usage.count * 100 / max_usage) "%" } {}
                                            }
                                        }
                                        td { (usage.count) }
                                    }
                                }
                            }
                        }
                    }
                    div.section {
                        h2 { (t!("analytics.details")) }
                        @for tc in &latest.test_cases {
                            (test_case_card(tc))
                        }
                    }
                    div.footer {
                        p { (t!("analytics.generated_on", at = generated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"))) }
                        p { (t!("analytics.executions_analyzed", count = executions.len())) }
                    }
                }
            }
        }
    };
    Ok(page.into_string())
}

fn card(value: String, label: &str, subtitle: String, class: &str) -> Markup {
    html! {
        div.stat-card {
            div.stat-label { (label) }
            div class={ "stat-value " (class) } { (value) }
            @if !subtitle.is_empty() {
                div.stat-label { (subtitle) }
            }
        }
    }
}

fn test_case_card(tc: &TestCaseAnalytics) -> Markup {
    let status = if tc.passed() { "passed" } else { "failed" };
    html! {
        div class={ "test-case " (status) } {
            div.test-case-header {
                div.test-case-name { (tc.test_case_name) }
                div class={ "status-badge status-" (status) } { (status.to_uppercase()) }
            }
            div.test-case-body {
                p {
                    (t!("analytics.case_counts",
                        total = tc.total_steps,
                        completed = tc.completed_steps,
                        failed = tc.failed_steps,
                        rate = format!("{:.1}", tc.success_rate)))
                }
                div.bar { div.bar-fill style={ "width: " (format!("{:.1}", tc.success_rate)) "%" } {} }
                table.steps-table {
                    thead {
                        tr {
                            th { (t!("html_report.table.step")) }
                            th { (t!("html_report.table.description")) }
                            th { (t!("html_report.table.action")) }
                            th { (t!("html_report.table.status")) }
                        }
                    }
                    tbody {
                        @for step in &tc.steps {
                            tr.passed {
                                td { strong { "#" (step.step) } }
                                td {
                                    @if let Some(module) = &step.module {
                                        "[" (module) "] "
                                    }
                                    (step.step_description)
                                }
                                td { span.action-badge { (step.action_type) } }
                                td { span.status-icon-passed { "✓" } " " (t!("analytics.success")) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Analyzes `root` and writes the report into `out_dir`.
///
/// 分析 `root` 并将报告写入 `out_dir`。
pub fn generate_analytics_report(
    store: &dyn ArtifactStore,
    root: &Path,
    lookup: Option<&DescriptionLookup<'_>>,
    out_dir: &Path,
) -> Result<(PathBuf, Vec<ExecutionAnalytics>)> {
    let executions = analyze_executions(store, root, lookup)?;
    let content = render_analytics_html(&executions, Utc::now())?;
    let path = write_report(out_dir, ANALYTICS_REPORT_FILE, &content)?;
    Ok((path, executions))
}
