//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders the execution summary as a standalone HTML page: stat cards, one
//! panel per test case and a step table linking each step to its screenshot.
//! Links are relative to the summary directory so the report keeps working
//! when the output tree is moved as a whole.
//!
//! 将执行摘要渲染为独立的 HTML 页面：统计卡片、每个测试用例一个面板，以及将每个步骤
//! 链接到其截图的步骤表。链接相对于摘要目录。

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::core::artifacts::ScreenshotLayout;
use crate::core::models::{Status, StepOutcome, TestCaseRun, format_duration};
use crate::core::tracker::ExecutionSummary;
use crate::infra::fs::{relative_to, write_report};
use crate::infra::t;
use crate::reporting::json::file_timestamp;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
pub(crate) const HTML_STYLE: &str = include_str!("assets/report.css");

/// Renders `summary`. `summary_dir` is where the page will live and
/// `layout` says where the screenshots of this run are.
///
/// 渲染 `summary`。`summary_dir` 是页面所在目录，`layout` 指明本次运行截图的位置。
pub fn render_html(summary: &ExecutionSummary, layout: &ScreenshotLayout, summary_dir: &Path) -> String {
    let stats = summary.stats();
    let date = summary.execution_date_str();

    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (t!("html_report.title", date = &date)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                div.container {
                    div.header {
                        h1 { (t!("html_report.main_header")) }
                        p { (t!("summary.execution_date", date = &date)) }
                        p { (t!("summary.duration", duration = &stats.duration)) }
                    }
                    div.stats {
                        (stat_card(stats.total_test_cases, &t!("html_report.summary.total_cases"), ""))
                        (stat_card(stats.passed_test_cases, &t!("html_report.summary.passed"), "passed-text"))
                        (stat_card(stats.failed_test_cases, &t!("html_report.summary.failed"), "failed-text"))
                        (stat_card(stats.total_steps, &t!("html_report.summary.total_steps"), ""))
                        (stat_card(format!("{}%", stats.success_rate), &t!("html_report.summary.success_rate"), ""))
                    }
                    div.section {
                        h2 { (t!("html_report.details")) }
                        @for run in &summary.test_cases {
                            (test_case_section(run, layout, summary_dir))
                        }
                    }
                }
            }
        }
    };
    page.into_string()
}

fn stat_card(value: impl ToString, label: &str, class: &str) -> Markup {
    let value = value.to_string();
    html! {
        div.stat-card {
            div class={ "stat-value " (class) } { (value) }
            div.stat-label { (label) }
        }
    }
}

fn test_case_section(run: &TestCaseRun, layout: &ScreenshotLayout, summary_dir: &Path) -> Markup {
    let status = run.status.as_str();
    let folder = link(&layout.test_case_dir(&run.name), summary_dir);
    let duration = run
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "N/A".to_string());

    html! {
        div class={ "test-case " (status) } {
            div.test-case-header {
                div.test-case-name { (run.name) }
                div class={ "status-badge status-" (status) } { (status.to_uppercase()) }
            }
            div.test-case-body {
                p { strong { (t!("html_report.duration")) } " " (duration) }
                p {
                    strong { (t!("html_report.steps")) } " "
                    (run.steps.len()) " (✅ " (run.passed_steps()) " / ❌ " (run.failed_steps()) ")"
                }
                a.folder-link href={ (folder) "/" } target="_blank" { (t!("html_report.screenshots_folder")) }
                @if run.status == Status::Failed {
                    div.error-message {
                        strong { (t!("html_report.failed_at", step = run.first_failure_step.unwrap_or_default())) }
                        br;
                        (run.first_failure_message.clone().unwrap_or_else(|| t!("html_report.no_error_message").to_string()))
                    }
                }
                table.steps-table {
                    thead {
                        tr {
                            th { (t!("html_report.table.step")) }
                            th { (t!("html_report.table.action")) }
                            th { (t!("html_report.table.description")) }
                            th { (t!("html_report.table.screenshot")) }
                            th { (t!("html_report.table.status")) }
                        }
                    }
                    tbody {
                        @for step in &run.steps {
                            (step_row(step, &run.name, layout, summary_dir))
                        }
                    }
                }
            }
        }
    }
}

fn step_row(step: &StepOutcome, test_case: &str, layout: &ScreenshotLayout, summary_dir: &Path) -> Markup {
    let status = step.status.as_str();
    let shot = layout.step_path(
        test_case,
        module_of(&step.step_description),
        step.step,
        &step.action_type,
    );
    html! {
        tr class=(status) {
            td { (step.step) }
            td { span.action-badge { (step.action_type) } }
            td {
                (step.step_description)
                @if let Some(error) = &step.error {
                    div.error-message { strong { (t!("html_report.error")) } " " (error) }
                }
            }
            td { a.screenshot-link href=(link(&shot, summary_dir)) target="_blank" { (t!("html_report.view")) } }
            td {
                span class={ "status-icon-" (status) } {
                    @if step.status == Status::Passed { "✓" } @else { "✗" }
                }
            }
        }
    }
}

/// Innermost module of an expanded step, read from its `[Module: <name>]` prefix.
pub fn module_of(description: &str) -> Option<&str> {
    let rest = description.strip_prefix("[Module: ")?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

fn link(target: &Path, summary_dir: &Path) -> String {
    relative_to(target, summary_dir)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Writes `execution-summary-<timestamp>.html` into `dir`.
///
/// 将 `execution-summary-<timestamp>.html` 写入 `dir`。
pub fn save_html(
    summary: &ExecutionSummary,
    layout: &ScreenshotLayout,
    dir: &Path,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let content = render_html(summary, layout, dir);
    let file_name = format!("execution-summary-{}.html", file_timestamp(generated_at));
    write_report(dir, &file_name, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::StepRow;
    use crate::core::tracker::ExecutionTracker;

    #[test]
    fn module_prefix_is_read_from_the_description() {
        assert_eq!(module_of("[Module: Login] type user"), Some("Login"));
        assert_eq!(module_of("[Module: Inner] [Module: Outer] x"), Some("Inner"));
        assert_eq!(module_of("type user"), None);
    }

    #[test]
    fn links_point_into_the_screenshot_tree() {
        rust_i18n::set_locale("en");
        let mut tracker = ExecutionTracker::new();
        tracker.start_test_case("TestLogin").unwrap();
        tracker.record_step("TestLogin", StepOutcome::passed(&StepRow::new(1, "open", "OPENURL")));
        tracker.record_step(
            "TestLogin",
            StepOutcome::failed(&StepRow::new(2, "[Module: Login] <user>", "FILL"), "boom"),
        );
        tracker.end_test_case("TestLogin");
        let summary = tracker.snapshot();
        let date = summary.execution_date_str();
        let layout = ScreenshotLayout::new("screenshots", summary.execution_date);

        let page = render_html(&summary, &layout, Path::new("report-summary/summaries"));
        assert!(page.contains(&format!(
            "../../screenshots/{date}/TestLogin/Step_1_OPENURL.png"
        )));
        assert!(page.contains(&format!(
            "../../screenshots/{date}/TestLogin/Module_Login_Step_2_FILL.png"
        )));
        assert!(page.contains("&lt;user&gt;"));
        assert_eq!(page, render_html(&summary, &layout, Path::new("report-summary/summaries")));
    }
}
