//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the boxed end-of-run summary: overall statistics, one panel per
//! test case with its first failure and failed steps, and a final banner.
//!
//! 打印带边框的运行结束摘要：总体统计、每个测试用例一个面板（包含首次失败和失败步骤），
//! 以及最终横幅。

use colored::*;

use crate::core::models::{ExecutionStats, Status, TestCaseRun, format_duration};
use crate::core::tracker::ExecutionSummary;
use crate::infra::t;

const BOX_WIDTH: usize = 80;

/// Prints the summary of `summary` to stdout.
///
/// 将 `summary` 的摘要打印到标准输出。
pub fn print_summary(summary: &ExecutionSummary) {
    for line in render_summary(summary) {
        println!("{line}");
    }
}

/// Renders the summary as plain lines, without colors.
///
/// 将摘要渲染为纯文本行（不带颜色）。
pub fn render_summary(summary: &ExecutionSummary) -> Vec<String> {
    let stats = summary.stats();
    let mut out = Vec::new();
    let double = "═".repeat(BOX_WIDTH);
    let single = "─".repeat(BOX_WIDTH);

    out.push(String::new());
    out.push(format!("╔{double}╗"));
    out.push(format!("║{}║", center(&t!("summary.title"), BOX_WIDTH)));
    out.push(format!("╠{double}╣"));
    out.push(format!(
        "║{}║",
        center(&t!("summary.execution_date", date = summary.execution_date_str()), BOX_WIDTH)
    ));
    out.push(format!(
        "║{}║",
        center(&t!("summary.duration", duration = &stats.duration), BOX_WIDTH)
    ));
    out.push(format!("╚{double}╝"));

    out.extend(overall_panel(&stats));

    out.push(String::new());
    out.push(format!("┌{double}┐"));
    out.push(format!("│{}│", center(&t!("summary.details_title"), BOX_WIDTH)));
    out.push(format!("└{double}┘"));
    for run in &summary.test_cases {
        out.extend(test_case_panel(run, &single));
    }

    out.push(String::new());
    out.push(format!("╔{double}╗"));
    let banner = if stats.failed_test_cases == 0 {
        t!("summary.all_passed").to_string()
    } else {
        t!("summary.some_failed", count = stats.failed_test_cases).to_string()
    };
    out.push(format!("║{}║", center(&banner, BOX_WIDTH)));
    out.push(format!(
        "║{}║",
        center(&t!("summary.overall_rate", rate = &stats.success_rate), BOX_WIDTH)
    ));
    out.push(format!("╚{double}╝"));
    out
}

fn overall_panel(stats: &ExecutionStats) -> Vec<String> {
    let line = "═".repeat(BOX_WIDTH);
    let case_share = |n: usize| {
        if stats.total_test_cases == 0 {
            "0.0".to_string()
        } else {
            format!("{:.1}", n as f64 / stats.total_test_cases as f64 * 100.0)
        }
    };
    let body = [
        t!("summary.test_cases").to_string(),
        t!("summary.total", count = stats.total_test_cases).to_string(),
        t!(
            "summary.passed_share",
            count = stats.passed_test_cases,
            share = case_share(stats.passed_test_cases)
        )
        .to_string(),
        t!(
            "summary.failed_share",
            count = stats.failed_test_cases,
            share = case_share(stats.failed_test_cases)
        )
        .to_string(),
        String::new(),
        t!("summary.steps").to_string(),
        t!("summary.total", count = stats.total_steps).to_string(),
        t!("summary.passed", count = stats.passed_steps).to_string(),
        t!("summary.failed", count = stats.failed_steps).to_string(),
        t!("summary.success_rate", rate = &stats.success_rate).to_string(),
    ];

    let mut out = vec![
        String::new(),
        format!("┌{line}┐"),
        format!("│{}│", center(&t!("summary.overall_title"), BOX_WIDTH)),
        format!("├{line}┤"),
    ];
    out.extend(body.iter().map(|text| format!("│{}│", pad(text, BOX_WIDTH))));
    out.push(format!("└{line}┘"));
    out
}

fn test_case_panel(run: &TestCaseRun, rule: &str) -> Vec<String> {
    let inner = BOX_WIDTH - 2;
    let row = |text: &str| format!("│ {} │", pad(text, inner));
    let nested = |text: &str| format!("│   {}   │", pad(text, BOX_WIDTH - 6));

    let status = match run.status {
        Status::Passed => t!("summary.status_passed"),
        Status::Failed => t!("summary.status_failed"),
    };
    let duration = run
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "N/A".to_string());

    let mut out = vec![
        String::new(),
        format!("┌{rule}┐"),
        row(&run.name),
        format!("├{rule}┤"),
        row(&t!("summary.case_status", status = status)),
        row(&t!("summary.case_duration", duration = duration)),
        row(&t!(
            "summary.case_steps",
            total = run.steps.len(),
            passed = run.passed_steps(),
            failed = run.failed_steps()
        )),
    ];

    if let (Status::Failed, Some(step)) = (run.status, run.first_failure_step) {
        out.push(format!("├{rule}┤"));
        out.push(row(&t!("summary.failed_at", step = step)));
        if let Some(message) = &run.first_failure_message {
            out.extend(wrap(message, BOX_WIDTH - 6).iter().map(|l| nested(l)));
        }
    }

    let failed: Vec<_> = run.failed_step_outcomes().collect();
    if !failed.is_empty() {
        out.push(format!("├{rule}┤"));
        out.push(row(&t!("summary.failed_steps")));
        for step in failed {
            out.push(nested(&t!(
                "summary.failed_step",
                step = step.step,
                description = &step.step_description
            )));
            out.push(nested(&t!("summary.failed_action", action = &step.action_type)));
            if let Some(error) = &step.error {
                out.push(nested(&t!("summary.failed_error", error = error)));
            }
            out.push(row(""));
        }
    }
    out.push(format!("└{rule}┘"));
    out
}

/// Prints the locations of the persisted summaries.
pub fn print_saved_reports(json: &std::path::Path, html: &std::path::Path) {
    println!("{}", t!("summary.saved_json", path = json.display()).cyan());
    println!("{}", t!("summary.saved_html", path = html.display()).cyan());
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let padding = width.saturating_sub(len);
    let left = padding / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(padding - left))
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

/// Greedy word wrap; a single word longer than `width` gets its own line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed <= width || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
