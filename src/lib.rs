//! # Grid Runner Library / Grid Runner 库
//!
//! A table-driven browser test runner. Test cases are sheets of
//! step/action/locator/input rows; each row is interpreted into one browser
//! action, executed through a WebDriver session, screenshotted and tracked.
//!
//! 表格驱动的浏览器测试运行器。测试用例是由步骤/动作/定位器/输入行组成的工作表；
//! 每一行被解释为一个浏览器动作，通过 WebDriver 会话执行、截图并跟踪。
//!
//! ## Modules / 模块
//!
//! - `core` - Step interpreter: data model, dispatcher, tracker and test-case loop
//! - `infra` - Workbook reader, WebDriver client, filesystem artifacts, logging
//! - `reporting` - Console, JSON, HTML and analytics reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 步骤解释器：数据模型、分发器、跟踪器和测试用例循环
//! - `infra` - 工作簿读取器、WebDriver 客户端、文件系统产物、日志
//! - `reporting` - 控制台、JSON、HTML 和分析报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// Returns the locale that was selected.
pub fn init() -> String {
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    set_language(&locale)
}

/// Selects the closest available locale to `requested` and activates it.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en" from "en-US"), and finally falls back to "en".
pub fn set_language(requested: &str) -> String {
    let lang = resolve_locale(requested, &rust_i18n::available_locales!());
    rust_i18n::set_locale(&lang);
    lang
}

fn resolve_locale(requested: &str, available: &[&str]) -> String {
    let requested = requested.replace('_', "-");
    if let Some(exact) = available.iter().find(|l| l.eq_ignore_ascii_case(&requested)) {
        return exact.to_string();
    }
    let language = requested.split('-').next().unwrap_or_default();
    available
        .iter()
        .find(|l| l.eq_ignore_ascii_case(language))
        .or_else(|| {
            available
                .iter()
                .find(|l| l.split('-').next().is_some_and(|p| p.eq_ignore_ascii_case(language)))
        })
        .map_or_else(|| "en".to_string(), |l| l.to_string())
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
