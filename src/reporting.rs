//! # Reporting Module / 报告模块
//!
//! Pure projections of an [`ExecutionSummary`](crate::core::tracker::ExecutionSummary):
//! the console summary, persisted JSON and HTML summaries, and the analytics
//! report rebuilt from the screenshot tree.
//!
//! [`ExecutionSummary`](crate::core::tracker::ExecutionSummary) 的纯投影：
//! 控制台摘要、持久化的 JSON 与 HTML 摘要，以及根据截图树重建的分析报告。

pub mod analytics;
pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::print_summary;
pub use html::save_html;
pub use json::save_json;
