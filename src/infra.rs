//! # Infrastructure Module / 基础设施模块
//!
//! Adapters behind the core traits: the filesystem artifact store, the
//! workbook reader, the WebDriver client and logging setup.
//!
//! 核心 trait 背后的适配器：文件系统产物存储、工作簿读取器、WebDriver 客户端以及日志设置。

pub mod fs;
pub mod logging;
pub mod webdriver;
pub mod workbook;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
