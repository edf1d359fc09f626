//! # Core Module / 核心模块
//!
//! The step interpreter: data model, locator and action resolution, module
//! expansion, execution tracking and the sequential test-case loop.
//!
//! 步骤解释器：数据模型、定位器与动作解析、模块展开、执行跟踪以及顺序测试用例循环。

pub mod action;
pub mod artifacts;
pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod execution;
pub mod locator;
pub mod models;
pub mod modules;
pub mod planner;
pub mod source;
pub mod tracker;

// Re-exports
pub use dispatcher::{ActionDispatcher, DispatchContext, DispatchOptions};
pub use driver::BrowserDriver;
pub use tracker::{ExecutionSummary, ExecutionTracker};
