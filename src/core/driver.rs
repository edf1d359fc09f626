//! # Browser Driver Capability / 浏览器驱动能力接口
//!
//! The interpreter only depends on this trait. Each method is one driver
//! primitive and is a suspension point of the test case.
//!
//! 解释器只依赖于此 trait。每个方法是一个驱动原语，也是测试用例的挂起点。

use std::time::Duration;

use async_trait::async_trait;

use crate::core::action::{Assertion, ElementOp};
use crate::core::error::DriverError;
use crate::core::locator::Locator;

#[async_trait]
pub trait BrowserDriver: Send {
    /// Called once before a test case's first step.
    async fn prepare(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    async fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn close_page(&mut self) -> Result<(), DriverError>;

    /// Captures the current page as PNG bytes.
    async fn screenshot(&mut self, full_page: bool) -> Result<Vec<u8>, DriverError>;

    /// Performs exactly one interaction with the element addressed by `locator`.
    async fn perform(&mut self, locator: &Locator, op: &ElementOp) -> Result<(), DriverError>;

    /// Awaits `assertion` on `locator`. `None` uses the driver's default timeout.
    async fn check(
        &mut self,
        locator: &Locator,
        assertion: Assertion,
        timeout: Option<Duration>,
    ) -> Result<(), DriverError>;
}
