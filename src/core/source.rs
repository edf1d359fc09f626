//! Interface of the tabular data source the runner reads test cases from.

use crate::core::error::PlanError;
use crate::core::models::StepRow;
use crate::core::modules::ModuleTable;

/// A named collection of sheets, each an ordered sequence of rows.
///
/// 具名工作表的集合，每个工作表是有序的行序列。
pub trait StepSource {
    /// Every sheet name, in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Rows of a test-case sheet. Fails with `MissingSheet` when absent and
    /// with `MissingColumn`/`InvalidRow` when a row lacks a required column.
    fn test_steps(&self, sheet: &str) -> Result<Vec<StepRow>, PlanError>;

    /// Rows of the module sheet, markers included.
    fn module_table(&self, sheet: &str) -> Result<ModuleTable, PlanError>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }
}
