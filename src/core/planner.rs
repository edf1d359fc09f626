//! # Test Execution Planner Module / 测试执行计划模块
//!
//! Selects the test-case sheets of a workbook and loads everything a run
//! needs before the first test case starts. Every error raised here is fatal.
//!
//! 选择工作簿中的测试用例工作表，并在第一个测试用例开始之前加载运行所需的一切。
//! 此处产生的每个错误都是致命的。

use colored::*;
use tracing::debug;

use crate::core::error::PlanError;
use crate::core::models::StepRow;
use crate::core::modules::ModuleTable;
use crate::core::source::StepSource;
use crate::infra::t;

/// One selected test case and its declared rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTestCase {
    pub name: String,
    pub rows: Vec<StepRow>,
}

/// Represents a complete, validated execution plan.
/// 表示一个完整的、经过验证的执行计划。
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Test cases in workbook order.
    /// 按工作簿顺序排列的测试用例。
    pub test_cases: Vec<PlannedTestCase>,
    /// The shared module table, empty when the workbook has no module sheet.
    /// 共享模块表；当工作簿没有模块工作表时为空。
    pub modules: ModuleTable,
}

impl ExecutionPlan {
    pub fn total_steps(&self) -> usize {
        self.test_cases.iter().map(|c| c.rows.len()).sum()
    }
}

/// Keeps the names starting with `prefix`, in their original order.
///
/// An empty selection is an error listing every available name.
///
/// 保留以 `prefix` 开头的名称，并保持原始顺序。结果为空时返回列出所有可用名称的错误。
pub fn filter_sheet_names(all: &[String], prefix: &str) -> Result<Vec<String>, PlanError> {
    let selected: Vec<String> = all
        .iter()
        .filter(|name| name.starts_with(prefix))
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(PlanError::NoTestCases {
            prefix: prefix.to_string(),
            available: all.join(", "),
        });
    }
    Ok(selected)
}

/// Builds the plan for `source`: filters the sheets, then loads and validates
/// every selected sheet and the module table.
///
/// 为 `source` 构建计划：过滤工作表，然后加载并验证每个选中的工作表和模块表。
pub fn plan_execution(
    source: &dyn StepSource,
    prefix: &str,
    module_sheet: &str,
) -> Result<ExecutionPlan, PlanError> {
    let names = filter_sheet_names(&source.sheet_names(), prefix)?;
    println!(
        "{}",
        t!("plan.found_test_cases", count = names.len(), names = names.join(", ")).cyan()
    );

    let mut test_cases: Vec<PlannedTestCase> = Vec::with_capacity(names.len());
    for name in names {
        // Test-case names key the tracker and the screenshot tree.
        if test_cases.iter().any(|c| c.name == name) {
            return Err(PlanError::DuplicateSheet(name));
        }
        let rows = source.test_steps(&name)?;
        if rows.is_empty() {
            return Err(PlanError::EmptySheet(name));
        }
        debug!(sheet = %name, rows = rows.len(), "loaded test case");
        test_cases.push(PlannedTestCase { name, rows });
    }

    let modules = if source.has_sheet(module_sheet) {
        source.module_table(module_sheet)?
    } else {
        debug!(sheet = module_sheet, "no module sheet; GETMODULE steps will fail");
        ModuleTable::default()
    };

    Ok(ExecutionPlan {
        test_cases,
        modules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_matching_names_in_order() {
        let all = names(&["Module", "TestLogin", "TestCheckout", "Setup"]);
        assert_eq!(
            filter_sheet_names(&all, "Test").unwrap(),
            names(&["TestLogin", "TestCheckout"])
        );
    }

    #[test]
    fn duplicate_test_case_sheet_is_rejected() {
        struct Twice;
        impl StepSource for Twice {
            fn sheet_names(&self) -> Vec<String> {
                names(&["TestA", "TestA"])
            }
            fn test_steps(&self, _sheet: &str) -> Result<Vec<StepRow>, PlanError> {
                Ok(vec![StepRow::new(1, "open", "OPENURL").with_input("https://a")])
            }
            fn module_table(&self, _sheet: &str) -> Result<ModuleTable, PlanError> {
                Ok(ModuleTable::default())
            }
        }

        match plan_execution(&Twice, "Test", "Module").unwrap_err() {
            PlanError::DuplicateSheet(name) => assert_eq!(name, "TestA"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_selection_enumerates_all_names() {
        let all = names(&["Module", "TestLogin", "TestCheckout", "Setup"]);
        match filter_sheet_names(&all, "Nope").unwrap_err() {
            PlanError::NoTestCases { prefix, available } => {
                assert_eq!(prefix, "Nope");
                assert_eq!(available, "Module, TestLogin, TestCheckout, Setup");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let all = names(&["testLower", "TestUpper"]);
        assert_eq!(filter_sheet_names(&all, "Test").unwrap(), names(&["TestUpper"]));
    }
}
