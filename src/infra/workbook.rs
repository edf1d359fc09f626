//! # Workbook Reader / 工作簿读取器
//!
//! Reads an ordered list of sheets from a TOML or JSON document:
//!
//! ```toml
//! [[sheet]]
//! name = "TestLogin"
//! rows = [
//!   { STEP = 1, STEPDESCRIPTION = "Open", ACTIONTYPE = "OPENURL", INPUTDATA = "https://example.com" },
//! ]
//! ```
//!
//! Column names are matched case-insensitively; blank cells count as absent.
//!
//! 从 TOML 或 JSON 文档读取有序的工作表列表。列名不区分大小写匹配；空白单元格视为缺失。

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::PlanError;
use crate::core::models::StepRow;
use crate::core::modules::{ModuleRow, ModuleTable};
use crate::core::source::StepSource;

pub const COL_STEP: &str = "STEP";
pub const COL_DESCRIPTION: &str = "STEPDESCRIPTION";
pub const COL_ACTION: &str = "ACTIONTYPE";
pub const COL_LOCATOR_TYPE: &str = "LOCATORPATHTYPE";
pub const COL_LOCATOR: &str = "LOCATORPATH";
pub const COL_INPUT: &str = "INPUTDATA";
pub const COL_MODULE: &str = "MODULENAME";

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

pub type Row = IndexMap<String, Cell>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// An in-memory workbook.
/// 内存中的工作簿。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(rename = "sheet", alias = "sheets", default)]
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Loads a workbook, choosing the format from the file extension
    /// (`.json` is JSON, anything else TOML).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workbook: {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        parsed.with_context(|| format!("Failed to parse workbook: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn require_sheet(&self, name: &str) -> Result<&Sheet, PlanError> {
        self.sheet(name)
            .ok_or_else(|| PlanError::MissingSheet(name.to_string()))
    }
}

impl StepSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn test_steps(&self, sheet: &str) -> Result<Vec<StepRow>, PlanError> {
        let data = self.require_sheet(sheet)?;
        data.rows
            .iter()
            .enumerate()
            .map(|(index, row)| RowReader::new(sheet, index, row).step_row())
            .collect()
    }

    fn module_table(&self, sheet: &str) -> Result<ModuleTable, PlanError> {
        let data = self.require_sheet(sheet)?;
        let rows = data
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| -> Result<ModuleRow, PlanError> {
                let reader = RowReader::new(sheet, index, row);
                let step = if reader.text(COL_ACTION).is_some() {
                    Some(reader.step_row()?)
                } else {
                    None
                };
                Ok(ModuleRow {
                    module_name: reader.text(COL_MODULE),
                    step,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ModuleTable::new(rows))
    }
}

struct RowReader<'a> {
    sheet: &'a str,
    /// 1-based data row number, as shown in error messages.
    row_number: usize,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    fn new(sheet: &'a str, index: usize, row: &'a Row) -> Self {
        Self {
            sheet,
            row_number: index + 1,
            row,
        }
    }

    fn cell(&self, column: &str) -> Option<&'a Cell> {
        self.row
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(column))
            .map(|(_, cell)| cell)
    }

    /// Cell rendered as text; blank cells are absent.
    fn text(&self, column: &str) -> Option<String> {
        self.cell(column)
            .map(Cell::to_string)
            .filter(|s| !s.trim().is_empty())
    }

    fn required(&self, column: &'static str) -> Result<String, PlanError> {
        self.text(column).ok_or_else(|| PlanError::MissingColumn {
            sheet: self.sheet.to_string(),
            row: self.row_number,
            column,
        })
    }

    fn step_number(&self) -> Result<u32, PlanError> {
        let invalid = |value: String| PlanError::InvalidRow {
            sheet: self.sheet.to_string(),
            row: self.row_number,
            reason: format!("STEP must be a positive whole number, got '{value}'"),
        };
        match self.cell(COL_STEP) {
            Some(Cell::Int(i)) => u32::try_from(*i).map_err(|_| invalid(i.to_string())),
            Some(Cell::Float(v)) if v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64 => {
                Ok(*v as u32)
            }
            Some(Cell::Text(s)) if !s.trim().is_empty() => {
                s.trim().parse::<u32>().map_err(|_| invalid(s.clone()))
            }
            Some(Cell::Text(_)) | None => Err(PlanError::MissingColumn {
                sheet: self.sheet.to_string(),
                row: self.row_number,
                column: COL_STEP,
            }),
            Some(other) => Err(invalid(other.to_string())),
        }
    }

    fn step_row(&self) -> Result<StepRow, PlanError> {
        Ok(StepRow {
            step: self.step_number()?,
            step_description: self.required(COL_DESCRIPTION)?,
            action_type: self.required(COL_ACTION)?,
            locator_path_type: self.text(COL_LOCATOR_TYPE),
            locator_path: self.text(COL_LOCATOR),
            input_data: self.text(COL_INPUT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[sheet]]
name = "Module"
rows = [
  { ModuleName = "Login_Start" },
  { STEP = 1, STEPDESCRIPTION = "User", ACTIONTYPE = "FILL", LOCATORPATHTYPE = "getByLabel", LOCATORPATH = "User", INPUTDATA = "alice" },
  { moduleName = "Login_End" },
]

[[sheet]]
name = "TestLogin"
rows = [
  { STEP = 1, STEPDESCRIPTION = "Open", ACTIONTYPE = "OPENURL", INPUTDATA = "https://example.com" },
  { step = 2.0, stepdescription = "Wait", actiontype = "WAIT", inputdata = 500 },
  { STEP = "3", STEPDESCRIPTION = "Login", ACTIONTYPE = "GETMODULE", INPUTDATA = "Login", LOCATORPATH = "  " },
]
"#;

    #[test]
    fn reads_sheets_in_order_with_case_insensitive_columns() {
        let workbook = Workbook::from_toml_str(SAMPLE).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Module", "TestLogin"]);

        let steps = workbook.test_steps("TestLogin").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].step, 2);
        assert_eq!(steps[1].input_data.as_deref(), Some("500"));
        assert_eq!(steps[2].step, 3);
        assert_eq!(steps[2].locator_path, None);
    }

    #[test]
    fn module_rows_keep_markers_and_steps() {
        let workbook = Workbook::from_toml_str(SAMPLE).unwrap();
        let table = workbook.module_table("Module").unwrap();
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.module_names(), vec!["Login"]);
        assert_eq!(table.expand("Login").unwrap()[0].input_data.as_deref(), Some("alice"));
    }

    #[test]
    fn missing_required_column_names_sheet_and_row() {
        let workbook = Workbook::from_json_str(
            r#"{"sheet":[{"name":"TestA","rows":[{"STEP":1,"ACTIONTYPE":"HOVER"}]}]}"#,
        )
        .unwrap();
        match workbook.test_steps("TestA").unwrap_err() {
            PlanError::MissingColumn { sheet, row, column } => {
                assert_eq!(sheet, "TestA");
                assert_eq!(row, 1);
                assert_eq!(column, COL_DESCRIPTION);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_step_is_invalid() {
        let workbook = Workbook::from_json_str(
            r#"{"sheet":[{"name":"TestA","rows":[{"STEP":"one","STEPDESCRIPTION":"x","ACTIONTYPE":"HOVER"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            workbook.test_steps("TestA"),
            Err(PlanError::InvalidRow { .. })
        ));
        assert!(matches!(
            workbook.test_steps("TestB"),
            Err(PlanError::MissingSheet(_))
        ));
    }
}
