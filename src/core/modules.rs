//! # Module Expansion Resolver / 模块展开解析器
//!
//! A module is a named, contiguous block of rows in the shared module table,
//! bounded by `<name>_Start` and `<name>_End` marker values in the
//! `MODULENAME` column. Expansion re-scans the table on every call.
//!
//! 模块是共享模块表中的一个具名连续行块，由 `MODULENAME` 列中的
//! `<name>_Start` 与 `<name>_End` 标记界定。每次展开都会重新扫描表。

use std::collections::HashMap;
use std::ops::Range;

use crate::core::action::{Action, ActionKind};
use crate::core::error::StepError;
use crate::core::models::StepRow;

const START_SUFFIX: &str = "_Start";
const END_SUFFIX: &str = "_End";

/// One row of the module table.
///
/// Marker rows usually carry nothing but the `MODULENAME` cell, so `step` is
/// `None` whenever the row lacks the step columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRow {
    pub module_name: Option<String>,
    pub step: Option<StepRow>,
}

impl ModuleRow {
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            module_name: Some(name.into()),
            step: None,
        }
    }

    pub fn step(row: StepRow) -> Self {
        Self {
            module_name: None,
            step: Some(row),
        }
    }

    fn marker_value(&self) -> Option<&str> {
        self.module_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// The shared table every `GETMODULE` step expands from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleTable {
    rows: Vec<ModuleRow>,
}

impl ModuleTable {
    pub fn new(rows: Vec<ModuleRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ModuleRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Base names of every marker present, suffix stripped, first-seen order.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for value in self.rows.iter().filter_map(ModuleRow::marker_value) {
            let base = value
                .strip_suffix(START_SUFFIX)
                .or_else(|| value.strip_suffix(END_SUFFIX))
                .unwrap_or(value);
            if !names.iter().any(|n| n == base) {
                names.push(base.to_string());
            }
        }
        names
    }

    /// Finds the half-open row range strictly between the markers of `name`.
    ///
    /// The scan keeps the most recent start marker and stops at the first end
    /// marker seen after a start.
    ///
    /// 扫描保留最近一次出现的开始标记，并在开始之后遇到的第一个结束标记处停止。
    pub fn locate(&self, name: &str) -> Result<Range<usize>, StepError> {
        let start_marker = format!("{name}{START_SUFFIX}");
        let end_marker = format!("{name}{END_SUFFIX}");
        let mut start = None;
        let mut end = None;

        for (index, value) in self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.marker_value().map(|v| (i, v)))
        {
            if value == start_marker {
                start = Some(index);
            } else if value == end_marker && start.is_some() {
                end = Some(index);
                break;
            }
        }

        let start = start.ok_or_else(|| StepError::ModuleNotFound {
            name: name.to_string(),
            available: display_names(&self.module_names()),
        })?;
        let end = end.ok_or_else(|| StepError::ModuleUnterminated {
            name: name.to_string(),
        })?;
        if start >= end {
            return Err(StepError::ModuleMalformed {
                name: name.to_string(),
                start,
                end,
            });
        }
        if end - start < 2 {
            return Err(StepError::ModuleEmpty {
                name: name.to_string(),
            });
        }
        Ok(start + 1..end)
    }

    /// Expands `name` into ordinary steps, descriptions prefixed with
    /// `[Module: <name>]` and step numbers preserved.
    pub fn expand(&self, name: &str) -> Result<Vec<StepRow>, StepError> {
        let range = self.locate(name)?;
        let mut expanded = Vec::with_capacity(range.len());
        for row in &self.rows[range] {
            let step = row.step.as_ref().ok_or_else(|| StepError::MissingRequiredField {
                field: "ACTIONTYPE",
                action: ActionKind::GetModule.keyword().to_string(),
            })?;
            let mut step = step.clone();
            step.step_description = format!("[Module: {name}] {}", step.step_description);
            expanded.push(step);
        }
        tracing::debug!(module = name, rows = expanded.len(), "expanded module");
        Ok(expanded)
    }

    /// Walks the static `GETMODULE` references reachable from `name` and
    /// rejects self-reference or nesting deeper than `max_depth`.
    ///
    /// Each module is walked once per depth budget: a module already cleared
    /// with a subtree height that still fits is not walked again.
    ///
    /// 每个模块在深度预算内只遍历一次：已验证且子树高度仍满足限制的模块不会被再次遍历。
    pub fn check_references(&self, name: &str, max_depth: usize) -> Result<(), StepError> {
        let mut chain = Vec::new();
        let mut cleared = HashMap::new();
        self.walk_references(name, max_depth, &mut chain, &mut cleared)
            .map(|_| ())
    }

    /// Returns the height of `name`'s reference subtree, itself included.
    fn walk_references(
        &self,
        name: &str,
        max_depth: usize,
        chain: &mut Vec<String>,
        cleared: &mut HashMap<String, usize>,
    ) -> Result<usize, StepError> {
        if let Some(&height) = cleared.get(name) {
            if chain.len() + height <= max_depth {
                return Ok(height);
            }
        }
        if chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
            return Err(StepError::ModuleCycle {
                chain: chain.join(" -> "),
            });
        }
        if chain.len() >= max_depth {
            return Err(StepError::ModuleDepthExceeded {
                name: name.to_string(),
                max_depth,
            });
        }

        chain.push(name.to_string());
        let mut below = 0;
        for row in self.expand(name)? {
            if let Ok(Action::GetModule { name: nested }) = Action::from_row(&row) {
                below = below.max(self.walk_references(&nested, max_depth, chain, cleared)?);
            }
        }
        chain.pop();
        cleared.insert(name.to_string(), below + 1);
        Ok(below + 1)
    }
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "<none>".to_string()
    } else {
        names.join(", ")
    }
}
