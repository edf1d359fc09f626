//! # Action Model / 动作模型
//!
//! Maps the case-sensitive `ACTIONTYPE` keyword of a row onto a closed set of
//! typed actions. Each variant carries exactly the fields it needs, so an
//! element action always has a locator and a navigation action never does.
//!
//! 将行中区分大小写的 `ACTIONTYPE` 关键字映射到封闭的类型化动作集合。
//! 每个变体仅携带其所需字段：元素动作总是有定位器，导航动作永远没有。

use std::time::Duration;

use crate::core::error::StepError;
use crate::core::locator::{self, Locator};
use crate::core::models::StepRow;

/// Fieldless action keyword, one per supported `ACTIONTYPE` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    OpenUrl,
    Wait,
    ClosePage,
    FullPageScreenshot,
    Fill,
    Click,
    DoubleClick,
    Clear,
    SelectOption,
    Hover,
    RightClick,
    PressKey,
    Check,
    Uncheck,
    UploadFile,
    RadioSelect,
    RadioDeselect,
    AssertVisible,
    AssertHidden,
    AssertEnabled,
    AssertDisabled,
    AssertEmpty,
    GetModule,
}

impl ActionKind {
    pub const ALL: [ActionKind; 23] = [
        ActionKind::OpenUrl,
        ActionKind::Wait,
        ActionKind::ClosePage,
        ActionKind::FullPageScreenshot,
        ActionKind::Fill,
        ActionKind::Click,
        ActionKind::DoubleClick,
        ActionKind::Clear,
        ActionKind::SelectOption,
        ActionKind::Hover,
        ActionKind::RightClick,
        ActionKind::PressKey,
        ActionKind::Check,
        ActionKind::Uncheck,
        ActionKind::UploadFile,
        ActionKind::RadioSelect,
        ActionKind::RadioDeselect,
        ActionKind::AssertVisible,
        ActionKind::AssertHidden,
        ActionKind::AssertEnabled,
        ActionKind::AssertDisabled,
        ActionKind::AssertEmpty,
        ActionKind::GetModule,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            ActionKind::OpenUrl => "OPENURL",
            ActionKind::Wait => "WAIT",
            ActionKind::ClosePage => "CLOSEPAGE",
            ActionKind::FullPageScreenshot => "TAKEFullPageScreenshot",
            ActionKind::Fill => "FILL",
            ActionKind::Click => "CLICKBUTTON",
            ActionKind::DoubleClick => "DOUBLECLICK",
            ActionKind::Clear => "CLEARFIELD",
            ActionKind::SelectOption => "SELECTOPTION",
            ActionKind::Hover => "HOVER",
            ActionKind::RightClick => "RIGHTCLICK",
            ActionKind::PressKey => "PRESSKEY",
            ActionKind::Check => "CHECKCheckbox",
            ActionKind::Uncheck => "UNCHECKCheckbox",
            ActionKind::UploadFile => "UPLOADFile",
            ActionKind::RadioSelect => "RADIOButtonSelect",
            ActionKind::RadioDeselect => "RADIOBUttonDeselect",
            ActionKind::AssertVisible => "ValidateElementtobeVisible",
            ActionKind::AssertHidden => "ValidateElementtobeHidden",
            ActionKind::AssertEnabled => "ValidateElementtobeEnabled",
            ActionKind::AssertDisabled => "ValidateElementtobeDisabled",
            ActionKind::AssertEmpty => "ValidateElementtobeEmpty",
            ActionKind::GetModule => "GETMODULE",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword() == keyword)
    }

    /// Comma separated list of every accepted keyword, for diagnostics.
    pub fn available() -> String {
        Self::ALL.map(|k| k.keyword()).join(", ")
    }
}

/// One driver call performed against a resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOp {
    Fill(String),
    Click,
    DoubleClick,
    Clear,
    SelectOption { label: String },
    Hover,
    RightClick,
    PressKey(String),
    Check,
    Uncheck,
    UploadFile(String),
    RadioSelect,
    RadioDeselect,
}

/// One driver assertion against a resolved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    Empty,
}

/// A fully validated step action.
///
/// 一个经过完整验证的步骤动作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenUrl { url: String },
    Wait { duration: Duration },
    ClosePage,
    FullPageScreenshot { path: Option<String> },
    Element { locator: Locator, op: ElementOp },
    Assert { locator: Locator, assertion: Assertion },
    GetModule { name: String },
}

impl Action {
    /// Validates `row` and builds the typed action it declares.
    ///
    /// Fails with `UnsupportedActionType` for unknown keywords, with
    /// `MissingRequiredField` when a needed column is absent and with
    /// `UnsupportedLocatorStrategy` for an unknown locator type.
    pub fn from_row(row: &StepRow) -> Result<Self, StepError> {
        let kind = ActionKind::from_keyword(&row.action_type).ok_or_else(|| {
            StepError::UnsupportedActionType {
                received: row.action_type.clone(),
                available: ActionKind::available(),
            }
        })?;
        let fields = RowFields { row, kind };

        let action = match kind {
            ActionKind::OpenUrl => Action::OpenUrl {
                url: fields.input()?,
            },
            ActionKind::Wait => Action::Wait {
                duration: parse_wait(&fields.input()?)?,
            },
            ActionKind::ClosePage => Action::ClosePage,
            ActionKind::FullPageScreenshot => Action::FullPageScreenshot {
                path: fields.optional_input(),
            },
            ActionKind::GetModule => Action::GetModule {
                name: locator::clean(&fields.input()?).to_string(),
            },
            ActionKind::AssertVisible => fields.assertion(Assertion::Visible)?,
            ActionKind::AssertHidden => fields.assertion(Assertion::Hidden)?,
            ActionKind::AssertEnabled => fields.assertion(Assertion::Enabled)?,
            ActionKind::AssertDisabled => fields.assertion(Assertion::Disabled)?,
            ActionKind::AssertEmpty => fields.assertion(Assertion::Empty)?,
            ActionKind::Fill => fields.element(ElementOp::Fill(fields.input()?))?,
            ActionKind::Click => fields.element(ElementOp::Click)?,
            ActionKind::DoubleClick => fields.element(ElementOp::DoubleClick)?,
            ActionKind::Clear => fields.element(ElementOp::Clear)?,
            ActionKind::SelectOption => fields.element(ElementOp::SelectOption {
                label: fields.input()?,
            })?,
            ActionKind::Hover => fields.element(ElementOp::Hover)?,
            ActionKind::RightClick => fields.element(ElementOp::RightClick)?,
            ActionKind::PressKey => fields.element(ElementOp::PressKey(fields.input()?))?,
            ActionKind::Check => fields.element(ElementOp::Check)?,
            ActionKind::Uncheck => fields.element(ElementOp::Uncheck)?,
            ActionKind::UploadFile => fields.element(ElementOp::UploadFile(fields.input()?))?,
            ActionKind::RadioSelect => fields.element(ElementOp::RadioSelect)?,
            ActionKind::RadioDeselect => fields.element(ElementOp::RadioDeselect)?,
        };
        Ok(action)
    }

    /// Whether the dispatcher captures a screenshot after this action.
    pub fn captures_screenshot(&self) -> bool {
        !matches!(self, Action::ClosePage | Action::GetModule { .. })
    }
}

struct RowFields<'a> {
    row: &'a StepRow,
    kind: ActionKind,
}

impl RowFields<'_> {
    fn missing(&self, field: &'static str) -> StepError {
        StepError::MissingRequiredField {
            field,
            action: self.kind.keyword().to_string(),
        }
    }

    fn input(&self) -> Result<String, StepError> {
        self.row
            .input_data
            .clone()
            .ok_or_else(|| self.missing("INPUTDATA"))
    }

    fn optional_input(&self) -> Option<String> {
        self.row
            .input_data
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn locator(&self) -> Result<Locator, StepError> {
        let path_type = self
            .row
            .locator_path_type
            .as_deref()
            .ok_or_else(|| self.missing("LOCATORPATHTYPE"))?;
        let path = self
            .row
            .locator_path
            .as_deref()
            .ok_or_else(|| self.missing("LOCATORPATH"))?;
        locator::resolve(path_type, path)
    }

    fn element(&self, op: ElementOp) -> Result<Action, StepError> {
        Ok(Action::Element {
            locator: self.locator()?,
            op,
        })
    }

    fn assertion(&self, assertion: Assertion) -> Result<Action, StepError> {
        Ok(Action::Assert {
            locator: self.locator()?,
            assertion,
        })
    }
}

fn parse_wait(raw: &str) -> Result<Duration, StepError> {
    let cleaned = locator::clean(raw);
    // Spreadsheet exports sometimes render integers as "1000.0".
    let millis = cleaned
        .parse::<u64>()
        .ok()
        .or_else(|| {
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                .map(|v| v as u64)
        })
        .ok_or_else(|| StepError::InvalidInputData {
            field: "INPUTDATA",
            value: raw.to_string(),
            reason: "expected a whole number of milliseconds".to_string(),
        })?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locator::LocatorStrategy;

    #[test]
    fn every_keyword_round_trips() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_keyword(kind.keyword()), Some(kind));
        }
    }

    #[test]
    fn fill_requires_locator_and_input() {
        let row = StepRow::new(1, "fill", "FILL").with_locator("getByLabel", "Email");
        assert!(matches!(
            Action::from_row(&row),
            Err(StepError::MissingRequiredField { field: "INPUTDATA", .. })
        ));

        let row = row.with_input("a@b.c");
        let action = Action::from_row(&row).unwrap();
        assert_eq!(
            action,
            Action::Element {
                locator: Locator {
                    strategy: LocatorStrategy::Label,
                    value: "Email".into()
                },
                op: ElementOp::Fill("a@b.c".into()),
            }
        );
    }

    #[test]
    fn navigation_ignores_locator_columns() {
        let row = StepRow::new(1, "open", "OPENURL")
            .with_locator("nonsense", "x")
            .with_input("https://example.com");
        assert_eq!(
            Action::from_row(&row).unwrap(),
            Action::OpenUrl {
                url: "https://example.com".into()
            }
        );
    }

    #[test]
    fn unknown_keyword_lists_available_set() {
        let row = StepRow::new(3, "?", "clickbutton");
        match Action::from_row(&row).unwrap_err() {
            StepError::UnsupportedActionType { received, available } => {
                assert_eq!(received, "clickbutton");
                assert!(available.contains("CLICKBUTTON"));
                assert!(available.contains("GETMODULE"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wait_parses_whole_milliseconds() {
        let row = StepRow::new(1, "wait", "WAIT").with_input("1500.0");
        assert_eq!(
            Action::from_row(&row).unwrap(),
            Action::Wait {
                duration: Duration::from_millis(1500)
            }
        );
        let bad = StepRow::new(1, "wait", "WAIT").with_input("soon");
        assert!(matches!(
            Action::from_row(&bad),
            Err(StepError::InvalidInputData { .. })
        ));
    }

    #[test]
    fn module_name_is_cleaned() {
        let row = StepRow::new(1, "login", "GETMODULE").with_input(" 'Login' ");
        assert_eq!(
            Action::from_row(&row).unwrap(),
            Action::GetModule {
                name: "Login".into()
            }
        );
    }

    #[test]
    fn close_page_and_modules_skip_the_step_screenshot() {
        assert!(!Action::ClosePage.captures_screenshot());
        assert!(!Action::GetModule { name: "A".into() }.captures_screenshot());
        assert!(Action::OpenUrl { url: "u".into() }.captures_screenshot());
    }
}
