//! # Locator Resolver / 定位器解析
//!
//! Turns a declared locator type and path into a lazy element descriptor.
//! Nothing is looked up here; resolution failures surface when a driver
//! uses the descriptor.
//!
//! 将声明的定位类型和路径转换为惰性的元素描述符。
//! 此处不进行任何查找；解析失败会在驱动使用描述符时暴露。

use std::fmt;

use crate::core::error::StepError;

/// The fixed set of element addressing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStrategy {
    /// Generic CSS/XPath selector (`locator`)
    Selector,
    /// ARIA role (`getByRole`)
    Role,
    /// Visible text (`getByText`)
    Text,
    /// `data-testid` attribute (`getByTestId`)
    TestId,
    /// Associated label text (`getByLabel`)
    Label,
    /// Placeholder attribute (`getByPlaceholder`)
    Placeholder,
    /// Image alt text (`getByAltText`)
    AltText,
    /// Title attribute (`getByTitle`)
    Title,
}

impl LocatorStrategy {
    pub const ALL: [LocatorStrategy; 8] = [
        LocatorStrategy::Selector,
        LocatorStrategy::Role,
        LocatorStrategy::Text,
        LocatorStrategy::TestId,
        LocatorStrategy::Label,
        LocatorStrategy::Placeholder,
        LocatorStrategy::AltText,
        LocatorStrategy::Title,
    ];

    /// The keyword used in the `LOCATORPATHTYPE` column.
    pub fn keyword(&self) -> &'static str {
        match self {
            LocatorStrategy::Selector => "locator",
            LocatorStrategy::Role => "getByRole",
            LocatorStrategy::Text => "getByText",
            LocatorStrategy::TestId => "getByTestId",
            LocatorStrategy::Label => "getByLabel",
            LocatorStrategy::Placeholder => "getByPlaceholder",
            LocatorStrategy::AltText => "getByAltText",
            LocatorStrategy::Title => "getByTitle",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        // `getByBlaceholder` is kept for workbooks written against the misspelled keyword.
        if keyword == "getByBlaceholder" {
            return Some(LocatorStrategy::Placeholder);
        }
        Self::ALL.into_iter().find(|s| s.keyword() == keyword)
    }

    fn supported_list() -> String {
        Self::ALL.map(|s| s.keyword()).join(", ")
    }
}

/// A resolved, not yet materialized, element handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.strategy.keyword(), self.value)
    }
}

/// Resolves a declared locator into a [`Locator`].
///
/// Both inputs are trimmed and stripped of one layer of enclosing quotes.
/// An unknown strategy reports the raw, untrimmed input.
///
/// 两个输入都会被去除首尾空白并剥离一层外围引号。
/// 未知策略会报告原始（未修剪的）输入。
pub fn resolve(locator_type: &str, locator_path: &str) -> Result<Locator, StepError> {
    let cleaned_type = clean(locator_type);
    let strategy = LocatorStrategy::from_keyword(cleaned_type).ok_or_else(|| {
        StepError::UnsupportedLocatorStrategy {
            raw: locator_type.to_string(),
            supported: LocatorStrategy::supported_list(),
        }
    })?;
    Ok(Locator {
        strategy,
        value: clean(locator_path).to_string(),
    })
}

/// Trims and removes a single leading and a single trailing quote character.
pub fn clean(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    trimmed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_strategy_keyword() {
        for strategy in LocatorStrategy::ALL {
            let locator = resolve(strategy.keyword(), "x").unwrap();
            assert_eq!(locator.strategy, strategy);
        }
    }

    #[test]
    fn strips_whitespace_and_one_layer_of_quotes() {
        let locator = resolve("  'getByRole' ", " \"button\" ").unwrap();
        assert_eq!(locator.strategy, LocatorStrategy::Role);
        assert_eq!(locator.value, "button");

        let nested = resolve("locator", "\"'#id'\"").unwrap();
        assert_eq!(nested.value, "'#id'");
    }

    #[test]
    fn accepts_legacy_placeholder_spelling() {
        let locator = resolve("getByBlaceholder", "Email").unwrap();
        assert_eq!(locator.strategy, LocatorStrategy::Placeholder);
    }

    #[test]
    fn unknown_strategy_reports_raw_input() {
        let err = resolve("  byMagic ", "x").unwrap_err();
        match err {
            StepError::UnsupportedLocatorStrategy { raw, supported } => {
                assert_eq!(raw, "  byMagic ");
                assert!(supported.contains("getByTitle"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(resolve("GETBYROLE", "button").is_err());
    }
}
