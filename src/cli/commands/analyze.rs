//! # Analyze Command / 分析命令
//!
//! Builds the analytics report from the screenshot tree of past runs.
//!
//! 根据过去运行的截图树生成分析报告。

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::*;
use tracing::warn;

use crate::core::config::{ConfigOverrides, load_config};
use crate::infra::fs::{FsArtifactStore, is_directory};
use crate::infra::t;
use crate::infra::workbook::Workbook;
use crate::reporting::analytics::{DescriptionLookup, generate_analytics_report};

/// Executes the analyze command. `output` overrides the configured report directory.
pub fn execute(config_path: &Path, overrides: ConfigOverrides, output: Option<PathBuf>) -> Result<()> {
    let explicit_language = overrides.language.is_some();
    let mut config = load_config(config_path)?;
    config.apply(overrides);
    if !explicit_language && !config.language.is_empty() {
        crate::set_language(&config.language);
    }

    let root = config.screenshot_root()?;
    if !is_directory(&root) {
        anyhow::bail!(t!("analyze.no_screenshot_dir", path = root.display()).to_string());
    }

    // Descriptions are optional; a missing or broken workbook only loses them.
    let workbook_path = config.workbook_path()?;
    let workbook = match Workbook::load(&workbook_path) {
        Ok(workbook) => Some(workbook),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "analytics without step descriptions");
            println!(
                "{}",
                t!("analyze.workbook_unavailable", path = workbook_path.display()).yellow()
            );
            None
        }
    };
    let lookup = workbook
        .as_ref()
        .map(|wb| DescriptionLookup::new(wb, &config.module_sheet));

    println!("{}", t!("analyze.analyzing", path = root.display()).cyan());
    let out_dir = match output {
        Some(dir) => dir,
        None => config.analytics_root()?,
    };
    let (report_path, executions) =
        generate_analytics_report(&FsArtifactStore, &root, lookup.as_ref(), &out_dir)?;

    println!(
        "{}",
        t!("analyze.found_executions", count = executions.len()).green()
    );
    println!(
        "{}",
        t!("analyze.report_generated", path = report_path.display()).green().bold()
    );
    Ok(())
}
