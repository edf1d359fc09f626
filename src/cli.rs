//! # Command Line Interface / 命令行接口
//!
//! Builds the clap command tree with localized help text and routes each
//! subcommand to its implementation in [`commands`].
//!
//! 构建带有本地化帮助文本的 clap 命令树，并将每个子命令路由到 [`commands`] 中的实现。

pub mod commands;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::core::config::{ConfigOverrides, DEFAULT_CONFIG_FILE};
use crate::infra::logging::init_logging;
use crate::infra::t;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config").to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn string_arg(id: &'static str, help: String, value_name: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_name(value_name)
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    Command::new("grid-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.arg_verbose").to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about").to_string())
                .arg(config_arg())
                .arg(string_arg("workbook", t!("cli.arg_workbook").to_string(), "WORKBOOK"))
                .arg(string_arg("prefix", t!("cli.arg_prefix").to_string(), "PREFIX"))
                .arg(string_arg("screenshots", t!("cli.arg_screenshots").to_string(), "DIR"))
                .arg(string_arg("summary-dir", t!("cli.arg_summary_dir").to_string(), "DIR"))
                .arg(string_arg("webdriver-url", t!("cli.arg_webdriver_url").to_string(), "URL"))
                .arg(
                    Arg::new("headless")
                        .long("headless")
                        .help(t!("cli.arg_headless").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("analyze")
                .about(t!("cli.cmd_analyze_about").to_string())
                .arg(config_arg())
                .arg(string_arg("workbook", t!("cli.arg_workbook").to_string(), "WORKBOOK"))
                .arg(string_arg("screenshots", t!("cli.arg_screenshots").to_string(), "DIR"))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output").to_string())
                        .value_name("DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about").to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn overrides(matches: &ArgMatches, language: Option<String>) -> ConfigOverrides {
    let get = |id: &str| {
        matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .cloned()
    };
    ConfigOverrides {
        language,
        workbook: get("workbook"),
        sheet_prefix: get("prefix"),
        screenshot_dir: get("screenshots"),
        summary_dir: get("summary-dir"),
        webdriver_url: get("webdriver-url"),
        headless: matches
            .try_get_one::<bool>("headless")
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false),
    }
}

fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Parses the command line and runs the selected subcommand.
pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    let language = match &explicit_language {
        Some(lang) => crate::set_language(lang),
        None => crate::init(),
    };

    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));
    tracing::debug!(language, "locale selected");

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(
                &config_path(run_matches),
                overrides(run_matches, explicit_language),
            )
            .await
        }
        Some(("analyze", analyze_matches)) => commands::analyze::execute(
            &config_path(analyze_matches),
            overrides(analyze_matches, explicit_language),
            analyze_matches.get_one::<PathBuf>("output").cloned(),
        ),
        Some(("init", init_matches)) => {
            // Show language detection message if it was auto-detected
            if explicit_language.is_none() {
                println!("🌐 {}", t!("init.language_detected", lang = &language));
            }
            commands::init::run_init_wizard(&language, init_matches.get_flag("non-interactive"))
        }
        // `subcommand_required` makes clap print help and exit before this.
        _ => Ok(()),
    }
}
