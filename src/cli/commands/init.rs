//! # Project Initialization Module / 项目初始化模块
//!
//! Interactive wizard creating a `GridRunner.toml` and a sample workbook
//! demonstrating test-case sheets and a reusable module.
//!
//! 交互式向导，创建 `GridRunner.toml` 以及一个演示测试用例工作表和可复用模块的示例工作簿。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: browser, endpoint and sheet prefix prompts
//! - **Sample Workbook**: a ready-to-edit login scenario using a module
//! - **Overwrite Protection**: confirmation before replacing an existing configuration
//!
//! - **交互式向导**: 浏览器、端点和工作表前缀提示
//! - **示例工作簿**: 使用模块的可编辑登录场景
//! - **覆盖保护**: 替换现有配置前进行确认

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use crate::core::config::{DEFAULT_CONFIG_FILE, RunnerConfig, expand_path};
use crate::infra::t;

const BROWSERS: [&str; 3] = ["chrome", "firefox", "MicrosoftEdge"];
const LANGUAGES: [&str; 2] = ["en", "zh-CN"];

/// Sample workbook written next to the configuration.
pub const SAMPLE_WORKBOOK: &str = r##"# Sample workbook / 示例工作簿
# Every sheet whose name starts with the configured prefix is a test case.
# 名称以配置前缀开头的每个工作表都是一个测试用例。

[[sheet]]
name = "Module"
rows = [
  { MODULENAME = "Login_Start" },
  { STEP = 1, STEPDESCRIPTION = "Enter user name", ACTIONTYPE = "FILL", LOCATORPATHTYPE = "getByLabel", LOCATORPATH = "Username", INPUTDATA = "tomsmith" },
  { STEP = 2, STEPDESCRIPTION = "Enter password", ACTIONTYPE = "FILL", LOCATORPATHTYPE = "getByLabel", LOCATORPATH = "Password", INPUTDATA = "SuperSecretPassword!" },
  { STEP = 3, STEPDESCRIPTION = "Submit", ACTIONTYPE = "CLICKBUTTON", LOCATORPATHTYPE = "getByRole", LOCATORPATH = "button" },
  { MODULENAME = "Login_End" },
]

[[sheet]]
name = "TestLogin"
rows = [
  { STEP = 1, STEPDESCRIPTION = "Open the login page", ACTIONTYPE = "OPENURL", INPUTDATA = "https://the-internet.herokuapp.com/login" },
  { STEP = 2, STEPDESCRIPTION = "Log in", ACTIONTYPE = "GETMODULE", INPUTDATA = "Login" },
  { STEP = 3, STEPDESCRIPTION = "Flash message is shown", ACTIONTYPE = "ValidateElementtobeVisible", LOCATORPATHTYPE = "locator", LOCATORPATH = "#flash" },
  { STEP = 4, STEPDESCRIPTION = "Whole page", ACTIONTYPE = "TAKEFullPageScreenshot" },
]
"##;

/// Runs the interactive wizard to generate a `GridRunner.toml` file.
///
/// With `non_interactive` the defaults are written without prompting.
///
/// 运行交互式向导以生成 `GridRunner.toml` 文件。`non_interactive` 时不提示，直接写入默认值。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILE);
    let theme = ColorfulTheme::default();

    if !non_interactive {
        println!("\n{}", t!("init.welcome").cyan().bold());
        println!("{}", t!("init.description"));
    }

    if config_path.exists() && !non_interactive {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed").to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted"));
            return Ok(());
        }
    }

    let mut config = RunnerConfig {
        language: language.to_string(),
        ..RunnerConfig::default()
    };
    let mut write_sample = true;

    if !non_interactive {
        let lang_index = LANGUAGES.iter().position(|l| *l == language).unwrap_or(0);
        let selected = Select::with_theme(&theme)
            .with_prompt(t!("init.language_prompt"))
            .items(&LANGUAGES)
            .default(lang_index)
            .interact()
            .context(t!("init.confirmation_failed").to_string())?;
        config.language = LANGUAGES[selected].to_string();

        let browser = Select::with_theme(&theme)
            .with_prompt(t!("init.browser_prompt"))
            .items(&BROWSERS)
            .default(0)
            .interact()
            .context(t!("init.confirmation_failed").to_string())?;
        config.browser.browser = BROWSERS[browser].to_string();

        config.browser.webdriver_url = Input::with_theme(&theme)
            .with_prompt(t!("init.webdriver_prompt"))
            .default(config.browser.webdriver_url.clone())
            .interact_text()?;
        config.browser.headless = Confirm::with_theme(&theme)
            .with_prompt(t!("init.headless_prompt"))
            .default(config.browser.headless)
            .interact()?;
        config.sheet_prefix = Input::with_theme(&theme)
            .with_prompt(t!("init.prefix_prompt"))
            .default(config.sheet_prefix.clone())
            .interact_text()?;
        write_sample = Confirm::with_theme(&theme)
            .with_prompt(t!("init.sample_prompt"))
            .default(true)
            .interact()?;
    }

    write_config(config_path, &config)?;
    if write_sample {
        write_sample_workbook(&config)?;
    }
    println!("{}", t!("init.usage_hint"));
    Ok(())
}

fn write_config(path: &Path, config: &RunnerConfig) -> Result<()> {
    let toml_string =
        toml::to_string_pretty(config).context(t!("init.serialize_failed").to_string())?;
    fs::write(path, toml_string)
        .with_context(|| t!("init.write_failed", path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.created", path = path.display()).bold()
    );
    Ok(())
}

/// Writes [`SAMPLE_WORKBOOK`] at the configured workbook path unless a file is already there.
fn write_sample_workbook(config: &RunnerConfig) -> Result<()> {
    let path = expand_path(&config.workbook)?;
    if path.exists() {
        println!("{}", t!("init.sample_exists", path = path.display()).yellow());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| t!("init.write_failed", path = parent.display()).to_string())?;
    }
    let content = SAMPLE_WORKBOOK.replace("name = \"TestLogin\"", &format!("name = \"{}Login\"", config.sheet_prefix));
    fs::write(&path, content)
        .with_context(|| t!("init.write_failed", path = path.display()).to_string())?;
    println!(
        "{} {}",
        "✔".green(),
        t!("init.created", path = path.display()).bold()
    );
    Ok(())
}
