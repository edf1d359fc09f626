//! Subcommand implementations / 子命令实现

pub mod analyze;
pub mod init;
pub mod run;
