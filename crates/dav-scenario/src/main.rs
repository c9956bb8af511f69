//! dav-load CLI
//!
//! 压测工具的命令行入口点。

use anyhow::Context;
use clap::Parser;
use dav_scenario::cli::{Cli, CommandRunner, Commands, RunOverrides};
use loadtest_shared::config::AppConfig;
use loadtest_shared::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("加载配置失败")?;

    // 命令行日志级别优先于配置文件，RUST_LOG 又优先于两者
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    observability::init(&config.observability)?;

    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Run {
            vus,
            iterations,
            account,
            asset,
            host,
            oidc,
            json,
        } => {
            let overrides = RunOverrides {
                vus,
                iterations,
                account,
                asset,
                host,
                oidc,
            };
            runner.run_scenario(overrides, json).await?;
        }
        Commands::Accounts => {
            runner.list_accounts();
        }
    }

    Ok(())
}
