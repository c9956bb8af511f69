//! 命令执行器
//!
//! 负责把命令行参数合并进配置，并组装场景所需的各个组件。

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use loadtest_shared::config::AppConfig;
use loadtest_shared::error::LoadTestError;
use tracing::{error, info};

use crate::account::KnownAccounts;
use crate::asset::AssetStore;
use crate::credential::OidcTokenExchange;
use crate::driver::{RunOptions, RunSummary, ScenarioDriver};
use crate::playbook::{DavPlaybook, build_http_client};
use crate::scenario::{ScenarioExecutor, ScenarioSettings};

/// run 子命令中可覆盖配置的参数
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub vus: Option<usize>,
    pub iterations: Option<usize>,
    pub account: Option<String>,
    pub asset: Option<String>,
    pub host: Option<String>,
    /// 只能打开 OIDC，不能通过命令行关闭配置中已开启的 OIDC
    pub oidc: bool,
}

impl RunOverrides {
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(vus) = self.vus {
            config.run.vus = vus;
        }
        if let Some(iterations) = self.iterations {
            config.run.iterations = iterations;
        }
        if let Some(account) = self.account {
            config.scenario.account = account;
        }
        if let Some(asset) = self.asset {
            config.scenario.asset = asset;
        }
        if let Some(host) = self.host {
            config.target.host = host;
        }
        if self.oidc {
            config.auth.oidc_enabled = true;
        }
    }
}

/// 命令执行器
///
/// 作为 CLI 与场景逻辑之间的桥梁，简化 main 函数的复杂度。
pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 执行 run 命令
    pub async fn run_scenario(mut self, overrides: RunOverrides, json: bool) -> Result<()> {
        overrides.apply(&mut self.config);
        Self::validate(&self.config)?;

        let summary = self.build_driver().await?.run(&RunOptions::from(&self.config.run)).await;

        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("序列化运行结果失败")?
            );
        } else {
            Self::print_summary(&summary);
        }

        if !summary.is_all_success() {
            for (state, count) in &summary.failures_by_state {
                error!(state = %state, count, "迭代失败");
            }
            bail!(
                "场景运行存在失败: {} 个虚拟用户初始化失败, {}/{} 次迭代失败",
                summary.vus_failed,
                summary.iterations_failed,
                summary.iterations_total()
            );
        }

        Ok(())
    }

    /// 执行 accounts 命令
    pub fn list_accounts(&self) {
        let accounts = KnownAccounts::with_overrides(&self.config.accounts);
        println!("\n可用的测试账号:");
        println!("{}", "-".repeat(40));
        for (name, account) in accounts.iter() {
            let marker = if name == self.config.scenario.account {
                " (当前)"
            } else {
                ""
            };
            println!("  {} - login: {}{}", name, account.login, marker);
        }
        println!("{}", "-".repeat(40));
    }

    fn validate(config: &AppConfig) -> Result<(), LoadTestError> {
        if config.run.vus == 0 {
            return Err(LoadTestError::InvalidArgument {
                field: "vus".to_string(),
                message: "至少需要 1 个虚拟用户".to_string(),
            });
        }
        if config.target.host.trim().is_empty() {
            return Err(LoadTestError::InvalidArgument {
                field: "host".to_string(),
                message: "存储服务地址不能为空".to_string(),
            });
        }
        Ok(())
    }

    /// 组装驱动器：账号、测试文件、HTTP 客户端、剧本和令牌交换
    async fn build_driver(&self) -> Result<ScenarioDriver> {
        let config = &self.config;

        let accounts = KnownAccounts::with_overrides(&config.accounts);
        let account = accounts.get(&config.scenario.account)?.clone();

        let asset = AssetStore::new(&config.scenario.assets_dir)
            .load(&config.scenario.asset)
            .await?;

        info!(
            environment = %config.environment,
            host = %config.target.host,
            login = %account.login,
            asset = %asset.name,
            asset_size = asset.size(),
            oidc_enabled = config.auth.oidc_enabled,
            "场景组件已就绪"
        );

        let client = build_http_client(&config.target)?;
        let playbook = Arc::new(DavPlaybook::new(client.clone(), config.target.base_url()));
        let exchange = Arc::new(OidcTokenExchange::new(
            client,
            config.token_url(),
            config.auth.client_id.clone(),
            config.auth.scope.clone(),
        ));

        let settings = Arc::new(ScenarioSettings {
            user_name: account.login.clone(),
            asset: Arc::new(asset),
            pacing: config.scenario.pacing(),
        });
        let executor = Arc::new(ScenarioExecutor::new(playbook, settings));

        Ok(ScenarioDriver::new(
            exchange,
            account,
            config.auth.oidc_enabled,
            executor,
        ))
    }

    fn print_summary(summary: &RunSummary) {
        println!("\n场景运行结果:");
        println!("{}", "-".repeat(40));
        println!("虚拟用户数: {}", summary.vus);
        println!("初始化失败: {}", summary.vus_failed);
        println!("成功迭代: {}", summary.iterations_succeeded);
        println!("失败迭代: {}", summary.iterations_failed);
        for (state, count) in &summary.failures_by_state {
            println!("  中止于 {}: {}", state, count);
        }
        if summary.aborted {
            println!("已因超出时长上限而中止");
        }
        println!("执行耗时: {} ms", summary.duration_ms);
        println!("成功率: {:.1}%", summary.success_rate());
        println!("{}", "-".repeat(40));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        RunOverrides {
            vus: Some(8),
            iterations: Some(3),
            account: Some("marie".to_string()),
            asset: Some("testfile.bin".to_string()),
            host: Some("http://127.0.0.1:9200".to_string()),
            oidc: true,
        }
        .apply(&mut config);

        assert_eq!(config.run.vus, 8);
        assert_eq!(config.run.iterations, 3);
        assert_eq!(config.scenario.account, "marie");
        assert_eq!(config.scenario.asset, "testfile.bin");
        assert_eq!(config.target.host, "http://127.0.0.1:9200");
        assert!(config.auth.oidc_enabled);
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = AppConfig::default();
        config.auth.oidc_enabled = true;
        config.run.iterations = 7;

        RunOverrides::default().apply(&mut config);

        assert!(config.auth.oidc_enabled);
        assert_eq!(config.run.iterations, 7);
        assert_eq!(config.scenario.account, "einstein");
    }

    #[test]
    fn test_validate_rejects_zero_vus() {
        let mut config = AppConfig::default();
        config.run.vus = 0;
        let err = CommandRunner::validate(&config).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert!(CommandRunner::validate(&AppConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_for_unknown_account() {
        let mut config = AppConfig::default();
        config.scenario.account = "nobody".to_string();

        let result = CommandRunner::new(config)
            .run_scenario(RunOverrides::default(), false)
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }
}
