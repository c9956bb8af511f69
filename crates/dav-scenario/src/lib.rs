//! WebDAV 文件操作压测场景
//!
//! 模拟一个用户对远端文件存储执行 上传 -> 下载 -> 删除，
//! 凭证在每个虚拟用户启动时解析一次并在所有迭代中复用。
//!
//! # 主要模块
//!
//! - `account`: 已知测试账号
//! - `credential`: 凭证类型与令牌交换
//! - `asset`: 上传用的测试文件
//! - `playbook`: 上传/下载/删除操作
//! - `scenario`: 初始化与迭代编排
//! - `driver`: 按虚拟用户数和迭代次数驱动场景
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dav_scenario::account::Account;
//! use dav_scenario::asset::Asset;
//! use dav_scenario::credential::OidcTokenExchange;
//! use dav_scenario::playbook::DavPlaybook;
//! use dav_scenario::scenario::{ScenarioExecutor, ScenarioSettings, setup};
//!
//! let client = reqwest::Client::new();
//! let account = Account::new("einstein", "relativity");
//! let exchange = OidcTokenExchange::new(client.clone(), token_url, "web", "openid");
//! let context = setup(&exchange, &account, false).await?;
//!
//! let executor = ScenarioExecutor::new(
//!     Arc::new(DavPlaybook::new(client, "https://localhost:9200")),
//!     Arc::new(ScenarioSettings {
//!         user_name: account.login.clone(),
//!         asset: Arc::new(Asset::new("testfile.bin", vec![0u8; 1024])),
//!         pacing: std::time::Duration::from_secs(1),
//!     }),
//! );
//! let report = executor.run_iteration(&context).await?;
//! ```

pub mod account;
pub mod asset;
pub mod cli;
pub mod credential;
pub mod driver;
pub mod error;
pub mod playbook;
pub mod scenario;
