//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `run` - 运行上传/下载/删除场景
//! - `accounts` - 列出可用的测试账号
//!
//! # 使用示例
//!
//! ```bash
//! # 单用户单迭代
//! dav-load run
//!
//! # 10 个虚拟用户，每人 50 次迭代，使用 OIDC 令牌
//! dav-load run --vus 10 -i 50 --oidc --host https://ocis.example.com
//!
//! # 查看测试账号
//! dav-load accounts
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, RunOverrides};
