//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// WebDAV 文件操作压测工具
///
/// 每个虚拟用户循环执行 上传 -> 下载 -> 删除。
/// 使用 `--help` 查看各子命令的详细说明。
#[derive(Parser, Debug)]
#[command(name = "dav-load")]
#[command(version, about = "WebDAV 文件操作压测工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 配置文件路径（TOML/YAML/JSON）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 运行上传/下载/删除场景
    ///
    /// 未指定的参数使用配置文件或环境变量中的值。
    Run {
        /// 虚拟用户数
        #[arg(long)]
        vus: Option<usize>,

        /// 每个虚拟用户的迭代次数
        #[arg(short, long)]
        iterations: Option<usize>,

        /// 测试账号名
        #[arg(short, long)]
        account: Option<String>,

        /// 上传的测试文件名
        #[arg(long)]
        asset: Option<String>,

        /// 存储服务地址
        #[arg(long)]
        host: Option<String>,

        /// 使用 OIDC 令牌认证
        #[arg(long)]
        oidc: bool,

        /// 以 JSON 输出运行结果
        #[arg(long)]
        json: bool,
    },

    /// 列出可用的测试账号
    Accounts,
}
