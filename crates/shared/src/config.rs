//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 目标存储服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 存储服务基础地址，如 https://localhost:9200
    pub host: String,
    /// 开发环境证书通常是自签名的
    pub insecure_skip_tls_verify: bool,
    pub request_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "https://localhost:9200".to_string(),
            insecure_skip_tls_verify: true,
            request_timeout_secs: 60,
        }
    }
}

impl TargetConfig {
    /// 去掉末尾斜杠的基础地址
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 认证配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 是否通过 OIDC 换取令牌；关闭时直接使用账号密码
    pub oidc_enabled: bool,
    /// 令牌端点，未配置时使用 `{host}/konnect/v1/token`
    pub token_url: Option<String>,
    pub client_id: String,
    pub scope: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oidc_enabled: false,
            token_url: None,
            client_id: "web".to_string(),
            scope: "openid profile email".to_string(),
        }
    }
}

/// 场景配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 使用的测试账号名
    pub account: String,
    /// 上传的测试文件名
    pub asset: String,
    /// 测试文件所在目录
    pub assets_dir: String,
    /// 两次操作之间的停顿（秒）
    pub pacing_secs: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            account: "einstein".to_string(),
            asset: "kb_50.jpg".to_string(),
            assets_dir: "assets".to_string(),
            pacing_secs: 1.0,
        }
    }
}

impl ScenarioConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs_f64(self.pacing_secs.max(0.0))
    }
}

/// 运行参数
///
/// 虚拟用户数和每个虚拟用户的迭代次数。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub vus: usize,
    pub iterations: usize,
    /// 整体测试时长上限，超时后正在执行的迭代直接放弃
    pub max_duration_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            vus: 1,
            iterations: 1,
            max_duration_secs: None,
        }
    }
}

impl RunConfig {
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn is_json(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 配置文件中追加的测试账号
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccountConfig {
    pub login: String,
    pub password: String,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub target: TargetConfig,
    pub auth: AuthConfig,
    pub scenario: ScenarioConfig,
    pub run: RunConfig,
    pub observability: ObservabilityConfig,
    /// 按名称索引的额外账号，同名时覆盖内置账号
    pub accounts: BTreeMap<String, AccountConfig>,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 命令行指定的配置文件
    /// 4. 环境变量（LOADTEST_ 前缀，如 LOADTEST_TARGET__HOST -> target.host）
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("LOADTEST_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let mut builder = Config::builder()
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            );

        // 显式指定的文件必须存在
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let builder = builder.add_source(
            Environment::with_prefix("LOADTEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// 令牌端点地址
    pub fn token_url(&self) -> String {
        self.auth
            .token_url
            .clone()
            .unwrap_or_else(|| format!("{}/konnect/v1/token", self.target.base_url()))
    }
}
