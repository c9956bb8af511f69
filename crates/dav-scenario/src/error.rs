//! 场景专用错误类型
//!
//! 在共享库 LoadTestError 基础上区分"初始化失败"和"单次操作失败"。
//! 前者终止整个虚拟用户，后者只终止当前迭代。

use loadtest_shared::error::LoadTestError;

use crate::playbook::ActionKind;

/// 场景执行错误
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("未知的测试账号: {name}")]
    UnknownAccount { name: String },

    #[error("测试文件不存在: {path}")]
    AssetNotFound { path: String },

    /// 令牌交换失败，虚拟用户无法启动
    #[error("认证失败: {login} - {message}")]
    Authentication { login: String, message: String },

    #[error("{action} 返回非预期状态码: {status}")]
    UnexpectedStatus { action: ActionKind, status: u16 },

    #[error("{action} 请求失败: {message}")]
    Transport { action: ActionKind, message: String },

    #[error("文件名不能为空")]
    EmptyFileHandle,

    #[error(transparent)]
    Shared(#[from] LoadTestError),
}

impl ScenarioError {
    /// 是否为虚拟用户初始化阶段的错误
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownAccount { .. } | Self::AssetNotFound { .. } | Self::Authentication { .. }
        )
    }

    /// 是否为瞬时故障（网络不可达、超时）
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }
}
