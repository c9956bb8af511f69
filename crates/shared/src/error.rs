//! 统一错误处理模块
//!
//! 定义压测工具共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum LoadTestError {
    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== I/O 错误 ====================
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    // ==================== HTTP 错误 ====================
    #[error("HTTP 错误: {0}")]
    Http(#[from] reqwest::Error),

    // ==================== 验证错误 ====================
    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

impl LoadTestError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误（超时或连接失败）
    ///
    /// 场景本身从不重试，迭代失败日志据此标记瞬时故障。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
