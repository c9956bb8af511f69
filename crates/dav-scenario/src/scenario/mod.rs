//! 场景编排
//!
//! 宿主运行时通过两个入口驱动场景：
//!
//! - `setup` - 每个虚拟用户执行一次，解析凭证并返回 [`SharedContext`]
//! - `ScenarioExecutor::run_iteration` - 每次迭代执行上传 -> 下载 -> 删除
//!
//! # 使用示例
//!
//! ```rust,ignore
//! let context = setup(&exchange, &account, config.auth.oidc_enabled).await?;
//! let executor = ScenarioExecutor::new(playbook, settings);
//! for _ in 0..iterations {
//!     executor.run_iteration(&context).await?;
//! }
//! ```

mod executor;
mod setup;

pub use executor::ScenarioExecutor;
pub use setup::setup;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::Asset;
use crate::credential::Credential;
use crate::error::ScenarioError;
use crate::playbook::FileHandle;

/// 场景的静态参数
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    /// 请求中使用的用户名
    pub user_name: String,
    pub asset: Arc<Asset>,
    /// 操作之间的固定停顿
    pub pacing: Duration,
}

/// 虚拟用户级共享状态
///
/// 由 `setup` 构造一次，之后所有迭代只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContext {
    credential: Credential,
}

impl SharedContext {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// 单次迭代的状态机，只能向前推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IterationState {
    Start,
    Uploaded,
    Downloaded,
    /// 删除成功后最后一次停顿期间的过渡状态，停顿不会失败，因此不会出现在失败统计中
    Deleted,
    Done,
}

impl IterationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Uploaded => "uploaded",
            Self::Downloaded => "downloaded",
            Self::Deleted => "deleted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for IterationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成功完成的迭代
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub file_name: FileHandle,
    pub state: IterationState,
    pub duration: Duration,
}

/// 迭代失败，记录中止时所处的状态
#[derive(Debug, thiserror::Error)]
#[error("迭代在 {state} 状态中止: {error}")]
pub struct IterationFailure {
    pub state: IterationState,
    #[source]
    pub error: ScenarioError,
}

impl IterationFailure {
    /// 返回把错误标记在指定状态上的转换函数
    pub fn at(state: IterationState) -> impl FnOnce(ScenarioError) -> Self {
        move |error| Self { state, error }
    }
}
