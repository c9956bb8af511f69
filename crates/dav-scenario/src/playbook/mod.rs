//! 文件操作剧本
//!
//! 上传、下载、删除三个操作的请求/结果类型和统一接口。
//! 状态码检查等成败判定由具体实现负责，场景执行器只负责串联文件名。
//!
//! - `dav` - 基于 WebDAV 的 HTTP 实现

mod dav;

pub use dav::{DavPlaybook, build_http_client};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::asset::Asset;
use crate::credential::Credential;
use crate::error::ScenarioError;

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upload,
    Download,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 上传生成的远端文件名
///
/// 只在一次迭代内有效，构造时保证非空。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(name: impl Into<String>) -> Result<Self, ScenarioError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScenarioError::EmptyFileHandle);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub credential: Credential,
    pub user_name: String,
    pub asset: Arc<Asset>,
}

/// 下载/删除请求
#[derive(Debug, Clone)]
pub struct FileRequest {
    pub credential: Credential,
    pub user_name: String,
    pub file_name: FileHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub file_name: FileHandle,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub bytes: usize,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    pub status: u16,
}

/// 文件操作接口
///
/// 提取 trait 使执行器可以在测试中替换为 mock，无需真实存储服务。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilePlaybook: Send + Sync {
    /// 上传测试文件，返回新建的远端文件名
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResult, ScenarioError>;

    async fn download(&self, request: &FileRequest) -> Result<DownloadResult, ScenarioError>;

    async fn delete(&self, request: &FileRequest) -> Result<DeleteResult, ScenarioError>;
}
