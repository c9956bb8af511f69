//! 上传用的测试文件

use std::path::PathBuf;

use loadtest_shared::error::LoadTestError;
use tracing::debug;

use crate::error::ScenarioError;

/// 测试文件
///
/// 进程启动时加载一次，之后只读共享。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub content: Vec<u8>,
}

impl Asset {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// 从目录中按名称读取测试文件
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn load(&self, name: &str) -> Result<Asset, ScenarioError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(LoadTestError::InvalidArgument {
                field: "asset".to_string(),
                message: format!("非法的文件名: {name:?}"),
            }
            .into());
        }

        let path = self.dir.join(name);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScenarioError::AssetNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(LoadTestError::Io(e).into()),
        };

        debug!(path = %path.display(), size = content.len(), "测试文件已加载");
        Ok(Asset::new(name, content))
    }
}
