//! 迭代执行器
//!
//! 严格按 上传 -> 停顿 -> 下载 -> 停顿 -> 删除 -> 停顿 的顺序执行。
//! 任一操作失败即终止本次迭代，不重试、不回滚，后续步骤不再执行。

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use super::{IterationFailure, IterationReport, IterationState, ScenarioSettings, SharedContext};
use crate::playbook::{FilePlaybook, FileRequest, UploadRequest};

/// 场景执行器
///
/// 不持有跨迭代的可变状态，文件名只在单次迭代内传递。
pub struct ScenarioExecutor {
    playbook: Arc<dyn FilePlaybook>,
    settings: Arc<ScenarioSettings>,
}

impl ScenarioExecutor {
    pub fn new(playbook: Arc<dyn FilePlaybook>, settings: Arc<ScenarioSettings>) -> Self {
        Self { playbook, settings }
    }

    /// 执行一次迭代
    #[instrument(skip(self, context), fields(user = %self.settings.user_name))]
    pub async fn run_iteration(
        &self,
        context: &SharedContext,
    ) -> Result<IterationReport, IterationFailure> {
        let start = Instant::now();
        let credential = context.credential().clone();
        let user_name = self.settings.user_name.clone();

        let uploaded = self
            .playbook
            .upload(&UploadRequest {
                credential: credential.clone(),
                user_name: user_name.clone(),
                asset: Arc::clone(&self.settings.asset),
            })
            .await
            .map_err(IterationFailure::at(IterationState::Start))?;
        debug!(file_name = %uploaded.file_name, state = %IterationState::Uploaded, "上传完成");

        self.pace().await;

        // 下载和删除使用同一个文件名
        let request = FileRequest {
            credential,
            user_name,
            file_name: uploaded.file_name,
        };

        let downloaded = self
            .playbook
            .download(&request)
            .await
            .map_err(IterationFailure::at(IterationState::Uploaded))?;
        debug!(
            file_name = %request.file_name,
            bytes = downloaded.bytes,
            state = %IterationState::Downloaded,
            "下载完成"
        );

        self.pace().await;

        self.playbook
            .delete(&request)
            .await
            .map_err(IterationFailure::at(IterationState::Downloaded))?;
        debug!(file_name = %request.file_name, state = %IterationState::Deleted, "删除完成");

        self.pace().await;

        Ok(IterationReport {
            file_name: request.file_name,
            state: IterationState::Done,
            duration: start.elapsed(),
        })
    }

    async fn pace(&self) {
        if !self.settings.pacing.is_zero() {
            sleep(self.settings.pacing).await;
        }
    }
}
