//! WebDAV 文件操作实现
//!
//! 文件地址：`{host}/remote.php/dav/files/{user}/{file}`。

use std::time::Instant;

use async_trait::async_trait;
use loadtest_shared::config::TargetConfig;
use loadtest_shared::error::LoadTestError;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    ActionKind, DeleteResult, DownloadResult, FileHandle, FilePlaybook, FileRequest, UploadRequest,
    UploadResult,
};
use crate::asset::Asset;
use crate::error::ScenarioError;

/// 按目标配置创建 HTTP 客户端
///
/// 连接池在所有虚拟用户间共享，clone 是廉价操作。
pub fn build_http_client(target: &TargetConfig) -> Result<Client, ScenarioError> {
    let client = Client::builder()
        .timeout(target.request_timeout())
        .danger_accept_invalid_certs(target.insecure_skip_tls_verify)
        .build()
        .map_err(LoadTestError::Http)?;
    Ok(client)
}

/// WebDAV 剧本
#[derive(Clone)]
pub struct DavPlaybook {
    client: Client,
    base_url: String,
}

impl DavPlaybook {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 用户名和文件名按路径段编码，`#`、`?` 等字符不会截断路径
    fn file_url(&self, user_name: &str, file_name: &str) -> Result<Url, ScenarioError> {
        let invalid_host = |message: String| LoadTestError::InvalidArgument {
            field: "host".to_string(),
            message,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid_host(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid_host(format!("{} 不能作为基础地址", self.base_url)))?
            .pop_if_empty()
            .extend(["remote.php", "dav", "files", user_name, file_name]);
        Ok(url)
    }

    /// 远端文件名：`{asset}-{唯一 ID}`，避免不同迭代和虚拟用户之间冲突
    fn unique_file_name(asset: &Asset) -> String {
        format!("{}-{}", asset.name, Uuid::new_v4().simple())
    }

    /// 发送请求并校验状态码
    async fn send(
        &self,
        action: ActionKind,
        request: RequestBuilder,
        expected: &[StatusCode],
    ) -> Result<Response, ScenarioError> {
        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| ScenarioError::Transport {
                action,
                message: e.to_string(),
            })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(%action, status = status.as_u16(), latency_ms, "WebDAV 请求完成");

        if !expected.contains(&status) {
            warn!(%action, status = status.as_u16(), "WebDAV 返回非预期状态码");
            return Err(ScenarioError::UnexpectedStatus {
                action,
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl FilePlaybook for DavPlaybook {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResult, ScenarioError> {
        let file_name = FileHandle::new(Self::unique_file_name(&request.asset))?;
        let url = self.file_url(&request.user_name, file_name.as_str())?;

        let builder = request
            .credential
            .authorize(self.client.put(url))
            .body(request.asset.content.clone());

        // 同名文件已存在时服务端返回 204
        let response = self
            .send(
                ActionKind::Upload,
                builder,
                &[StatusCode::CREATED, StatusCode::NO_CONTENT],
            )
            .await?;

        Ok(UploadResult {
            file_name,
            status: response.status().as_u16(),
        })
    }

    async fn download(&self, request: &FileRequest) -> Result<DownloadResult, ScenarioError> {
        let url = self.file_url(&request.user_name, request.file_name.as_str())?;
        let builder = request.credential.authorize(self.client.get(url));

        let response = self
            .send(ActionKind::Download, builder, &[StatusCode::OK])
            .await?;
        let status = response.status().as_u16();

        let body = response
            .bytes()
            .await
            .map_err(|e| ScenarioError::Transport {
                action: ActionKind::Download,
                message: e.to_string(),
            })?;

        Ok(DownloadResult {
            bytes: body.len(),
            status,
        })
    }

    async fn delete(&self, request: &FileRequest) -> Result<DeleteResult, ScenarioError> {
        let url = self.file_url(&request.user_name, request.file_name.as_str())?;
        let builder = request.credential.authorize(self.client.delete(url));

        let response = self
            .send(ActionKind::Delete, builder, &[StatusCode::NO_CONTENT])
            .await?;

        Ok(DeleteResult {
            status: response.status().as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        let playbook = DavPlaybook::new(Client::new(), "https://localhost:9200/");
        assert_eq!(
            playbook.file_url("einstein", "testfile.bin-42").unwrap().as_str(),
            "https://localhost:9200/remote.php/dav/files/einstein/testfile.bin-42"
        );

        let playbook = DavPlaybook::new(Client::new(), "https://cloud.example.com/ocis");
        assert_eq!(
            playbook.file_url("marie", "a.bin").unwrap().as_str(),
            "https://cloud.example.com/ocis/remote.php/dav/files/marie/a.bin"
        );
    }

    #[test]
    fn test_file_url_encodes_reserved_characters() {
        let playbook = DavPlaybook::new(Client::new(), "https://localhost:9200");
        let url = playbook
            .file_url("einstein", "report#1 draft?.bin-42")
            .unwrap();

        assert_eq!(
            url.path(),
            "/remote.php/dav/files/einstein/report%231%20draft%3F.bin-42"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
        assert_eq!(
            url.path_segments().unwrap().last(),
            Some("report%231%20draft%3F.bin-42")
        );
    }

    #[test]
    fn test_file_url_rejects_invalid_host() {
        let playbook = DavPlaybook::new(Client::new(), "not a url");
        let err = playbook.file_url("einstein", "a.bin").unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Shared(LoadTestError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_unique_file_name() {
        let asset = Asset::new("testfile.bin", vec![0u8; 16]);
        let first = DavPlaybook::unique_file_name(&asset);
        let second = DavPlaybook::unique_file_name(&asset);

        assert!(first.starts_with("testfile.bin-"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&TargetConfig::default());
        assert!(client.is_ok());
    }
}
