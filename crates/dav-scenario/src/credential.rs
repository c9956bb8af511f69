//! 凭证解析
//!
//! 每个虚拟用户只解析一次凭证：关闭 OIDC 时直接使用账号密码，
//! 开启时通过令牌端点换取访问令牌。两种凭证都通过 [`Credential::authorize`]
//! 附加到请求上，调用方无需关心具体类型。

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::error::ScenarioError;

// ---------------------------------------------------------------------------
// 凭证类型
// ---------------------------------------------------------------------------

/// 令牌端点返回的访问令牌
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// 可用于请求授权的凭证
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// 直接使用账号密码（Basic 认证）
    Account(Account),
    /// 令牌交换得到的访问令牌（Bearer 认证）
    Token(Token),
}

impl Credential {
    /// 为请求附加认证头
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Account(account) => request.basic_auth(&account.login, Some(&account.password)),
            Self::Token(token) => request.bearer_auth(&token.access_token),
        }
    }

    /// 凭证类型名称，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Token(_) => "token",
        }
    }
}

// ---------------------------------------------------------------------------
// 令牌交换
// ---------------------------------------------------------------------------

/// 以账号换取访问令牌
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, account: &Account) -> Result<Token, ScenarioError>;
}

/// 基于 OAuth2 密码模式的令牌交换
pub struct OidcTokenExchange {
    client: Client,
    token_url: String,
    client_id: String,
    scope: String,
}

impl OidcTokenExchange {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            scope: scope.into(),
        }
    }

    fn auth_error(account: &Account, message: impl Into<String>) -> ScenarioError {
        ScenarioError::Authentication {
            login: account.login.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl TokenExchange for OidcTokenExchange {
    async fn exchange(&self, account: &Account) -> Result<Token, ScenarioError> {
        debug!(login = %account.login, token_url = %self.token_url, "请求访问令牌");

        let form = [
            ("grant_type", "password"),
            ("username", account.login.as_str()),
            ("password", account.password.as_str()),
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Self::auth_error(account, format!("令牌端点不可达: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(login = %account.login, status = status.as_u16(), "令牌交换被拒绝");
            return Err(Self::auth_error(account, format!("令牌端点返回 {status}")));
        }

        let token: Token = response
            .json()
            .await
            .map_err(|e| Self::auth_error(account, format!("无法解析令牌响应: {e}")))?;

        if token.access_token.is_empty() {
            return Err(Self::auth_error(account, "令牌响应中缺少 access_token"));
        }

        info!(login = %account.login, token_type = %token.token_type, "访问令牌已获取");
        Ok(token)
    }
}

/// 根据配置选择凭证
///
/// 令牌模式下恰好调用一次交换，失败直接返回，不重试。
pub async fn resolve_credential<E>(
    exchange: &E,
    account: &Account,
    oidc_enabled: bool,
) -> Result<Credential, ScenarioError>
where
    E: TokenExchange + ?Sized,
{
    if oidc_enabled {
        let token = exchange.exchange(account).await?;
        Ok(Credential::Token(token))
    } else {
        Ok(Credential::Account(account.clone()))
    }
}
