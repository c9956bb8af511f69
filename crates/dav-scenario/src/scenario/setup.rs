//! 虚拟用户初始化

use tracing::{info, instrument};

use super::SharedContext;
use crate::account::Account;
use crate::credential::{TokenExchange, resolve_credential};
use crate::error::ScenarioError;

/// 解析凭证并构造共享状态
///
/// 每个虚拟用户在任何迭代之前调用一次。失败时该虚拟用户不执行任何迭代。
#[instrument(skip(exchange, account), fields(login = %account.login))]
pub async fn setup<E>(
    exchange: &E,
    account: &Account,
    oidc_enabled: bool,
) -> Result<SharedContext, ScenarioError>
where
    E: TokenExchange + ?Sized,
{
    let credential = resolve_credential(exchange, account, oidc_enabled).await?;
    info!(kind = credential.kind(), "虚拟用户凭证已就绪");
    Ok(SharedContext::new(credential))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, MockTokenExchange, Token};

    #[tokio::test]
    async fn test_setup_direct_returns_account() {
        let mut exchange = MockTokenExchange::new();
        exchange.expect_exchange().never();

        let account = Account::new("einstein", "relativity");
        let context = setup(&exchange, &account, false).await.unwrap();

        assert_eq!(context.credential(), &Credential::Account(account));
    }

    #[tokio::test]
    async fn test_setup_token_returns_exchange_result() {
        let mut exchange = MockTokenExchange::new();
        exchange
            .expect_exchange()
            .times(1)
            .returning(|_| Ok(Token::bearer("vu-token")));

        let account = Account::new("einstein", "relativity");
        let context = setup(&exchange, &account, true).await.unwrap();

        assert_eq!(
            context.credential(),
            &Credential::Token(Token::bearer("vu-token"))
        );
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal() {
        let mut exchange = MockTokenExchange::new();
        exchange.expect_exchange().times(1).returning(|account| {
            Err(ScenarioError::Authentication {
                login: account.login.clone(),
                message: "令牌端点不可达".to_string(),
            })
        });

        let account = Account::new("einstein", "relativity");
        let err = setup(&exchange, &account, true).await.unwrap_err();
        assert!(err.is_setup_error());
    }
}
