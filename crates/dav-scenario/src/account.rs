//! 测试账号
//!
//! 内置 ownCloud 演示环境的已知账号，可通过配置追加或覆盖。

use std::collections::BTreeMap;
use std::fmt;

use loadtest_shared::config::AccountConfig;

use crate::error::ScenarioError;

/// 测试身份
///
/// 配置加载后不再修改。
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub login: String,
    pub password: String,
}

impl Account {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// 日志中不输出密码
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

impl From<AccountConfig> for Account {
    fn from(config: AccountConfig) -> Self {
        Self::new(config.login, config.password)
    }
}

/// 已知账号集合
#[derive(Debug, Clone)]
pub struct KnownAccounts {
    accounts: BTreeMap<String, Account>,
}

impl KnownAccounts {
    /// 演示环境自带的账号
    pub fn builtin() -> Self {
        let accounts = [
            ("admin", "admin"),
            ("einstein", "relativity"),
            ("richard", "superfluidity"),
            ("marie", "radioactivity"),
            ("moss", "vista"),
            ("katherine", "gemini"),
        ]
        .into_iter()
        .map(|(login, password)| (login.to_string(), Account::new(login, password)))
        .collect();

        Self { accounts }
    }

    /// 内置账号 + 配置中的账号，同名时以配置为准
    pub fn with_overrides(configured: &BTreeMap<String, AccountConfig>) -> Self {
        let mut known = Self::builtin();
        for (name, config) in configured {
            known
                .accounts
                .insert(name.clone(), Account::from(config.clone()));
        }
        known
    }

    pub fn get(&self, name: &str) -> Result<&Account, ScenarioError> {
        self.accounts
            .get(name)
            .ok_or_else(|| ScenarioError::UnknownAccount {
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Account)> {
        self.accounts.iter().map(|(name, account)| (name.as_str(), account))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
