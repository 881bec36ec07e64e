//! Bank accounts and the directory for fetching the current user's accounts.

use std::{fmt::Display, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, api::AccountApi, auth::SessionStore, id::string_or_number};

/// The ID of a bank account.
///
/// The server sends account IDs as numbers in some payloads and as strings in
/// others, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(#[serde(deserialize_with = "string_or_number")] String);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether an account can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// The account can send and receive money.
    Active,
    /// The account has been frozen, e.g. by an administrator.
    Locked,
    /// The account has been closed.
    Closed,
}

impl Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Locked => "LOCKED",
            AccountStatus::Closed => "CLOSED",
        };

        f.pad(text)
    }
}

/// A bank account as last reported by the server.
///
/// This is a transient copy: the server's ledger is authoritative and the
/// balance may already be out of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account holder.
    pub holder_name: String,
    /// The balance at the time the account was fetched.
    pub balance: Decimal,
    /// Whether the account can be used.
    pub status: AccountStatus,
    /// The most that can be sent from this account per day, if limited.
    #[serde(default)]
    pub daily_limit: Option<Decimal>,
    /// When the server last changed the account.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

impl Account {
    /// Whether the account may be chosen as the source of a transfer.
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Get the total balance across `accounts`.
pub fn total_balance(accounts: &[Account]) -> Decimal {
    accounts.iter().map(|account| account.balance).sum()
}

/// Fetches the accounts of the logged in user.
///
/// Nothing is cached: every call is a fresh read from the server.
#[derive(Clone)]
pub struct AccountDirectory {
    session: Arc<SessionStore>,
    api: Arc<dyn AccountApi>,
}

impl AccountDirectory {
    /// Create a directory that authorizes its calls with `session`.
    pub fn new(session: Arc<SessionStore>, api: Arc<dyn AccountApi>) -> Self {
        Self { session, api }
    }

    /// Get every account owned by the logged in user.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthenticated] without calling the server if there is
    /// no valid session, and any error returned by the server otherwise.
    pub async fn list_my_accounts(&self) -> Result<Vec<Account>, Error> {
        let token = self.session.access_token()?;
        let result = self.api.my_accounts(&token).await;

        self.session.check_authorized(&token, result)
    }

    /// Get the accounts of the logged in user that can send money.
    ///
    /// # Errors
    ///
    /// The same as [AccountDirectory::list_my_accounts].
    pub async fn transfer_sources(&self) -> Result<Vec<Account>, Error> {
        let mut accounts = self.list_my_accounts().await?;
        accounts.retain(Account::is_active);

        Ok(accounts)
    }

    /// Get a single account.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the account does not exist, and the same
    /// errors as [AccountDirectory::list_my_accounts] otherwise.
    pub async fn get_account(&self, id: &AccountId) -> Result<Account, Error> {
        let token = self.session.access_token()?;
        let result = self.api.account(&token, id).await;

        self.session.check_authorized(&token, result)
    }
}
