//! The remote collaborators of the client: the banking API, split by concern.
//!
//! [http::HttpBankApi] implements every trait against the REST API. Tests use
//! an in-memory fake.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    Error,
    account::{Account, AccountId},
    dashboard::UserProfile,
    history::TransactionQuery,
    pagination::Page,
    transaction::Transaction,
    transfer::{TransferRequest, TransferResult},
};

pub mod http;

/// A bearer token for authorized calls.
///
/// Obtain one from [crate::auth::SessionStore::access_token], which refuses
/// to hand out an expired token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(********)")
    }
}

/// The response to a successful sign in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignInResponse {
    /// The bearer token, a JWT.
    pub token: String,
    /// The name of the user the token was issued to.
    pub username: String,
    /// The roles granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Sign in with a username and password.
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResponse, Error>;

    /// Tell the server the token is no longer in use.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), Error>;
}

/// Reads bank accounts.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// The accounts owned by the holder of `token`.
    async fn my_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, Error>;

    /// A single account.
    async fn account(&self, token: &AccessToken, id: &AccountId) -> Result<Account, Error>;
}

/// Reads the profile of the logged in user.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// The profile of the holder of `token`.
    async fn profile(&self, token: &AccessToken) -> Result<UserProfile, Error>;
}

/// Submits transfers.
#[async_trait]
pub trait TransferApi: Send + Sync {
    /// Submit `request` once. Implementations must not retry.
    async fn submit_transfer(
        &self,
        token: &AccessToken,
        request: &TransferRequest,
    ) -> Result<TransferResult, Error>;
}

/// Queries transaction history.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// One page of the transactions that involve `account_id`.
    async fn account_transactions(
        &self,
        token: &AccessToken,
        account_id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, Error>;
}
