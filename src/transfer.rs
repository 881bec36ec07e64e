//! Validating and submitting transfers between accounts.
//!
//! A transfer is checked locally before anything is sent: the same account on
//! both sides, a non-positive amount, an amount with more decimal places than
//! the currency allows, an inactive source account, or an amount above the
//! source account's last known balance are all rejected without a network
//! call. The server remains the authority and may still reject a transfer
//! that passes these checks.
//!
//! Each [TransferRequest] carries an [IdempotencyKey]. Submitting the same
//! request again reuses its key, so the server applies it at most once.
//! Building a new request mints a new key.

use std::{fmt::Display, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    account::{Account, AccountDirectory, AccountId, AccountStatus},
    api::TransferApi,
    auth::SessionStore,
    currency::Currency,
    transaction::{TransactionId, TransactionStatus},
};

/// A client-generated key that lets the server recognise a resubmitted
/// transfer.
///
/// Keys are time-ordered UUIDs, so they also record when the submission was
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Mint a new key.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The reasons a transfer may fail.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransferError {
    /// The source and destination are the same account.
    #[error("cannot transfer money to the same account")]
    SameAccount,

    /// The amount is zero or negative.
    #[error("the amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// The amount has more decimal places than the currency allows.
    #[error("{amount} has more decimal places than {currency} allows")]
    ExcessPrecision {
        /// The requested amount.
        amount: Decimal,
        /// The currency of the transfer.
        currency: Currency,
    },

    /// The source account is not one of the logged in user's accounts.
    #[error("account {0} is not one of your accounts")]
    SourceNotOwned(AccountId),

    /// The user's accounts could not be loaded, so nothing was sent.
    #[error("could not load your accounts: {0}")]
    AccountLookup(Error),

    /// The source account cannot send money.
    #[error("account {0} is {1} and cannot send money")]
    SourceNotActive(AccountId, AccountStatus),

    /// The amount is more than the source account's last known balance.
    #[error("insufficient funds: requested {requested} but the balance is {available}")]
    InsufficientFunds {
        /// The requested amount.
        requested: Decimal,
        /// The source account's balance when it was fetched.
        available: Decimal,
    },

    /// The transfer was submitted and the API call failed.
    #[error(transparent)]
    Api(#[from] Error),
}

impl TransferError {
    /// Whether the transfer was rejected before it was submitted.
    pub fn is_local(&self) -> bool {
        !matches!(self, TransferError::Api(_))
    }

    /// Whether the transfer was sent and no response arrived, i.e. the money
    /// may or may not have moved.
    ///
    /// Check the transaction history before submitting the request again.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, TransferError::Api(Error::Timeout))
    }
}

/// A validated transfer, ready to submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    source_account_id: AccountId,
    destination_account_id: AccountId,
    amount: Decimal,
    currency: Currency,
    idempotency_key: IdempotencyKey,
}

impl TransferRequest {
    /// Validate a transfer of `amount` from `source` to `destination` and
    /// mint its idempotency key.
    ///
    /// `source` should be freshly fetched: its balance and status are only
    /// as current as the last read.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in this order: [TransferError::SameAccount],
    /// [TransferError::InvalidAmount], [TransferError::ExcessPrecision],
    /// [TransferError::SourceNotActive], [TransferError::InsufficientFunds].
    pub fn new(
        source: &Account,
        destination: &AccountId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Self, TransferError> {
        if source.id == *destination {
            return Err(TransferError::SameAccount);
        }

        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount(amount));
        }

        if !currency.fits_minor_units(amount) {
            return Err(TransferError::ExcessPrecision { amount, currency });
        }

        if !source.is_active() {
            return Err(TransferError::SourceNotActive(
                source.id.clone(),
                source.status,
            ));
        }

        if amount > source.balance {
            return Err(TransferError::InsufficientFunds {
                requested: amount,
                available: source.balance,
            });
        }

        Ok(Self {
            source_account_id: source.id.clone(),
            destination_account_id: destination.clone(),
            amount,
            currency,
            idempotency_key: IdempotencyKey::generate(),
        })
    }

    /// The account the money is taken from.
    pub fn source_account_id(&self) -> &AccountId {
        &self.source_account_id
    }

    /// The account the money is sent to.
    pub fn destination_account_id(&self) -> &AccountId {
        &self.destination_account_id
    }

    /// The amount to move.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency of the amount.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// The key that identifies this submission to the server.
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }
}

/// The server's answer to a submitted transfer.
///
/// A transfer that the server processed but declined comes back with
/// [TransactionStatus::Failed] and a `message`, not as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    /// The ID of the recorded transaction.
    pub transaction_id: TransactionId,
    /// The outcome of the transfer.
    pub status: TransactionStatus,
    /// The account the money was taken from.
    #[serde(default)]
    pub source_account_id: Option<AccountId>,
    /// The account the money was sent to.
    #[serde(default)]
    pub destination_account_id: Option<AccountId>,
    /// The amount moved.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// The currency of the amount.
    #[serde(default)]
    pub currency: Option<String>,
    /// A human readable description of the outcome.
    #[serde(default)]
    pub message: Option<String>,
    /// The key the transfer was submitted with.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// When the server recorded the transaction.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_on: Option<OffsetDateTime>,
}

/// Submits transfers for the logged in user.
#[derive(Clone)]
pub struct TransferPipeline {
    session: Arc<SessionStore>,
    api: Arc<dyn TransferApi>,
}

impl TransferPipeline {
    /// Create a pipeline that authorizes its calls with `session`.
    pub fn new(session: Arc<SessionStore>, api: Arc<dyn TransferApi>) -> Self {
        Self { session, api }
    }

    /// Validate and submit a new transfer from the logged in user's account
    /// `source`.
    ///
    /// The source is looked up among the user's own accounts, as freshly
    /// listed by `directory`, so that its balance and status are current.
    ///
    /// # Errors
    ///
    /// Returns [TransferError::SourceNotOwned] without submitting anything if
    /// `source` is not one of the user's accounts, and
    /// [TransferError::AccountLookup] if the accounts could not be listed.
    /// Otherwise see [TransferPipeline::transfer].
    pub async fn transfer_from(
        &self,
        directory: &AccountDirectory,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<TransferResult, TransferError> {
        let accounts = directory
            .list_my_accounts()
            .await
            .map_err(TransferError::AccountLookup)?;

        let Some(source) = accounts.iter().find(|account| account.id == *source) else {
            tracing::warn!("Refusing to transfer from account {source}, it is not owned by the user");
            return Err(TransferError::SourceNotOwned(source.clone()));
        };

        self.transfer(source, destination, amount, currency).await
    }

    /// Validate and submit a new transfer.
    ///
    /// # Errors
    ///
    /// Returns a local [TransferError] if validation fails, otherwise see
    /// [TransferPipeline::submit].
    pub async fn transfer(
        &self,
        source: &Account,
        destination: &AccountId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<TransferResult, TransferError> {
        let request = TransferRequest::new(source, destination, amount, currency)?;

        self.submit(&request).await
    }

    /// Submit `request` once.
    ///
    /// Nothing is retried. To retry after a failure, call this again with the
    /// same request: the server will not apply it twice.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthenticated] without calling the server if there is
    /// no valid session. If the request times out the outcome is unknown, see
    /// [TransferError::is_outcome_unknown].
    pub async fn submit(&self, request: &TransferRequest) -> Result<TransferResult, TransferError> {
        let token = self.session.access_token()?;

        tracing::info!(
            "Submitting transfer of {} {} from {} to {} with key {}",
            request.amount,
            request.currency,
            request.source_account_id,
            request.destination_account_id,
            request.idempotency_key
        );

        let result = self.api.submit_transfer(&token, request).await;

        match self.session.check_authorized(&token, result) {
            Ok(result) => {
                tracing::info!(
                    "Transfer {} finished with status {}",
                    result.transaction_id,
                    result.status
                );
                Ok(result)
            }
            Err(Error::Timeout) => {
                tracing::warn!(
                    "Transfer with key {} timed out, its outcome is unknown",
                    request.idempotency_key
                );
                Err(TransferError::Api(Error::Timeout))
            }
            Err(error) => {
                tracing::error!(
                    "Transfer with key {} failed: {error}",
                    request.idempotency_key
                );
                Err(TransferError::Api(error))
            }
        }
    }
}
