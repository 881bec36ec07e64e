//! Transactions as recorded by the server's ledger.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{account::AccountId, id::string_or_number};

/// The ID of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(#[serde(deserialize_with = "string_or_number")] String);

impl TransactionId {
    /// Create a new transaction ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The outcome of a transaction, as decided by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// The money moved.
    Success,
    /// The transaction was rejected and no money moved.
    Failed,
    /// The transaction is waiting, e.g. for approval.
    Pending,
    /// The money moved and was later returned.
    Reversed,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Reversed => "REVERSED",
        };

        f.pad(text)
    }
}

/// A movement of money from one account to another.
///
/// Transactions are never modified by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money was taken from.
    pub from_account_id: AccountId,
    /// The account the money was sent to.
    pub to_account_id: AccountId,
    /// The amount of money moved. Always positive.
    pub amount: Decimal,
    /// The ISO 4217 code of the currency the amount is in.
    pub currency: String,
    /// The outcome of the transaction.
    pub status: TransactionStatus,
    /// Why the transaction failed, if it did.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// The key the transfer was submitted with.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// When the server recorded the transaction.
    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,
}
