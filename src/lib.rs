//! Bankfront is a client for a money transfer service.
//!
//! This library holds the client-side workflow: the logged in session, the
//! idempotent transfer pipeline, and the transaction history of the user's
//! accounts, classified as debits and credits. The banking server is reached
//! through the traits in [api], implemented over HTTP by [api::http::HttpBankApi].

#![warn(missing_docs)]

pub mod account;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod currency;
pub mod dashboard;
pub mod endpoints;
mod error;
pub mod history;
mod id;
pub mod logging;
pub mod pagination;
pub mod transaction;
pub mod transfer;

#[cfg(test)]
mod test_utils;

pub use error::Error;
