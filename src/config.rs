//! Configuration for the banking API client.

use std::time::Duration;

use crate::{currency::Currency, pagination::PaginationConfig};

/// The default address of the banking API.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// How long to wait for a response before giving up on a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The config for the banking API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The base URL of the banking API, e.g. "http://localhost:8080".
    pub api_url: String,

    /// How long to wait for a response before treating the outcome as unknown.
    pub request_timeout: Duration,

    /// The currency to use for transfers when none is given.
    pub default_currency: Currency,

    /// The config that controls how to page transaction history.
    pub pagination: PaginationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_currency: Currency::usd(),
            pagination: PaginationConfig::default(),
        }
    }
}
