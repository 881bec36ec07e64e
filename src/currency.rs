//! ISO 4217 currency codes and their minor-unit precision.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currencies with no minor unit, e.g. the Japanese yen.
const ZERO_DECIMAL_CURRENCIES: [&str; 8] = ["BIF", "CLP", "ISK", "JPY", "KRW", "PYG", "UGX", "VND"];

/// Currencies with a minor unit of one thousandth, e.g. the Kuwaiti dinar.
const THREE_DECIMAL_CURRENCIES: [&str; 6] = ["BHD", "IQD", "JOD", "KWD", "OMR", "TND"];

/// An upper-case, three letter ISO 4217 currency code such as "USD".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

/// The error for a string that is not a three letter currency code.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("\"{0}\" is not a three letter currency code")]
pub struct InvalidCurrency(pub String);

impl Currency {
    /// Create a currency from a code such as "usd" or "INR".
    ///
    /// # Errors
    ///
    /// Returns [InvalidCurrency] if `code` is not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, InvalidCurrency> {
        let code = code.trim();

        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidCurrency(code.to_owned()));
        }

        Ok(Self(code.to_ascii_uppercase()))
    }

    /// United States dollar.
    pub fn usd() -> Self {
        Self("USD".to_owned())
    }

    /// The currency code, e.g. "USD".
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The number of decimal places in the currency's minor unit.
    pub fn minor_units(&self) -> u32 {
        if ZERO_DECIMAL_CURRENCIES.contains(&self.code()) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&self.code()) {
            3
        } else {
            2
        }
    }

    /// Whether `amount` can be represented exactly in this currency.
    ///
    /// Trailing zeros do not count, so "25.00" fits a zero decimal currency.
    pub fn fits_minor_units(&self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.minor_units()
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Currency {
    type Err = InvalidCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = InvalidCurrency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}
