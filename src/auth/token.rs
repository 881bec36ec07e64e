//! Reads the claims of the bearer token issued by the server.
//!
//! The client cannot verify the token's signature, it only needs the expiry
//! so it can stop using the token before the server starts rejecting it.

use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::Deserialize;
use time::OffsetDateTime;

/// The reasons a token could not be decoded.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TokenError {
    /// The token does not have the `header.payload.signature` shape of a JWT.
    #[error("the token is not a JWT")]
    NotAJwt,

    /// A part of the token is not valid base64url.
    #[error("the token is not valid base64: {0}")]
    InvalidBase64(String),

    /// The header or payload is not a JSON object with the expected claims.
    #[error("the token has invalid claims: {0}")]
    InvalidClaims(String),

    /// The expiry claim is outside the range of supported dates.
    #[error("the token expiry {0} is out of range")]
    ExpiryOutOfRange(i64),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidToken => TokenError::NotAJwt,
            ErrorKind::Base64(error) => TokenError::InvalidBase64(error.to_string()),
            _ => TokenError::InvalidClaims(error.to_string()),
        }
    }
}

/// The claims the client reads from a JWT payload.
#[derive(Deserialize, Debug, PartialEq)]
pub struct Claims {
    /// The subject, i.e. the username.
    #[serde(default)]
    pub sub: Option<String>,

    /// When the token expires, in seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    /// The expiry claim as a date time.
    ///
    /// # Errors
    ///
    /// Returns [TokenError::ExpiryOutOfRange] if `exp` is not a representable date.
    pub fn expires_at(&self) -> Result<OffsetDateTime, TokenError> {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .map_err(|_| TokenError::ExpiryOutOfRange(self.exp))
    }
}

/// Only the shape of the token and the presence of `exp` are checked.
/// Whether the token has expired is decided by the session's clock.
fn claims_only() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    validation
}

/// Decode the claims of `token` without verifying its signature.
///
/// # Errors
///
/// Returns a [TokenError] if the token is malformed. Callers must treat
/// this as "not authenticated".
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &claims_only())?;

    Ok(data.claims)
}

/// Decode the expiry of `token`.
///
/// # Errors
///
/// Returns a [TokenError] if the token is malformed or has no usable expiry.
pub fn decode_expiry(token: &str) -> Result<OffsetDateTime, TokenError> {
    decode_claims(token)?.expires_at()
}
