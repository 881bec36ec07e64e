//! Defines the crate level error type for calls to the banking API.

/// The errors that may occur when talking to the banking API.
///
/// Local validation errors for transfers live in [crate::transfer::TransferError]
/// and log-in failures in [crate::auth::AuthError].
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// There is no session, the session has expired, or the server rejected
    /// the bearer token.
    ///
    /// The caller should ask the user to log in again.
    #[error("not logged in or the session has expired, please log in again")]
    Unauthenticated,

    /// The server understood the request but the user is not allowed to
    /// perform it, e.g. the account is not active.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The server could not be reached.
    ///
    /// These errors are safe to retry, but the crate never retries on its own.
    #[error("could not reach the server: {0}")]
    Transport(String),

    /// The request was sent but no response arrived in time.
    ///
    /// The outcome of the request is unknown. For transfers this means the
    /// money may or may not have moved.
    #[error("the request timed out and its outcome is unknown")]
    Timeout,

    /// The server rejected the request.
    ///
    /// `message` is passed through verbatim from the server.
    #[error("{message}")]
    Rejected {
        /// The HTTP status code of the response.
        status: u16,
        /// The reason given by the server.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("could not decode the server response: {0}")]
    InvalidResponse(String),

    /// The configured API URL, or a URL built from it, is not valid.
    #[error("invalid URL \"{0}\"")]
    InvalidUrl(String),

    /// Transaction history was requested before choosing an account.
    #[error("no account has been selected")]
    NoAccountSelected,
}

impl Error {
    /// Whether the caller may safely retry the failed call.
    ///
    /// Timeouts are not retryable: a retry could repeat an operation that
    /// already succeeded.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
