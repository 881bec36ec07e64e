//! The banking API endpoint paths.
//!
//! For endpoints that take a parameter, e.g., '/api/v1/accounts/{account_id}', use [endpoint_segments].

/// The route for exchanging credentials for a bearer token.
pub const SIGN_IN: &str = "/api/auth/signin";
/// The route for notifying the server that the user logged out.
pub const SIGN_OUT: &str = "/api/auth/signout";
/// The route for the accounts owned by the current user.
pub const MY_ACCOUNTS: &str = "/api/v1/user/accounts";
/// The route for the current user's profile.
pub const PROFILE: &str = "/api/v1/user/profile";
/// The route to access a single account.
pub const ACCOUNT: &str = "/api/v1/accounts/{account_id}";
/// The route for submitting a transfer between two accounts.
pub const TRANSFERS: &str = "/api/v1/transfers";
/// The route for the transaction history of an account.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/v1/accounts/{account_id}/transactions";

/// The header that carries the idempotency key of a transfer.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Split `endpoint_path` into its path segments, replacing the parameter with `id`.
///
/// A parameter is a segment that starts with a left brace and ends with a
/// right brace. For example, in the endpoint path '/accounts/{account_id}',
/// '{account_id}' is the parameter.
///
/// The segments are not percent-encoded: append them with
/// [reqwest::Url::path_segments_mut] so that `id` stays a single segment.
pub fn endpoint_segments<'a>(
    endpoint_path: &'a str,
    id: &'a str,
) -> impl Iterator<Item = &'a str> {
    endpoint_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(move |segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                id
            } else {
                segment
            }
        })
}
