//! The session store: owns the bearer token of the logged in user and tells
//! subscribers when the user logs in or out.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
};

use time::OffsetDateTime;

use crate::{
    Error,
    api::{AccessToken, AuthApi},
    clock::Clock,
};

use super::{
    subscription::{Subscribers, Subscription},
    token::decode_expiry,
};

/// The role that grants access to the administration screens.
pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The name the user logged in with.
    pub username: String,
    /// The roles granted to the user, e.g. "ROLE_ADMIN".
    pub roles: BTreeSet<String>,
}

impl Identity {
    /// Create a new identity.
    pub fn new<R>(username: &str, roles: R) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            username: username.to_owned(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the user has been granted `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// A logged in user's bearer token, identity and token expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The bearer token to attach to authorized requests.
    pub token: AccessToken,
    /// Who the token belongs to.
    pub identity: Identity,
    /// When the token stops being valid.
    pub expires_at: OffsetDateTime,
}

/// The errors that may occur while logging in.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthError {
    /// The username and password were not accepted.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The server could not be reached. Logging in again may succeed.
    #[error("could not reach the server: {0}")]
    Transport(String),

    /// The server issued a token the client cannot read.
    #[error("the server issued an unreadable token: {0}")]
    MalformedToken(String),

    /// The server refused to log the user in for another reason.
    #[error("{0}")]
    Rejected(String),
}

impl AuthError {
    /// Whether logging in again with the same credentials may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }
}

impl From<Error> for AuthError {
    fn from(error: Error) -> Self {
        match error {
            Error::Unauthenticated | Error::Forbidden(_) => AuthError::InvalidCredentials,
            Error::Rejected { status: 400, .. } => AuthError::InvalidCredentials,
            Error::Transport(reason) => AuthError::Transport(reason),
            Error::Timeout => AuthError::Transport(Error::Timeout.to_string()),
            Error::Rejected { message, .. } => AuthError::Rejected(message),
            error => AuthError::Rejected(error.to_string()),
        }
    }
}

/// Owns the session of the logged in user.
///
/// There is at most one session at a time. Other components read the bearer
/// token through [SessionStore::access_token], which refuses to hand out an
/// expired token.
pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    session: Mutex<Option<Session>>,
    subscribers: Subscribers,
}

impl SessionStore {
    /// Create a session store with no session.
    pub fn new(auth: Arc<dyn AuthApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth,
            clock,
            session: Mutex::new(None),
            subscribers: Subscribers::default(),
        }
    }

    /// Exchange `username` and `password` for a session.
    ///
    /// On success the new identity is published to every subscriber before
    /// this function returns. Any previous session is replaced.
    ///
    /// # Errors
    ///
    /// Returns an [AuthError] and leaves the store unchanged if the server
    /// rejects the credentials, cannot be reached, or issues a token whose
    /// expiry cannot be read.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let response = self.auth.sign_in(username, password).await.map_err(|error| {
            tracing::warn!("Log in failed for {username}: {error}");
            AuthError::from(error)
        })?;

        let expires_at = decode_expiry(&response.token).map_err(|error| {
            tracing::error!("Could not decode the token issued for {username}: {error}");
            AuthError::MalformedToken(error.to_string())
        })?;

        let session = Session {
            token: AccessToken::new(response.token),
            identity: Identity::new(&response.username, response.roles),
            expires_at,
        };

        *self.lock_session() = Some(session.clone());
        tracing::info!(
            "Logged in as {}, session expires at {expires_at}",
            session.identity.username
        );
        self.subscribers.publish(Some(&session.identity));

        Ok(session)
    }

    /// Clear the session and tell the server the user logged out.
    ///
    /// The local session is always cleared, even if the server cannot be
    /// told about it.
    pub async fn logout(&self) {
        let session = self.lock_session().take();
        self.subscribers.publish(None);

        let Some(session) = session else {
            return;
        };

        tracing::info!("Logged out {}", session.identity.username);

        if let Err(error) = self.auth.sign_out(&session.token).await {
            tracing::warn!("Could not notify the server of log out: {error}");
        }
    }

    /// Whether there is a session that has not expired.
    ///
    /// An expired session is cleared as if the user had logged out.
    pub fn is_authenticated(&self) -> bool {
        self.valid_session().is_some()
    }

    /// The identity of the logged in user.
    ///
    /// Unlike [SessionStore::is_authenticated] this does not check expiry.
    pub fn current_identity(&self) -> Option<Identity> {
        self.lock_session()
            .as_ref()
            .map(|session| session.identity.clone())
    }

    /// Whether the logged in user has been granted `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.current_identity()
            .is_some_and(|identity| identity.has_role(role))
    }

    /// Whether the logged in user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Call `callback` with the current identity now, and again every time it
    /// changes.
    ///
    /// Subscribers are called synchronously, in the order they subscribed.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&Identity>) + Send + Sync + 'static,
    ) -> Subscription {
        callback(self.current_identity().as_ref());
        self.subscribers.subscribe(callback)
    }

    /// The bearer token for an authorized request.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthenticated] if there is no session or it has
    /// expired. The request must not be sent.
    pub fn access_token(&self) -> Result<AccessToken, Error> {
        self.valid_session()
            .map(|session| session.token)
            .ok_or(Error::Unauthenticated)
    }

    /// Pass `result` through, clearing the session if the server rejected
    /// `token`.
    ///
    /// `token` must be the one the request was sent with. A rejection of a
    /// token from an earlier session leaves the current session alone.
    pub fn check_authorized<T>(
        &self,
        token: &AccessToken,
        result: Result<T, Error>,
    ) -> Result<T, Error> {
        if let Err(Error::Unauthenticated) = result {
            self.evict(token, "the server rejected the bearer token");
        }

        result
    }

    /// The current session, clearing it first if it has expired.
    fn valid_session(&self) -> Option<Session> {
        let mut guard = self.lock_session();
        let session = guard.as_ref()?;

        if self.clock.now() < session.expires_at {
            return Some(session.clone());
        }

        let expired = guard.take();
        drop(guard);

        if let Some(expired) = expired {
            tracing::info!(
                "Session for {} expired at {}",
                expired.identity.username,
                expired.expires_at
            );
            self.subscribers.publish(None);
        }

        None
    }

    fn evict(&self, token: &AccessToken, reason: &str) {
        let evicted = {
            let mut guard = self.lock_session();
            match guard.as_ref() {
                Some(session) if session.token == *token => guard.take(),
                Some(_) => {
                    tracing::debug!("Ignoring rejection of a token from an earlier session");
                    None
                }
                None => None,
            }
        };

        if let Some(session) = evicted {
            tracing::warn!("Ending session for {}: {reason}", session.identity.username);
            self.subscribers.publish(None);
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
