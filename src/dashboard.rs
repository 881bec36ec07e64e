//! The landing view: the user's profile, their accounts and the total balance.

use std::{collections::BTreeSet, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountDirectory, total_balance},
    api::{AccountApi, ProfileApi},
    auth::SessionStore,
    id::string_or_number,
};

/// The profile of the logged in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// The ID of the user.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// The name the user logs in with.
    pub username: String,
    /// The user's full name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// The user's email address.
    #[serde(default)]
    pub email: Option<String>,
    /// The roles granted to the user.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

/// The profile and accounts of the logged in user.
///
/// The two are loaded independently: one failing does not discard the other.
#[derive(Debug)]
pub struct Dashboard {
    /// The user's profile.
    pub profile: Result<UserProfile, Error>,
    /// The user's accounts.
    pub accounts: Result<Vec<Account>, Error>,
}

impl Dashboard {
    /// Load the profile and accounts concurrently.
    pub async fn load(
        session: Arc<SessionStore>,
        profile_api: Arc<dyn ProfileApi>,
        account_api: Arc<dyn AccountApi>,
    ) -> Self {
        let directory = AccountDirectory::new(session.clone(), account_api);

        let (profile, accounts) = tokio::join!(
            load_profile(&session, profile_api.as_ref()),
            directory.list_my_accounts()
        );

        if let Err(error) = &profile {
            tracing::error!("Could not load the user profile: {error}");
        }

        if let Err(error) = &accounts {
            tracing::error!("Could not load accounts: {error}");
        }

        Self { profile, accounts }
    }

    /// The sum of the balances of the loaded accounts, or `None` if the
    /// accounts could not be loaded.
    pub fn total_balance(&self) -> Option<Decimal> {
        self.accounts
            .as_ref()
            .ok()
            .map(|accounts| total_balance(accounts))
    }
}

async fn load_profile(
    session: &SessionStore,
    profile_api: &dyn ProfileApi,
) -> Result<UserProfile, Error> {
    let token = session.access_token()?;
    let result = profile_api.profile(&token).await;

    session.check_authorized(&token, result)
}

#[cfg(test)]
mod dashboard_tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::{
        Error,
        auth::SessionStore,
        test_utils::{ApiCall, FakeBank, fake_bank_with_clock},
    };

    use super::{Dashboard, UserProfile};

    async fn logged_in() -> (Arc<FakeBank>, Arc<SessionStore>) {
        let (bank, clock) = fake_bank_with_clock();
        let session = Arc::new(SessionStore::new(bank.clone(), clock));
        session.login("alice", "pw").await.unwrap();
        bank.clear_calls();

        (bank, session)
    }

    #[tokio::test]
    async fn loads_profile_and_accounts() {
        let (bank, session) = logged_in().await;

        let dashboard = Dashboard::load(session, bank.clone(), bank.clone()).await;

        let profile = dashboard.profile.as_ref().unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(dashboard.accounts.as_ref().unwrap().len(), 2);
        assert_eq!(dashboard.total_balance(), Some(Decimal::new(15000, 2)));

        let mut calls = bank.calls();
        calls.sort_by_key(|call| format!("{call:?}"));
        assert_eq!(calls, [ApiCall::MyAccounts, ApiCall::Profile]);
    }

    #[tokio::test]
    async fn profile_failure_keeps_accounts() {
        let (bank, session) = logged_in().await;
        bank.fail_calls_to(ApiCall::Profile, Error::Transport("connection reset".to_owned()));

        let dashboard = Dashboard::load(session, bank.clone(), bank.clone()).await;

        assert_eq!(
            dashboard.profile,
            Err(Error::Transport("connection reset".to_owned()))
        );
        assert_eq!(dashboard.total_balance(), Some(Decimal::new(15000, 2)));
    }

    #[tokio::test]
    async fn accounts_failure_keeps_profile() {
        let (bank, session) = logged_in().await;
        bank.fail_calls_to(ApiCall::MyAccounts, Error::Timeout);

        let dashboard = Dashboard::load(session, bank.clone(), bank.clone()).await;

        assert!(dashboard.profile.is_ok());
        assert_eq!(dashboard.accounts, Err(Error::Timeout));
        assert_eq!(dashboard.total_balance(), None);
    }

    #[tokio::test]
    async fn logged_out_dashboard_does_not_call_server() {
        let (bank, session) = logged_in().await;
        session.logout().await;
        bank.clear_calls();

        let dashboard = Dashboard::load(session, bank.clone(), bank.clone()).await;

        assert_eq!(dashboard.profile, Err(Error::Unauthenticated));
        assert_eq!(dashboard.accounts, Err(Error::Unauthenticated));
        assert!(bank.calls().is_empty());
    }

    #[test]
    fn deserialises_profile() {
        let json = r#"{
            "id": 3,
            "username": "alice",
            "fullName": "Alice Smith",
            "email": "alice@example.com",
            "roles": ["ROLE_USER"]
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.id, "3");
        assert_eq!(profile.full_name.as_deref(), Some("Alice Smith"));
        assert!(profile.roles.contains("ROLE_USER"));
    }
}
