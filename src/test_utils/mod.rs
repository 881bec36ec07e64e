#![allow(missing_docs)]

//! Test doubles: a settable clock and an in-memory bank that stands in for
//! every API collaborator.

use std::{
    collections::{HashMap, HashSet},
    mem::discriminant,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use serde_json::json;
use time::{Duration, OffsetDateTime, macros::datetime};

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus},
    api::{
        AccessToken, AccountApi, AuthApi, ProfileApi, SignInResponse, TransactionApi, TransferApi,
    },
    auth::token::decode_claims,
    clock::Clock,
    dashboard::UserProfile,
    history::{DirectionFilter, SortOrder, TransactionQuery},
    pagination::Page,
    transaction::{Transaction, TransactionId, TransactionStatus},
    transfer::{IdempotencyKey, TransferRequest, TransferResult},
};

/// How long tokens issued by [FakeBank] are valid for.
pub const TOKEN_LIFETIME: Duration = Duration::hours(1);

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

/// Build a JWT for `sub` that expires at `exp`, signed with a key the client
/// never sees.
pub fn make_token(sub: &str, exp: OffsetDateTime) -> String {
    let claims = json!({
        "sub": sub,
        "iat": (exp - TOKEN_LIFETIME).unix_timestamp(),
        "exp": exp.unix_timestamp()
    });

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"server-secret"),
    )
    .unwrap()
}

pub fn test_account(id: &str, balance: Decimal) -> Account {
    Account {
        id: AccountId::new(id),
        holder_name: "Alice".to_owned(),
        balance,
        status: AccountStatus::Active,
        daily_limit: None,
        last_updated: None,
    }
}

pub fn test_transaction(
    id: &str,
    from: &str,
    to: &str,
    status: TransactionStatus,
    created_on: OffsetDateTime,
) -> Transaction {
    Transaction {
        id: TransactionId::new(id),
        from_account_id: AccountId::new(from),
        to_account_id: AccountId::new(to),
        amount: Decimal::new(1000, 2),
        currency: "USD".to_owned(),
        status,
        failure_reason: None,
        idempotency_key: None,
        created_on,
    }
}

/// A [FakeBank] seeded with the default users and accounts, and the clock it
/// issues tokens with.
pub fn fake_bank_with_clock() -> (Arc<FakeBank>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(datetime!(2026-02-01 08:00 UTC)));
    let bank = Arc::new(FakeBank::new(clock.clone()));

    (bank, clock)
}

/// A call received by [FakeBank].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    SignIn,
    SignOut,
    MyAccounts,
    Account(AccountId),
    Profile,
    SubmitTransfer,
    AccountTransactions(AccountId, TransactionQuery),
}

struct User {
    id: u64,
    username: &'static str,
    password: &'static str,
    full_name: &'static str,
    roles: &'static [&'static str],
}

static USERS: [User; 3] = [
    User {
        id: 1,
        username: "alice",
        password: "pw",
        full_name: "Alice Smith",
        roles: &["ROLE_USER"],
    },
    User {
        id: 2,
        username: "bob",
        password: "bob-pw",
        full_name: "Bob Jones",
        roles: &["ROLE_USER"],
    },
    User {
        id: 3,
        username: "admin",
        password: "admin-pw",
        full_name: "Site Admin",
        roles: &["ROLE_ADMIN", "ROLE_USER"],
    },
];

#[derive(Default)]
struct BankState {
    /// Accounts and the username of their owner.
    accounts: Vec<(&'static str, Account)>,
    transactions: Vec<Transaction>,
    applied_transfers: HashMap<IdempotencyKey, TransferResult>,
    live_tokens: HashSet<String>,
    calls: Vec<ApiCall>,
    next_failure: Option<Error>,
    failing_calls: Vec<(ApiCall, Error)>,
    malformed_tokens: bool,
    next_transaction_id: u64,
}

/// An in-memory bank.
///
/// Alice ("alice"/"pw") owns accounts A (100.00) and B (50.00), Bob
/// ("bob"/"bob-pw") owns C (200.00), and "admin"/"admin-pw" is an
/// administrator. Every call is recorded, including rejected ones.
pub struct FakeBank {
    clock: Arc<ManualClock>,
    state: Mutex<BankState>,
}

impl FakeBank {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        let account = |id: &str, holder: &str, cents: i64| Account {
            holder_name: holder.to_owned(),
            ..test_account(id, Decimal::new(cents, 2))
        };

        let state = BankState {
            accounts: vec![
                ("alice", account("A", "Alice Smith", 10000)),
                ("alice", account("B", "Alice Smith", 5000)),
                ("bob", account("C", "Bob Jones", 20000)),
            ],
            ..BankState::default()
        };

        Self {
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next call fail with `error`, after it is recorded.
    pub fn fail_next_call(&self, error: Error) {
        self.lock().next_failure = Some(error);
    }

    /// Make every call of the same kind as `call` fail with `error`.
    pub fn fail_calls_to(&self, call: ApiCall, error: Error) {
        self.lock().failing_calls.push((call, error));
    }

    /// Issue tokens that are not JWTs.
    pub fn issue_malformed_tokens(&self) {
        self.lock().malformed_tokens = true;
    }

    pub fn account_by_id(&self, id: &str) -> Option<Account> {
        self.lock()
            .accounts
            .iter()
            .find(|(_, account)| account.id.as_str() == id)
            .map(|(_, account)| account.clone())
    }

    pub fn set_account_status(&self, id: &str, status: AccountStatus) {
        for (_, account) in &mut self.lock().accounts {
            if account.id.as_str() == id {
                account.status = status;
            }
        }
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.lock()
            .transactions
            .iter()
            .find(|transaction| transaction.id == *id)
            .cloned()
    }

    pub fn add_transaction(&self, transaction: Transaction) {
        self.lock().transactions.push(transaction);
    }

    fn lock(&self) -> MutexGuard<'_, BankState> {
        self.state.lock().unwrap()
    }

    /// Record `call` and return the failure planned for it, if any.
    fn record(&self, state: &mut BankState, call: ApiCall) -> Result<(), Error> {
        let failure = state.next_failure.take().or_else(|| {
            state
                .failing_calls
                .iter()
                .find(|(failing, _)| discriminant(failing) == discriminant(&call))
                .map(|(_, error)| error.clone())
        });
        state.calls.push(call);

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// The username the token was issued to.
    fn authorize(&self, state: &BankState, token: &AccessToken) -> Result<&'static str, Error> {
        if !state.live_tokens.contains(token.as_str()) {
            return Err(Error::Unauthenticated);
        }

        let claims = decode_claims(token.as_str()).map_err(|_| Error::Unauthenticated)?;

        if self.clock.now().unix_timestamp() >= claims.exp {
            return Err(Error::Unauthenticated);
        }

        USERS
            .iter()
            .find(|user| Some(user.username) == claims.sub.as_deref())
            .map(|user| user.username)
            .ok_or(Error::Unauthenticated)
    }
}

fn account_index(state: &BankState, id: &AccountId) -> Option<usize> {
    state
        .accounts
        .iter()
        .position(|(_, account)| account.id == *id)
}

#[async_trait]
impl AuthApi for FakeBank {
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInResponse, Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::SignIn)?;

        let user = USERS
            .iter()
            .find(|user| user.username == username && user.password == password)
            .ok_or(Error::Unauthenticated)?;

        let token = if state.malformed_tokens {
            "not-a-jwt".to_owned()
        } else {
            make_token(username, self.clock.now() + TOKEN_LIFETIME)
        };
        state.live_tokens.insert(token.clone());

        Ok(SignInResponse {
            token,
            username: user.username.to_owned(),
            roles: user.roles.iter().map(|role| role.to_string()).collect(),
        })
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::SignOut)?;
        state.live_tokens.remove(token.as_str());

        Ok(())
    }
}

#[async_trait]
impl AccountApi for FakeBank {
    async fn my_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::MyAccounts)?;
        let username = self.authorize(&state, token)?;

        Ok(state
            .accounts
            .iter()
            .filter(|(owner, _)| *owner == username)
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn account(&self, token: &AccessToken, id: &AccountId) -> Result<Account, Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::Account(id.clone()))?;
        self.authorize(&state, token)?;

        state
            .accounts
            .iter()
            .find(|(_, account)| account.id == *id)
            .map(|(_, account)| account.clone())
            .ok_or(Error::NotFound)
    }
}

#[async_trait]
impl ProfileApi for FakeBank {
    async fn profile(&self, token: &AccessToken) -> Result<UserProfile, Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::Profile)?;
        let username = self.authorize(&state, token)?;

        let user = USERS
            .iter()
            .find(|user| user.username == username)
            .ok_or(Error::NotFound)?;

        Ok(UserProfile {
            id: user.id.to_string(),
            username: user.username.to_owned(),
            full_name: Some(user.full_name.to_owned()),
            email: Some(format!("{}@example.com", user.username)),
            roles: user.roles.iter().map(|role| role.to_string()).collect(),
        })
    }
}

#[async_trait]
impl TransferApi for FakeBank {
    async fn submit_transfer(
        &self,
        token: &AccessToken,
        request: &TransferRequest,
    ) -> Result<TransferResult, Error> {
        let mut state = self.lock();
        self.record(&mut state, ApiCall::SubmitTransfer)?;
        let username = self.authorize(&state, token)?;

        if let Some(result) = state.applied_transfers.get(request.idempotency_key()) {
            return Ok(result.clone());
        }

        let source = account_index(&state, request.source_account_id()).ok_or(Error::NotFound)?;
        let destination =
            account_index(&state, request.destination_account_id()).ok_or(Error::NotFound)?;

        if state.accounts[source].0 != username {
            return Err(Error::Forbidden(
                "You do not own the source account".to_owned(),
            ));
        }

        let (status, message) = if state.accounts[source].1.balance < request.amount() {
            (TransactionStatus::Failed, "Insufficient balance")
        } else {
            state.accounts[source].1.balance -= request.amount();
            state.accounts[destination].1.balance += request.amount();
            (TransactionStatus::Success, "Transfer completed successfully")
        };

        state.next_transaction_id += 1;
        let transaction = Transaction {
            id: TransactionId::new(format!("tx-{}", state.next_transaction_id)),
            from_account_id: request.source_account_id().clone(),
            to_account_id: request.destination_account_id().clone(),
            amount: request.amount(),
            currency: request.currency().code().to_owned(),
            status,
            failure_reason: (status == TransactionStatus::Failed).then(|| message.to_owned()),
            idempotency_key: Some(request.idempotency_key().to_string()),
            created_on: self.clock.now(),
        };

        let result = TransferResult {
            transaction_id: transaction.id.clone(),
            status,
            source_account_id: Some(transaction.from_account_id.clone()),
            destination_account_id: Some(transaction.to_account_id.clone()),
            amount: Some(transaction.amount),
            currency: Some(transaction.currency.clone()),
            message: Some(message.to_owned()),
            idempotency_key: transaction.idempotency_key.clone(),
            created_on: Some(transaction.created_on),
        };

        state.transactions.push(transaction);
        state
            .applied_transfers
            .insert(request.idempotency_key().clone(), result.clone());

        Ok(result)
    }
}

#[async_trait]
impl TransactionApi for FakeBank {
    async fn account_transactions(
        &self,
        token: &AccessToken,
        account_id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, Error> {
        let mut state = self.lock();
        self.record(
            &mut state,
            ApiCall::AccountTransactions(account_id.clone(), query.clone()),
        )?;
        self.authorize(&state, token)?;

        let mut matching: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| match query.direction() {
                DirectionFilter::All => {
                    t.from_account_id == *account_id || t.to_account_id == *account_id
                }
                DirectionFilter::Sent => t.from_account_id == *account_id,
                DirectionFilter::Received => t.to_account_id == *account_id,
            })
            .filter(|t| query.status().is_none_or(|status| t.status == status))
            .filter(|t| query.from_date().is_none_or(|from| t.created_on >= from))
            .filter(|t| query.to_date().is_none_or(|to| t.created_on <= to))
            .cloned()
            .collect();

        matching.sort_by_key(|t| t.created_on);
        if query.sort_order() == SortOrder::Descending {
            matching.reverse();
        }

        let total_elements = matching.len() as u64;
        let total_pages = total_elements.div_ceil(query.size());
        let content = matching
            .into_iter()
            .skip((query.page() * query.size()) as usize)
            .take(query.size() as usize)
            .collect();

        Ok(Page {
            content,
            total_elements,
            total_pages,
            page_number: query.page(),
            page_size: query.size(),
            is_first: query.page() == 0,
            is_last: query.page() + 1 >= total_pages,
        })
    }
}
