//! Transaction history for one of the user's accounts.
//!
//! [HistoryReconciler] keeps the selected account, filter and page position
//! together so they always describe one query, and labels each fetched
//! transaction as a debit or credit relative to the selected account.

use std::{fmt::Display, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{Account, AccountDirectory, AccountId},
    api::{AccountApi, TransactionApi},
    auth::SessionStore,
    pagination::{Page, PaginationConfig},
    transaction::{Transaction, TransactionStatus},
};

/// Whether money left or entered an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The account sent the money.
    Debit,
    /// The account received the money.
    Credit,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Debit => f.pad("DEBIT"),
            Direction::Credit => f.pad("CREDIT"),
        }
    }
}

/// Classify `transaction` relative to `account`.
///
/// A transaction is a debit exactly when `account` is the source, whatever
/// its status. Failed and reversed transactions are classified the same way.
pub fn classify(transaction: &Transaction, account: &AccountId) -> Direction {
    if transaction.from_account_id == *account {
        Direction::Debit
    } else {
        Direction::Credit
    }
}

/// A transaction as seen from one account.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView {
    /// The transaction as recorded by the server.
    pub transaction: Transaction,
    /// Whether the money left or entered the account the history is for.
    pub direction: Direction,
}

impl TransactionView {
    /// View `transaction` from `account`.
    pub fn new(transaction: Transaction, account: &AccountId) -> Self {
        let direction = classify(&transaction, account);

        Self {
            transaction,
            direction,
        }
    }

    /// The account on the other side of the transaction.
    pub fn counterparty(&self) -> &AccountId {
        match self.direction {
            Direction::Debit => &self.transaction.to_account_id,
            Direction::Credit => &self.transaction.from_account_id,
        }
    }
}

/// Which transactions to include relative to the selected account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionFilter {
    /// Both sent and received transactions.
    #[default]
    All,
    /// Only transactions the account sent.
    Sent,
    /// Only transactions the account received.
    Received,
}

/// The order of transactions by the time they were recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

impl SortOrder {
    fn as_query(self) -> &'static str {
        match self {
            SortOrder::Ascending => "createdOn,asc",
            SortOrder::Descending => "createdOn,desc",
        }
    }
}

/// Narrows the transaction history. The date range is inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Only include transactions with this status.
    pub status: Option<TransactionStatus>,
    /// Only include sent or received transactions.
    pub direction: DirectionFilter,
    /// Only include transactions recorded at or after this time.
    pub from_date: Option<OffsetDateTime>,
    /// Only include transactions recorded at or before this time.
    pub to_date: Option<OffsetDateTime>,
}

/// The query string of a transaction history request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionQuery {
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    from: Option<OffsetDateTime>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    to: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TransactionStatus>,
    direction: DirectionFilter,
    page: u64,
    size: u64,
    sort: &'static str,
}

impl TransactionQuery {
    /// Build the query for page `page` of `page_size` transactions.
    pub fn new(filter: &HistoryFilter, page: u64, page_size: u64, sort: SortOrder) -> Self {
        Self {
            from: filter.from_date,
            to: filter.to_date,
            status: filter.status,
            direction: filter.direction,
            page,
            size: page_size,
            sort: sort.as_query(),
        }
    }

    /// The inclusive lower bound on when transactions were recorded.
    pub fn from_date(&self) -> Option<OffsetDateTime> {
        self.from
    }

    /// The inclusive upper bound on when transactions were recorded.
    pub fn to_date(&self) -> Option<OffsetDateTime> {
        self.to
    }

    /// The required transaction status, if any.
    pub fn status(&self) -> Option<TransactionStatus> {
        self.status
    }

    /// Whether to include sent transactions, received transactions or both.
    pub fn direction(&self) -> DirectionFilter {
        self.direction
    }

    /// The zero-based page index.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// The number of transactions per page.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the newest or the oldest transactions come first.
    pub fn sort_order(&self) -> SortOrder {
        if self.sort == SortOrder::Ascending.as_query() {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// The selected account, filter and page position of the history view.
///
/// Changing the account, the filter or the page size moves back to the
/// first page.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    account: Option<AccountId>,
    filter: HistoryFilter,
    page_index: u64,
    page_size: u64,
    sort: SortOrder,
}

impl HistoryQuery {
    /// An empty query with no account selected.
    pub fn new(page_size: u64) -> Self {
        Self {
            account: None,
            filter: HistoryFilter::default(),
            page_index: 0,
            page_size: page_size.max(1),
            sort: SortOrder::default(),
        }
    }

    /// The selected account.
    pub fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    /// The current filter.
    pub fn filter(&self) -> &HistoryFilter {
        &self.filter
    }

    /// The zero-based index of the page to fetch.
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// The number of transactions per page.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// The order transactions are listed in.
    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Show the history of `account`.
    pub fn select_account(&mut self, account: AccountId) {
        self.account = Some(account);
        self.page_index = 0;
    }

    /// Replace the whole filter.
    pub fn set_filter(&mut self, filter: HistoryFilter) {
        self.filter = filter;
        self.page_index = 0;
    }

    /// Only show transactions with `status`, or any status if `None`.
    pub fn set_status(&mut self, status: Option<TransactionStatus>) {
        self.filter.status = status;
        self.page_index = 0;
    }

    /// Only show sent or received transactions.
    pub fn set_direction(&mut self, direction: DirectionFilter) {
        self.filter.direction = direction;
        self.page_index = 0;
    }

    /// Only show transactions recorded within the inclusive range.
    pub fn set_date_range(&mut self, from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) {
        self.filter.from_date = from;
        self.filter.to_date = to;
        self.page_index = 0;
    }

    /// Show all transactions again.
    pub fn clear_filters(&mut self) {
        self.set_filter(HistoryFilter::default());
    }

    /// Change the order transactions are listed in.
    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.page_index = 0;
    }

    /// Change the number of transactions per page. Zero is treated as one.
    pub fn set_page_size(&mut self, page_size: u64) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
    }

    /// Move to another page of the same query.
    pub fn set_page(&mut self, page_index: u64) {
        self.page_index = page_index;
    }

    /// The request for the current page.
    pub fn to_query(&self) -> TransactionQuery {
        TransactionQuery::new(&self.filter, self.page_index, self.page_size, self.sort)
    }
}

/// Loads and classifies the transaction history of one of the user's accounts.
pub struct HistoryReconciler {
    session: Arc<SessionStore>,
    directory: AccountDirectory,
    api: Arc<dyn TransactionApi>,
    query: HistoryQuery,
    accounts: Vec<Account>,
    page: Option<Page<TransactionView>>,
}

impl HistoryReconciler {
    /// Create a reconciler with no account selected.
    pub fn new(
        session: Arc<SessionStore>,
        account_api: Arc<dyn AccountApi>,
        transaction_api: Arc<dyn TransactionApi>,
        pagination: &PaginationConfig,
    ) -> Self {
        Self {
            directory: AccountDirectory::new(session.clone(), account_api),
            session,
            api: transaction_api,
            query: HistoryQuery::new(pagination.default_page_size),
            accounts: Vec::new(),
            page: None,
        }
    }

    /// The current query state.
    pub fn query(&self) -> &HistoryQuery {
        &self.query
    }

    /// The query state, for changing the account, filter or page.
    ///
    /// Changes take effect on the next [HistoryReconciler::fetch_page].
    pub fn query_mut(&mut self) -> &mut HistoryQuery {
        &mut self.query
    }

    /// The user's accounts from the last [HistoryReconciler::load_accounts].
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// The last page fetched.
    pub fn page(&self) -> Option<&Page<TransactionView>> {
        self.page.as_ref()
    }

    /// Fetch the user's accounts, and select the first one if no account is
    /// selected yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the accounts cannot be fetched. The selection is
    /// unchanged.
    pub async fn load_accounts(&mut self) -> Result<&[Account], Error> {
        self.accounts = self.directory.list_my_accounts().await?;

        if self.query.account.is_none()
            && let Some(first) = self.accounts.first()
        {
            tracing::debug!("Selecting account {} for history", first.id);
            self.query.select_account(first.id.clone());
        }

        Ok(&self.accounts)
    }

    /// Fetch the page the query points at and classify its transactions.
    ///
    /// # Errors
    ///
    /// Returns [Error::NoAccountSelected] if no account is selected, and
    /// [Error::Unauthenticated] without calling the server if there is no
    /// valid session. On any error the previously loaded page is discarded.
    pub async fn fetch_page(&mut self) -> Result<&Page<TransactionView>, Error> {
        self.page = None;

        let account = self
            .query
            .account
            .clone()
            .ok_or(Error::NoAccountSelected)?;
        let token = self.session.access_token()?;
        let query = self.query.to_query();

        let result = self.api.account_transactions(&token, &account, &query).await;
        let page = self.session.check_authorized(&token, result).inspect_err(|error| {
            tracing::error!("Could not load transactions for account {account}: {error}");
        })?;

        let page = self
            .page
            .insert(page.map(|transaction| TransactionView::new(transaction, &account)));

        Ok(page)
    }

    /// Fetch the current page again.
    ///
    /// # Errors
    ///
    /// See [HistoryReconciler::fetch_page].
    pub async fn refresh(&mut self) -> Result<&Page<TransactionView>, Error> {
        self.fetch_page().await
    }

    /// The number of debits on the loaded page.
    pub fn debit_count(&self) -> usize {
        self.count(Direction::Debit)
    }

    /// The number of credits on the loaded page.
    pub fn credit_count(&self) -> usize {
        self.count(Direction::Credit)
    }

    fn count(&self, direction: Direction) -> usize {
        self.page.as_ref().map_or(0, |page| {
            page.content
                .iter()
                .filter(|view| view.direction == direction)
                .count()
        })
    }
}
