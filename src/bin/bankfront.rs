use std::{error::Error, io, process::ExitCode, sync::Arc, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use time::{
    Date,
    macros::{format_description, time},
};
use tracing_subscriber::filter::LevelFilter;

use bankfront_rs::{
    account::{AccountDirectory, AccountId},
    api::http::HttpBankApi,
    auth::SessionStore,
    clock::SystemClock,
    config::{ClientConfig, DEFAULT_API_URL},
    currency::Currency,
    dashboard::Dashboard,
    history::{DirectionFilter, HistoryReconciler},
    logging::setup_logging,
    pagination::{PaginationIndicator, pagination_indicators},
    transaction::TransactionStatus,
    transfer::{TransferError, TransferPipeline},
};

/// A command line client for the money transfer service.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base URL of the banking API.
    #[arg(long, env = "BANKFRONT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// The username to log in with. The password is always prompted for.
    #[arg(short, long, env = "BANKFRONT_USERNAME")]
    username: String,

    /// How many seconds to wait for a response from the server.
    #[arg(long, env = "BANKFRONT_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log every request and response.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show your profile, your accounts and their total balance.
    Accounts,

    /// Send money from one of your accounts to another account.
    Transfer {
        /// The ID of your account to send the money from.
        #[arg(long)]
        from: String,

        /// The ID of the account to send the money to.
        #[arg(long)]
        to: String,

        /// The amount to send, e.g. 25.00.
        #[arg(long)]
        amount: Decimal,

        /// The ISO 4217 code of the currency. Defaults to USD.
        #[arg(long)]
        currency: Option<Currency>,
    },

    /// Show the transaction history of one of your accounts.
    History(HistoryArgs),
}

#[derive(clap::Args, Debug)]
struct HistoryArgs {
    /// The ID of the account. Defaults to your first account.
    #[arg(long)]
    account: Option<String>,

    /// Only show transactions with this status.
    #[arg(long, value_enum)]
    status: Option<StatusArg>,

    /// Only show sent or received transactions.
    #[arg(long, value_enum, default_value_t = DirectionArg::All)]
    direction: DirectionArg,

    /// Only show transactions on or after this date, e.g. 2026-02-01.
    #[arg(long, value_parser = parse_date)]
    from_date: Option<Date>,

    /// Only show transactions on or before this date, e.g. 2026-02-28.
    #[arg(long, value_parser = parse_date)]
    to_date: Option<Date>,

    /// The page to show, starting from 1.
    #[arg(long, default_value_t = 1)]
    page: u64,

    /// The number of transactions per page.
    #[arg(long)]
    page_size: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Success,
    Failed,
    Pending,
    Reversed,
}

impl From<StatusArg> for TransactionStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Success => TransactionStatus::Success,
            StatusArg::Failed => TransactionStatus::Failed,
            StatusArg::Pending => TransactionStatus::Pending,
            StatusArg::Reversed => TransactionStatus::Reversed,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    All,
    Sent,
    Received,
}

impl From<DirectionArg> for DirectionFilter {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::All => DirectionFilter::All,
            DirectionArg::Sent => DirectionFilter::Sent,
            DirectionArg::Received => DirectionFilter::Received,
        }
    }
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    setup_logging(if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    });

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            print_error(error);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = ClientConfig {
        api_url: args.api_url,
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..ClientConfig::default()
    };

    let api = Arc::new(HttpBankApi::new(&config)?);
    let session = Arc::new(SessionStore::new(api.clone(), Arc::new(SystemClock)));

    let Some(password) = prompt_password(&args.username) else {
        return Ok(());
    };

    session.login(&args.username, &password).await?;

    let result = match args.command {
        Command::Accounts => show_accounts(session.clone(), api).await,
        Command::Transfer {
            from,
            to,
            amount,
            currency,
        } => {
            let currency = currency.unwrap_or_else(|| config.default_currency.clone());
            send_transfer(session.clone(), api, &from, &to, amount, currency).await
        }
        Command::History(history_args) => {
            let reconciler =
                HistoryReconciler::new(session.clone(), api.clone(), api, &config.pagination);
            show_history(reconciler, history_args, config.pagination.max_pages).await
        }
    };

    session.logout().await;

    result
}

fn prompt_password(username: &str) -> Option<String> {
    match rpassword::prompt_password(format!("Password for {username}: ")) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

async fn show_accounts(
    session: Arc<SessionStore>,
    api: Arc<HttpBankApi>,
) -> Result<(), Box<dyn Error>> {
    let dashboard = Dashboard::load(session, api.clone(), api).await;

    match &dashboard.profile {
        Ok(profile) => println!(
            "Welcome, {}",
            profile.full_name.as_deref().unwrap_or(&profile.username)
        ),
        Err(error) => print_error(format!("Failed to load user profile: {error}")),
    }

    let accounts = dashboard.accounts.as_ref().map_err(Clone::clone)?;

    println!();
    for account in accounts {
        println!(
            "{:<12} {:<24} {:>14} {}",
            account.id, account.holder_name, account.balance, account.status
        );
    }

    if let Some(total) = dashboard.total_balance() {
        println!("{:<37} {:>14}", "Total", total);
    }

    Ok(())
}

async fn send_transfer(
    session: Arc<SessionStore>,
    api: Arc<HttpBankApi>,
    from: &str,
    to: &str,
    amount: Decimal,
    currency: Currency,
) -> Result<(), Box<dyn Error>> {
    let directory = AccountDirectory::new(session.clone(), api.clone());
    let pipeline = TransferPipeline::new(session, api);

    match pipeline
        .transfer_from(
            &directory,
            &AccountId::new(from),
            &AccountId::new(to),
            amount,
            currency,
        )
        .await
    {
        Ok(result) => {
            println!(
                "Transaction {}: {}",
                result.transaction_id,
                result.message.as_deref().unwrap_or(&result.status.to_string())
            );
            Ok(())
        }
        Err(error @ TransferError::SourceNotOwned(_)) => {
            if let Ok(sources) = directory.transfer_sources().await {
                let ids: Vec<&str> = sources.iter().map(|account| account.id.as_str()).collect();
                println!("You can send money from: {}", ids.join(", "));
            }
            Err(error.into())
        }
        Err(error) if error.is_outcome_unknown() => {
            print_error(
                "The server did not respond in time, the transfer may or may not have gone through.",
            );
            println!("Check the transaction history before trying again.");
            Err(error.into())
        }
        Err(error) => Err(error.into()),
    }
}

async fn show_history(
    mut reconciler: HistoryReconciler,
    args: HistoryArgs,
    max_pages: u64,
) -> Result<(), Box<dyn Error>> {
    reconciler.load_accounts().await?;

    let query = reconciler.query_mut();
    if let Some(account) = args.account {
        query.select_account(AccountId::new(account));
    }
    query.set_status(args.status.map(TransactionStatus::from));
    query.set_direction(args.direction.into());
    query.set_date_range(
        args.from_date.map(|date| date.midnight().assume_utc()),
        args.to_date
            .map(|date| date.with_time(time!(23:59:59.999_999_999)).assume_utc()),
    );
    if let Some(page_size) = args.page_size {
        query.set_page_size(page_size);
    }
    query.set_page(args.page.saturating_sub(1));

    let page = reconciler.fetch_page().await?.clone();

    if page.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    for view in &page.content {
        let transaction = &view.transaction;
        println!(
            "{} {:<6} {:<12} {:>14} {} {}",
            transaction.created_on.date(),
            view.direction,
            view.counterparty(),
            transaction.amount,
            transaction.currency,
            transaction.status
        );
    }

    println!(
        "\n{} sent, {} received on this page, {} transactions in total",
        reconciler.debit_count(),
        reconciler.credit_count(),
        page.total_elements
    );
    println!("{}", format_indicators(&pagination_indicators(&page, max_pages)));

    Ok(())
}

fn format_indicators(indicators: &[PaginationIndicator]) -> String {
    indicators
        .iter()
        .map(|indicator| match indicator {
            PaginationIndicator::Page(page) => page.to_string(),
            PaginationIndicator::CurrPage(page) => format!("[{page}]"),
            PaginationIndicator::Ellipsis => "...".to_owned(),
            PaginationIndicator::BackButton(_) => "<".to_owned(),
            PaginationIndicator::NextButton(_) => ">".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
