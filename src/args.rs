//! These structs provide the CLI interface for the finboard CLI.

use crate::aggregate::DEFAULT_TOP_N;
use crate::commands::ReportFormat;
use crate::config::StoreKind;
use crate::filter::{Selection, ALL};
use crate::model::EntryType;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// finboard: A command-line dashboard for your personal finances.
///
/// Your transactions live either in a CSV file on this computer or in a Google sheet. finboard
/// reads them, lets you filter by date range, category and type, and reports income, expenses,
/// savings, spending by category, monthly trends, your largest expenses and a simple forecast of
/// next month's spending. You can also add transactions and export a filtered set as CSV.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// Run this first. For a local store you only need to choose where the CSV file lives, by
    /// default it is $FINBOARD_HOME/transactions.csv. For a Google sheet store you need the URL of
    /// the sheet and an OAuth client secret and token, which are copied into
    /// $FINBOARD_HOME/.secrets.
    Init(InitArgs),
    /// Add one transaction to the store.
    Add(AddArgs),
    /// Print KPIs, breakdowns, trends, top expenses and a forecast for a filtered set.
    Report(ReportArgs),
    /// Write a filtered set of transactions as CSV.
    Export(ExportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where finboard data and configuration is held. Defaults to ~/finboard
    #[arg(long, env = "FINBOARD_HOME", default_value_t = default_finboard_home())]
    finboard_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, finboard_home: PathBuf) -> Self {
        Self {
            log_level,
            finboard_home: finboard_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn finboard_home(&self) -> &DisplayPath {
        &self.finboard_home
    }
}

/// Args for the `finboard init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where transactions are kept: "local" or "sheet".
    #[arg(long, default_value_t = StoreKind::Local)]
    store: StoreKind,

    /// The CSV file for the local store. Defaults to $FINBOARD_HOME/transactions.csv
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// The URL of your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: Option<String>,

    /// The tab that holds transactions. Defaults to "Transactions"
    #[arg(long)]
    sheet_name: Option<String>,

    /// The path to your downloaded OAuth client secret.
    #[arg(long)]
    client_secret: Option<PathBuf>,

    /// The path to your OAuth token file.
    #[arg(long)]
    token: Option<PathBuf>,
}

impl InitArgs {
    pub fn local(transactions: Option<PathBuf>) -> Self {
        Self {
            store: StoreKind::Local,
            transactions,
            sheet_url: None,
            sheet_name: None,
            client_secret: None,
            token: None,
        }
    }

    pub fn sheet(
        sheet_url: impl Into<String>,
        client_secret: impl Into<PathBuf>,
        token: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store: StoreKind::Sheet,
            transactions: None,
            sheet_url: Some(sheet_url.into()),
            sheet_name: None,
            client_secret: Some(client_secret.into()),
            token: Some(token.into()),
        }
    }

    pub fn store(&self) -> StoreKind {
        self.store
    }

    pub fn transactions(&self) -> Option<&Path> {
        self.transactions.as_deref()
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn client_secret(&self) -> Option<&Path> {
        self.client_secret.as_deref()
    }

    pub fn token(&self) -> Option<&Path> {
        self.token.as_deref()
    }
}

/// Args for the `finboard add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The date of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    category: String,

    #[arg(long, default_value = "")]
    description: String,

    /// A non-negative amount, e.g. 12.50
    #[arg(long)]
    amount: Decimal,

    /// "income" or "expense"
    #[arg(long = "type", value_enum)]
    kind: EntryType,

    #[arg(long, default_value = "")]
    payment_method: String,
}

impl AddArgs {
    pub fn new(
        date: Option<NaiveDate>,
        category: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
        kind: EntryType,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            description: description.into(),
            amount,
            kind,
            payment_method: payment_method.into(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> EntryType {
        self.kind
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }
}

/// The filter options shared by `report` and `export`.
#[derive(Debug, Default, Parser, Clone)]
pub struct FilterArgs {
    /// The first date to include, YYYY-MM-DD. Defaults to the earliest date in the data.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// The last date to include, YYYY-MM-DD. Defaults to the latest date in the data.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only include this category. "All" includes every category.
    #[arg(long, default_value = ALL)]
    category: Selection,

    /// Only include this type, e.g. "Expense". "All" includes every type.
    #[arg(long = "type", default_value = ALL)]
    kind: Selection,
}

impl FilterArgs {
    pub fn new(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        category: Selection,
        kind: Selection,
    ) -> Self {
        Self {
            from,
            to,
            category,
            kind,
        }
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn category(&self) -> &Selection {
        &self.category
    }

    pub fn kind(&self) -> &Selection {
        &self.kind
    }
}

/// Args for the `finboard report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[clap(flatten)]
    filter: FilterArgs,

    /// How many of the largest expenses to list.
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// "text" or "json"
    #[arg(long, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

impl ReportArgs {
    pub fn new(filter: FilterArgs, top: usize, format: ReportFormat) -> Self {
        Self {
            filter,
            top,
            format,
        }
    }

    pub fn filter(&self) -> &FilterArgs {
        &self.filter
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }
}

/// Args for the `finboard export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    filter: FilterArgs,

    /// The file to write. Writes to stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(filter: FilterArgs, output: Option<PathBuf>) -> Self {
        Self { filter, output }
    }

    pub fn filter(&self) -> &FilterArgs {
        &self.filter
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

fn default_finboard_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finboard"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --finboard-home or FINBOARD_HOME instead of relying on the \
                default finboard home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("finboard")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
