use crate::model::{Amount, YearMonth};
use anyhow::ensure;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The date format used when writing dates back to a store or an export.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents the known columns of a transactions table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Column {
    Date,
    Category,
    Description,
    Amount,
    Type,
    #[serde(rename = "Payment_Method")]
    PaymentMethod,
}

serde_plain::derive_display_from_serialize!(Column);
serde_plain::derive_fromstr_from_deserialize!(Column);

/// The order in which columns are written when appending or exporting.
pub const COLUMNS: [Column; 6] = [
    Column::Date,
    Column::Category,
    Column::Description,
    Column::Amount,
    Column::Type,
    Column::PaymentMethod,
];

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Category => "Category",
            Column::Description => "Description",
            Column::Amount => "Amount",
            Column::Type => "Type",
            Column::PaymentMethod => "Payment_Method",
        }
    }
}

/// A row as it comes out of a store: column name to untyped cell value. Columns that were not in
/// the source table are simply absent.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    /// Builds a row by pairing `headers` with `values`. Missing trailing values become empty
    /// cells and values without a header are ignored.
    pub fn from_cells<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let cells = headers
            .iter()
            .enumerate()
            .map(|(ix, header)| {
                let value = values.get(ix).map(|v| v.as_ref()).unwrap_or_default();
                (header.as_ref().to_string(), value.to_string())
            })
            .collect();
        Self(cells)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(|s| s.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The kind of a transaction. Only `Income` and `Expense` take part in the financial math, other
/// values are kept as they were found.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TransactionType {
    Income,
    Expense,
    Other(String),
}

impl TransactionType {
    pub const INCOME: &'static str = "Income";
    pub const EXPENSE: &'static str = "Expense";

    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Income => Self::INCOME,
            TransactionType::Expense => Self::EXPENSE,
            TransactionType::Other(s) => s.as_str(),
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, TransactionType::Income)
    }

    pub fn is_expense(&self) -> bool {
        matches!(self, TransactionType::Expense)
    }
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Other(String::new())
    }
}

impl From<&str> for TransactionType {
    /// Matching is exact: `"income"` is not `Income`.
    fn from(value: &str) -> Self {
        match value {
            Self::INCOME => TransactionType::Income,
            Self::EXPENSE => TransactionType::Expense,
            other => TransactionType::Other(other.to_string()),
        }
    }
}

impl From<EntryType> for TransactionType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::Income => TransactionType::Income,
            EntryType::Expense => TransactionType::Expense,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TransactionType::from(s.as_str()))
    }
}

/// A normalized transaction. The calendar fields are derived from `date` when the transaction is
/// created and cannot be set independently.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "StoredTransaction")]
pub struct Transaction {
    date: NaiveDate,
    category: String,
    description: String,
    amount: Amount,
    r#type: TransactionType,
    payment_method: String,
    year: i32,
    month: u32,
    year_month: YearMonth,
}

/// The fields of a serialized `Transaction` that are not derived. Serialized calendar fields are
/// ignored and recomputed from `date`.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct StoredTransaction {
    date: NaiveDate,
    category: String,
    description: String,
    amount: Amount,
    r#type: TransactionType,
    payment_method: String,
}

impl From<StoredTransaction> for Transaction {
    fn from(t: StoredTransaction) -> Self {
        Transaction::new(
            t.date,
            t.category,
            t.description,
            t.amount,
            t.r#type,
            t.payment_method,
        )
    }
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        r#type: TransactionType,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            description: description.into(),
            amount,
            r#type,
            payment_method: payment_method.into(),
            year: date.year(),
            month: date.month(),
            year_month: YearMonth::from_date(date),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn r#type(&self) -> &TransactionType {
        &self.r#type
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year_month(&self) -> YearMonth {
        self.year_month
    }

    pub fn is_income(&self) -> bool {
        self.r#type.is_income()
    }

    pub fn is_expense(&self) -> bool {
        self.r#type.is_expense()
    }

    /// Returns the cell value this transaction has for `column`, as it would be written to a store.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Date => self.date.format(DATE_FORMAT).to_string(),
            Column::Category => self.category.clone(),
            Column::Description => self.description.clone(),
            Column::Amount => self.amount.to_string(),
            Column::Type => self.r#type.to_string(),
            Column::PaymentMethod => self.payment_method.clone(),
        }
    }
}

/// The type of a newly submitted transaction. Unlike `TransactionType` this is closed.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum EntryType {
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(EntryType);
serde_plain::derive_fromstr_from_deserialize!(EntryType);

/// A new transaction submitted by the user. Every field is required. It is written to the store
/// as-is and only normalized when the store is next loaded.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewEntry {
    date: NaiveDate,
    category: String,
    description: String,
    amount: Decimal,
    r#type: EntryType,
    payment_method: String,
}

impl NewEntry {
    /// Validates and creates a `NewEntry`. Text fields are trimmed.
    ///
    /// # Errors
    /// - Returns an error if `amount` is negative or larger than `Amount::MAX`.
    pub fn new(
        date: NaiveDate,
        category: impl AsRef<str>,
        description: impl AsRef<str>,
        amount: Decimal,
        r#type: EntryType,
        payment_method: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        ensure!(
            !amount.is_sign_negative() || amount.is_zero(),
            "The amount must not be negative, got {amount}"
        );
        ensure!(
            amount <= Amount::MAX,
            "The amount must not exceed {}, got {amount}",
            Amount::MAX
        );
        Ok(Self {
            date,
            category: category.as_ref().trim().to_string(),
            description: description.as_ref().trim().to_string(),
            amount,
            r#type,
            payment_method: payment_method.as_ref().trim().to_string(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn r#type(&self) -> EntryType {
        self.r#type
    }

    /// The raw cell value for `column`.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Date => self.date.format(DATE_FORMAT).to_string(),
            Column::Category => self.category.clone(),
            Column::Description => self.description.clone(),
            Column::Amount => self.amount.to_string(),
            Column::Type => self.r#type.to_string(),
            Column::PaymentMethod => self.payment_method.clone(),
        }
    }

    /// The entry as a raw row keyed by the canonical headers.
    pub fn to_raw_row(&self) -> RawRow {
        COLUMNS
            .iter()
            .map(|column| (column.header(), self.cell(*column)))
            .collect()
    }
}
