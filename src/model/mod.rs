//! Types that represent the core data model, such as `Transaction` and `Amount`.
mod amount;
mod transaction;
mod year_month;

pub use amount::{format_whole, Amount, AmountError};
pub use transaction::{
    Column, EntryType, NewEntry, RawRow, Transaction, TransactionType, COLUMNS, DATE_FORMAT,
};
pub use year_month::YearMonth;
