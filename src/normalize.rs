//! Turns raw rows from a store into typed `Transaction`s.
//!
//! Ingestion is best-effort. A row whose date cannot be parsed is dropped, an amount that cannot
//! be parsed becomes zero and missing text becomes an empty string. Nothing in here fails.

use crate::model::{Amount, Column, RawRow, Transaction, TransactionType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Date-only formats, tried in order. Month-first wins over day-first for slashed dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%d-%b-%Y",
];

/// Date-time formats, tried in order after the date-only formats. Time of day is dropped.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Parses a date the way a spreadsheet user is likely to have typed it. Returns `None` if nothing
/// matches.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Compact "20240305". chrono's %Y is greedy so this is handled by hand.
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // %Y also takes a single digit, which would read "3/5/24" as year 3.
    let year_first = starts_with_year(s);
    let allowed = |f: &&&str| year_first || !f.starts_with("%Y");

    DATE_FORMATS
        .iter()
        .filter(allowed)
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .filter(allowed)
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local().date())
        })
}

/// True if `s` opens with four digits followed by a separator.
fn starts_with_year(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() > 4 && b[..4].iter().all(u8::is_ascii_digit) && !b[4].is_ascii_digit()
}

/// Normalizes `rows` into transactions, preserving their order.
///
/// - Rows without a parseable `Date` are dropped.
/// - `Amount` falls back to zero when it cannot be parsed.
/// - `Category`, `Description`, `Type` and `Payment_Method` are trimmed and default to empty.
///
/// If no row has a `Date` or no row has an `Amount` column then the source table lacks one of the
/// two required columns and the result is empty.
pub fn normalize(rows: &[RawRow]) -> Vec<Transaction> {
    let date_col = Column::Date.header();
    let amount_col = Column::Amount.header();
    if !rows.iter().any(|r| r.contains(date_col)) {
        debug!("No '{date_col}' column found in {} rows", rows.len());
        return Vec::new();
    }
    if !rows.iter().any(|r| r.contains(amount_col)) {
        debug!("No '{amount_col}' column found in {} rows", rows.len());
        return Vec::new();
    }

    let mut dropped = 0usize;
    let transactions: Vec<Transaction> = rows
        .iter()
        .filter_map(|row| {
            let transaction = normalize_row(row);
            if transaction.is_none() {
                dropped += 1;
            }
            transaction
        })
        .collect();

    if dropped > 0 {
        debug!(
            "Dropped {dropped} of {} rows because their dates could not be parsed",
            rows.len()
        );
    }
    transactions
}

fn normalize_row(row: &RawRow) -> Option<Transaction> {
    let raw_date = row.get(Column::Date.header()).unwrap_or_default();
    let Some(date) = parse_date(raw_date) else {
        debug!("Skipping row with unparseable date '{raw_date}'");
        return None;
    };
    let amount = row
        .get(Column::Amount.header())
        .map(Amount::parse_lenient)
        .unwrap_or_default();
    Some(Transaction::new(
        date,
        text(row, Column::Category),
        text(row, Column::Description),
        amount,
        TransactionType::from(text(row, Column::Type).as_str()),
        text(row, Column::PaymentMethod),
    ))
}

/// A trimmed text cell, or empty if the column is missing.
fn text(row: &RawRow, column: Column) -> String {
    row.get(column.header())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}
