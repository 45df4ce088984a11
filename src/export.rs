//! Writes transactions back out as CSV in the same column layout the stores use.

use crate::error::Res;
use crate::model::{Transaction, COLUMNS};
use anyhow::Context;

/// Serializes `transactions` to UTF-8 CSV with a header row and one row per transaction. The
/// output can be loaded and normalized again without loss.
pub fn export(transactions: &[Transaction]) -> Res<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(COLUMNS.iter().map(|c| c.header()))
        .context("Unable to write the CSV header")?;
    for t in transactions {
        writer
            .write_record(COLUMNS.iter().map(|c| t.cell(*c)))
            .context("Unable to write a CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to flush the CSV writer: {}", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, TransactionType};
    use crate::normalize::normalize;
    use crate::store::parse_csv;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn txn(date: &str, category: &str, description: &str, amount: &str, r#type: &str) -> Transaction {
        Transaction::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category,
            description,
            Amount::from_str(amount).unwrap(),
            TransactionType::from(r#type),
            "Card",
        )
    }

    #[test]
    fn test_export_layout() {
        let data = vec![txn("2024-01-05", "Food", "Tacos, \"extra\" salsa", "12.5", "Expense")];
        let bytes = export(&data).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Category,Description,Amount,Type,Payment_Method")
        );
        assert_eq!(
            lines.next(),
            Some("2024-01-05,Food,\"Tacos, \"\"extra\"\" salsa\",12.5,Expense,Card")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty_has_header() {
        let text = String::from_utf8(export(&[]).unwrap()).unwrap();
        assert_eq!(text, "Date,Category,Description,Amount,Type,Payment_Method\n");
    }

    #[test]
    fn test_export_round_trips_through_normalize() {
        let data = vec![
            txn("2024-01-05", "Food", "Groceries", "120.50", "Expense"),
            txn("2024-01-06", "", "", "0", "Income"),
            txn("2024-02-29", "Misc", "Leap day", "1,000.01", "Transfer"),
        ];
        let bytes = export(&data).unwrap();
        let rows = parse_csv(&String::from_utf8(bytes).unwrap()).unwrap();
        assert_eq!(normalize(&rows), data);
    }
}
