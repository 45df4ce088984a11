//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{Sheet, SheetRange, DEFAULT_SHEET_NAME};
use crate::error::Res;
use anyhow::Context;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// The tabs of one in-memory spreadsheet and a counter that goes up on every write.
#[derive(Debug, Default, Clone)]
struct TestSheetState {
    tabs: HashMap<String, Vec<Vec<String>>>,
    revision: u64,
}

/// In-memory spreadsheets keyed by spreadsheet id. They outlive any one `TestSheet` so that a
/// second command in the same process sees what the first one wrote.
static SPREADSHEETS: OnceLock<Mutex<HashMap<String, TestSheetState>>> = OnceLock::new();

fn spreadsheets() -> MutexGuard<'static, HashMap<String, TestSheetState>> {
    SPREADSHEETS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// An implementation of the `Sheet` trait that does not use Google sheets. A spreadsheet id seen
/// for the first time is seeded with some sample transactions.
pub(crate) struct TestSheet {
    spreadsheet_id: String,
}

impl TestSheet {
    pub(crate) fn new(spreadsheet_id: &str) -> Self {
        spreadsheets()
            .entry(spreadsheet_id.to_string())
            .or_insert_with(default_state);
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    /// Replaces the content of `spreadsheet_id` with `tabs`.
    #[cfg(test)]
    pub(crate) fn with_tabs(spreadsheet_id: &str, tabs: HashMap<String, Vec<Vec<String>>>) -> Self {
        spreadsheets().insert(
            spreadsheet_id.to_string(),
            TestSheetState { tabs, revision: 1 },
        );
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    /// Returns a copy of one tab, empty if it does not exist.
    #[cfg(test)]
    pub(crate) fn tab(spreadsheet_id: &str, sheet_name: &str) -> Vec<Vec<String>> {
        spreadsheets()
            .get(spreadsheet_id)
            .and_then(|state| state.tabs.get(sheet_name).cloned())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        let all = spreadsheets();
        let state = all
            .get(&self.spreadsheet_id)
            .with_context(|| format!("Spreadsheet '{}' not found", self.spreadsheet_id))?;
        Ok(state.tabs.get(sheet_name).cloned().unwrap_or_default())
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        let mut all = spreadsheets();
        let state = all
            .get_mut(&self.spreadsheet_id)
            .with_context(|| format!("Spreadsheet '{}' not found", self.spreadsheet_id))?;
        for range in data {
            let tab = state.tabs.entry(range.sheet_name.clone()).or_default();
            for (offset, values) in range.values.iter().enumerate() {
                let ix = range.start_row + offset;
                if tab.len() <= ix {
                    tab.resize_with(ix + 1, Vec::new);
                }
                let row = &mut tab[ix];
                if row.len() < values.len() {
                    row.resize(values.len(), String::new());
                }
                row[..values.len()].clone_from_slice(values);
            }
        }
        state.revision += 1;
        Ok(())
    }

    async fn revision(&mut self) -> Res<String> {
        let all = spreadsheets();
        let state = all
            .get(&self.spreadsheet_id)
            .with_context(|| format!("Spreadsheet '{}' not found", self.spreadsheet_id))?;
        Ok(state.revision.to_string())
    }
}

fn default_state() -> TestSheetState {
    let mut tabs = HashMap::new();
    tabs.insert(DEFAULT_SHEET_NAME.to_string(), load_csv(TRANSACTION_DATA));
    TestSheetState { tabs, revision: 1 }
}

/// Loads rows from a CSV-formatted string, including the header row.
fn load_csv(csv_data: &str) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));
    rdr.records()
        .filter_map(|result| result.ok())
        .map(|record| record.iter().map(String::from).collect())
        .collect()
}

/// Seed transaction data, formatted the way the Sheets API returns formatted values.
const TRANSACTION_DATA: &str = r##"Date,Category,Description,Amount,Type,Payment_Method
7/1/2025,Salary,Monthly paycheck,"$4,200.00",Income,Direct Deposit
7/3/2025,Rent,July rent,"$1,650.00",Expense,Bank Transfer
7/9/2025,Groceries,Whole Foods Market,$87.43,Expense,Credit Card
7/15/2025,Utilities,PG&E Electric,$142.67,Expense,Checking
7/22/2025,Dining,Chipotle Mexican Grill,$14.85,Expense,Credit Card
8/1/2025,Salary,Monthly paycheck,"$4,200.00",Income,Direct Deposit
8/3/2025,Rent,August rent,"$1,650.00",Expense,Bank Transfer
8/10/2025,Groceries,Trader Joe's,$63.21,Expense,Credit Card
8/14/2025,Transport,Shell Gas Station,$52.30,Expense,Credit Card
8/19/2025,Freelance,Logo design,$350.00,Income,PayPal
8/27/2025,Dining,Olive Garden,$42.30,Expense,Credit Card
9/1/2025,Salary,Monthly paycheck,"$4,200.00",Income,Direct Deposit
9/3/2025,Rent,September rent,"$1,650.00",Expense,Bank Transfer
9/6/2025,Groceries,Costco Wholesale,$118.56,Expense,Debit Card
9/12/2025,Utilities,Comcast Internet,$89.99,Expense,Checking
9/20/2025,Transport,Chevron Gas,$48.90,Expense,Credit Card
9/28/2025,Dining,Blue Bottle Coffee,$8.50,Expense,Cash
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_and_shared_between_instances() {
        let id = uuid::Uuid::new_v4().to_string();
        let mut first = TestSheet::new(&id);
        let rows = first.get(DEFAULT_SHEET_NAME).await.unwrap();
        assert_eq!(rows.len(), 18);
        assert_eq!(rows[0][0], "Date");
        assert_eq!(first.revision().await.unwrap(), "1");

        let row = vec!["10/1/2025".to_string(), "Salary".to_string()];
        first
            .write_ranges(&[SheetRange::new(DEFAULT_SHEET_NAME, 18, vec![row])])
            .await
            .unwrap();

        let mut second = TestSheet::new(&id);
        let rows = second.get(DEFAULT_SHEET_NAME).await.unwrap();
        assert_eq!(rows.len(), 19);
        assert_eq!(rows[18], vec!["10/1/2025", "Salary"]);
        assert_eq!(second.revision().await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_missing_tab_is_empty() {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sheet = TestSheet::new(&id);
        assert!(sheet.get("Nope").await.unwrap().is_empty());
    }
}
