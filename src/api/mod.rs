//! Access to the remote spreadsheet.
//!
//! The `Sheet` trait is the seam between the sheet store and Google. `GoogleSheet` talks to the
//! Sheets and Drive APIs. `TestSheet` keeps tabs in memory so the whole app can run without a
//! network. `Mode` decides which one `sheet` hands out.

mod files;
mod oauth;
mod sheet;
mod sheet_test_client;

use crate::error::Res;
use sheet::GoogleSheet;
use tracing::debug;

#[cfg(test)]
pub(crate) use files::TokenFile;
pub(crate) use oauth::TokenProvider;
pub(crate) use sheet_test_client::TestSheet;

/// The spreadsheets scope is needed to read and write values. The drive.readonly scope is needed
/// to read the file's revision number.
pub(crate) const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// The name of the tab holding transactions when `config.json` does not name one.
pub(crate) const DEFAULT_SHEET_NAME: &str = "Transactions";

/// The env var that switches the app to the in-memory sheet.
pub const TEST_MODE_ENV: &str = "FINBOARD_IN_TEST_MODE";

/// Whether the sheet store talks to Google or to an in-memory sheet.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// `Mode::Test` if `FINBOARD_IN_TEST_MODE` is set to a non-empty value, `Mode::Google`
    /// otherwise.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// A block of rows to write, starting in column A of `start_row` (0-based).
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SheetRange {
    pub(crate) sheet_name: String,
    pub(crate) start_row: usize,
    pub(crate) values: Vec<Vec<String>>,
}

impl SheetRange {
    pub(crate) fn new(sheet_name: &str, start_row: usize, values: Vec<Vec<String>>) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            start_row,
            values,
        }
    }

    /// The range in A1 notation, e.g. `'Transactions'!A5:F5`.
    pub(crate) fn a1(&self) -> String {
        let width = self.values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let height = self.values.len().max(1);
        format!(
            "{}!A{}:{}{}",
            quote_sheet_name(&self.sheet_name),
            self.start_row + 1,
            column_name(width - 1),
            self.start_row + height
        )
    }
}

/// Quotes a tab name for use in an A1 range.
pub(crate) fn quote_sheet_name(sheet_name: &str) -> String {
    format!("'{}'", sheet_name.replace('\'', "''"))
}

/// Converts a 0-based column index to its letters, e.g. 0 is `A` and 27 is `AB`.
fn column_name(mut ix: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (ix % 26) as u8);
        if ix < 26 {
            break;
        }
        ix = ix / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).to_string()
}

/// The operations the sheet store needs from a spreadsheet.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// The id of the spreadsheet this client reads and writes.
    fn spreadsheet_id(&self) -> &str;

    /// Gets every row of `sheet_name` as formatted strings. The first row is the header.
    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>>;

    /// Writes each range's values in one batch.
    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()>;

    /// Returns a revision identifier that changes whenever the spreadsheet changes.
    async fn revision(&mut self) -> Res<String>;
}

/// Creates the `Sheet` for `mode`.
pub(crate) async fn sheet(
    spreadsheet_id: &str,
    token_provider: TokenProvider,
    mode: Mode,
) -> Res<Box<dyn Sheet + Send>> {
    match mode {
        Mode::Google => {
            debug!("Creating a Google sheet client");
            Ok(Box::new(
                GoogleSheet::new(spreadsheet_id, token_provider).await?,
            ))
        }
        Mode::Test => {
            debug!("Creating an in-memory test sheet");
            Ok(Box::new(TestSheet::new(spreadsheet_id)))
        }
    }
}
