//! The persistence boundary for transaction data.
//!
//! A `RecordStore` can load every raw row and append one new row. There are two implementations,
//! a local CSV file and a Google sheet, and the one in use is chosen once from the `Config` by
//! `open`. Nothing downstream knows which one it is talking to.

mod csv_file;
mod sheet;

pub use csv_file::CsvStore;
pub use sheet::SheetStore;

use crate::api::{self, Mode, TokenProvider};
use crate::config::StoreKind;
use crate::error::Res;
use crate::model::{Column, NewEntry, RawRow, COLUMNS};
use crate::Config;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

/// Identifies a version of a store's content. Two loads with equal fingerprints see the same rows.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Fingerprint {
    /// The backing file does not exist.
    Missing,
    /// The size and modification time of a backing file.
    File {
        len: u64,
        modified_secs: u64,
        modified_nanos: u32,
    },
    /// A revision number reported by a remote store.
    Revision { revision: String },
}

/// Loads and appends raw transaction rows.
#[async_trait::async_trait]
pub trait RecordStore: Send {
    /// A short, human-readable name for this store, e.g. the file path.
    fn source(&self) -> String;

    /// Returns the current fingerprint of the store's content.
    async fn fingerprint(&mut self) -> Res<Fingerprint>;

    /// Loads every row. An empty or missing store yields no rows.
    async fn load_all(&mut self) -> Res<Vec<RawRow>>;

    /// Appends a single row built from `entry`.
    async fn append(&mut self, entry: &NewEntry) -> Res<()>;
}

/// Opens the store selected by `config`.
///
/// # Errors
/// Fails if the store is misconfigured. For the sheet store this includes a missing or invalid
/// sheet URL and missing or unreadable credentials. The local store is never substituted.
pub async fn open(config: &Config, mode: Mode) -> Res<Box<dyn RecordStore>> {
    match config.store() {
        StoreKind::Local => {
            let path = config.transactions_path();
            debug!("Using the local store at {}", path.display());
            Ok(Box::new(CsvStore::new(path, config.backup())))
        }
        StoreKind::Sheet => {
            let spreadsheet_id = config.spreadsheet_id()?;
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path())
                    .await
                    .context("The sheet store requires valid credentials")?;
            let sheet = api::sheet(spreadsheet_id, token_provider, mode).await?;
            debug!(
                "Using the sheet store '{}' in spreadsheet {spreadsheet_id}",
                config.sheet_name()
            );
            Ok(Box::new(SheetStore::new(sheet, config.sheet_name())))
        }
    }
}

/// A header row plus the data rows beneath it, as untyped strings.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub(crate) struct Table {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Vec<String>>,
}

impl Table {
    /// Splits `values` into its first row (the headers) and the rest.
    pub(crate) fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let rows = values.split_off(1);
        let headers = values.into_iter().next().unwrap_or_default();
        Self { headers, rows }
    }

    pub(crate) fn raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|row| RawRow::from_cells(self.headers.as_slice(), row.as_slice()))
            .collect()
    }

    /// Adds `entry` as a new row, matching cells to the existing headers by name. Canonical
    /// columns the table lacks are added to the end of the headers. Returns `true` if the headers
    /// changed.
    pub(crate) fn push_entry(&mut self, entry: &NewEntry) -> bool {
        let mut changed = false;
        for column in COLUMNS {
            if !self.headers.iter().any(|h| h == column.header()) {
                self.headers.push(column.header().to_string());
                changed = true;
            }
        }
        let row = self
            .headers
            .iter()
            .map(|h| match Column::from_str(h) {
                Ok(column) => entry.cell(column),
                Err(_) => String::new(),
            })
            .collect();
        self.rows.push(row);
        changed
    }
}

/// Reads CSV text with a header row into a `Table`. Short rows are allowed.
pub(crate) fn read_table(content: &str) -> Res<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(content.as_bytes()));
    let headers = reader
        .headers()
        .context("Unable to read the CSV header row")?
        .iter()
        .map(String::from)
        .collect();
    let mut rows = Vec::new();
    for (ix, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Unable to read CSV row {}", ix + 2))?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(Table { headers, rows })
}

/// Writes a `Table` as CSV. Rows are padded to the header length.
pub(crate) fn write_table(table: &Table) -> Res<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());
    if table.headers.is_empty() {
        bail!("Refusing to write a table without headers");
    }
    writer
        .write_record(&table.headers)
        .context("Unable to write the CSV header")?;
    let len = table.headers.len();
    for row in &table.rows {
        let padded = (0..len).map(|ix| row.get(ix).map(String::as_str).unwrap_or_default());
        writer
            .write_record(padded)
            .context("Unable to write a CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to flush the CSV writer: {}", e.error()))
}

/// Parses CSV text with a header row into raw rows.
pub fn parse_csv(content: &str) -> Res<Vec<RawRow>> {
    Ok(read_table(content)?.raw_rows())
}
