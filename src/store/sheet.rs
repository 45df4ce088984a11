//! A `RecordStore` backed by one tab of a spreadsheet.

use crate::api::{Sheet, SheetRange};
use crate::error::Res;
use crate::model::{NewEntry, RawRow};
use crate::store::{Fingerprint, RecordStore, Table};
use anyhow::Context;
use tracing::{debug, trace};

/// Reads the whole tab on every load and appends by writing the row after the last data row. When
/// the header has to grow, the header row is rewritten in the same batch.
pub struct SheetStore {
    sheet: Box<dyn Sheet + Send>,
    sheet_name: String,
}

impl SheetStore {
    pub(crate) fn new(sheet: Box<dyn Sheet + Send>, sheet_name: impl Into<String>) -> Self {
        Self {
            sheet,
            sheet_name: sheet_name.into(),
        }
    }

    async fn table(&mut self) -> Res<Table> {
        let values = self
            .sheet
            .get(&self.sheet_name)
            .await
            .with_context(|| format!("Unable to read the '{}' sheet", self.sheet_name))?;
        trace!("Read {} rows from '{}'", values.len(), self.sheet_name);
        Ok(Table::from_values(values))
    }
}

#[async_trait::async_trait]
impl RecordStore for SheetStore {
    fn source(&self) -> String {
        format!(
            "sheet '{}' in spreadsheet {}",
            self.sheet_name,
            self.sheet.spreadsheet_id()
        )
    }

    async fn fingerprint(&mut self) -> Res<Fingerprint> {
        let revision = self
            .sheet
            .revision()
            .await
            .context("Unable to read the spreadsheet revision")?;
        Ok(Fingerprint::Revision { revision })
    }

    async fn load_all(&mut self) -> Res<Vec<RawRow>> {
        Ok(self.table().await?.raw_rows())
    }

    async fn append(&mut self, entry: &NewEntry) -> Res<()> {
        let mut table = self.table().await?;
        let headers_changed = table.push_entry(entry);

        let mut ranges = Vec::with_capacity(2);
        if headers_changed {
            debug!("Writing the header row of '{}'", self.sheet_name);
            ranges.push(SheetRange::new(
                &self.sheet_name,
                0,
                vec![table.headers.clone()],
            ));
        }
        let row = table.rows.last().cloned().unwrap_or_default();
        ranges.push(SheetRange::new(
            &self.sheet_name,
            table.rows.len(),
            vec![row],
        ));

        self.sheet
            .write_ranges(&ranges)
            .await
            .with_context(|| format!("Unable to append to the '{}' sheet", self.sheet_name))
    }
}
