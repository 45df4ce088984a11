//! A `RecordStore` backed by a CSV file on the local filesystem.

use crate::backup::Backup;
use crate::error::Res;
use crate::model::{NewEntry, RawRow};
use crate::store::{parse_csv, read_table, write_table, Fingerprint, RecordStore, Table};
use crate::utils;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, trace};

/// Reads and rewrites a single CSV file. A missing or empty file is an empty store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    backup: Backup,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>, backup: Backup) -> Self {
        Self {
            path: path.into(),
            backup,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("transactions.csv"))
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}.tmp", self.file_name()))
    }
}

#[async_trait::async_trait]
impl RecordStore for CsvStore {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    async fn fingerprint(&mut self) -> Res<Fingerprint> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Fingerprint::Missing),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Unable to stat {}", self.path.display()));
            }
        };
        let modified = metadata
            .modified()
            .with_context(|| format!("Unable to read the mtime of {}", self.path.display()))?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Ok(Fingerprint::File {
            len: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }

    async fn load_all(&mut self) -> Res<Vec<RawRow>> {
        trace!("Loading {}", self.path.display());
        match utils::read_if_exists(&self.path).await? {
            Some(content) => parse_csv(&content)
                .with_context(|| format!("Unable to parse {}", self.path.display())),
            None => {
                debug!("{} does not exist, treating it as empty", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    async fn append(&mut self, entry: &NewEntry) -> Res<()> {
        let existing = utils::read_if_exists(&self.path).await?;
        let mut table = match existing.as_deref() {
            Some(content) => read_table(content)
                .with_context(|| format!("Unable to parse {}", self.path.display()))?,
            None => Table::default(),
        };

        if existing.is_some_and(|content| !content.trim().is_empty()) {
            let backup_path = self.backup.copy_file(&self.file_name(), &self.path).await?;
            debug!("Backed up {} to {}", self.path.display(), backup_path.display());
        }

        if table.push_entry(entry) {
            debug!("Aligned the header of {} to {:?}", self.path.display(), table.headers);
        }
        let bytes = write_table(&table)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            utils::make_dir(parent).await?;
        }
        let temp = self.temp_path();
        utils::write(&temp, bytes).await?;
        if let Err(e) = utils::rename(&temp, &self.path).await {
            utils::remove_if_exists(&temp).await?;
            return Err(e);
        }
        trace!("Appended a row to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn entry(day: u32, amount: i64) -> NewEntry {
        NewEntry::new(
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            "Food",
            "Lunch",
            Decimal::from(amount),
            EntryType::Expense,
            "Cash",
        )
        .unwrap()
    }

    fn store(dir: &TempDir) -> CsvStore {
        CsvStore::new(
            dir.path().join("transactions.csv"),
            Backup::new(dir.path().join(".backups"), 5),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        assert_eq!(store.fingerprint().await.unwrap(), Fingerprint::Missing);
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_to_missing_file_writes_canonical_header() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.append(&entry(1, 10)).await.unwrap();

        let text = utils::read(store.path()).await.unwrap();
        assert_eq!(
            text,
            "Date,Category,Description,Amount,Type,Payment_Method\n\
             2024-06-01,Food,Lunch,10,Expense,Cash\n"
        );
        assert!(!store.temp_path().exists());
        // Nothing existed, so nothing was backed up
        assert!(!dir.path().join(".backups").exists());
    }

    #[tokio::test]
    async fn test_append_keeps_existing_rows_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        utils::write(
            store.path(),
            "Date,Amount,Type,Category\n2024-05-01,1000,Income,Salary\n",
        )
        .await
        .unwrap();
        let before = store.fingerprint().await.unwrap();

        store.append(&entry(2, 25)).await.unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Category"), Some("Salary"));
        assert_eq!(rows[0].get("Payment_Method"), Some(""));
        assert_eq!(rows[1].get("Date"), Some("2024-06-02"));
        assert_eq!(rows[1].get("Amount"), Some("25"));
        assert_eq!(rows[1].get("Payment_Method"), Some("Cash"));
        assert_ne!(store.fingerprint().await.unwrap(), before);

        let mut backups = utils::read_dir(&dir.path().join(".backups")).await.unwrap();
        let backup = backups.next_entry().await.unwrap().unwrap();
        let content = utils::read(&backup.path()).await.unwrap();
        assert!(content.contains("Salary"));
        assert!(!content.contains("Lunch"));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        utils::write(store.path(), "").await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
        store.append(&entry(3, 7)).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }
}
