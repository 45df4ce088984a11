//! Keeps rotating copies of the local transactions file before it is rewritten.

use crate::error::Res;
use crate::model::DATE_FORMAT;
use crate::utils;
use anyhow::Context;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rotating copies of one directory's worth of files, usually built by `Config::backup()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    pub fn new(backups_dir: impl Into<PathBuf>, backup_copies: u32) -> Self {
        Self {
            backups_dir: backups_dir.into(),
            backup_copies,
        }
    }

    /// Copies `source` to `{prefix}.YYYY-MM-DD-NNN` in the backups directory, then drops the
    /// oldest copies so that at most `backup_copies` remain. Returns the new copy's path.
    pub async fn copy_file(&self, prefix: &str, source: &Path) -> Res<PathBuf> {
        utils::make_dir(&self.backups_dir).await?;
        let date = Local::now().format(DATE_FORMAT).to_string();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}"));
        utils::copy(source, &path).await?;
        self.rotate(prefix).await?;
        Ok(path)
    }

    /// Names and paths of the existing backups of `prefix`, oldest first. The name format sorts by
    /// date and then sequence number.
    async fn existing(&self, prefix: &str) -> Res<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .with_context(|| format!("Unable to list {}", self.backups_dir.display()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_backup_file(&name, prefix) {
                found.push((name, entry.path()));
            }
        }
        found.sort();
        Ok(found)
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let highest = self
            .existing(prefix)
            .await?
            .iter()
            .filter_map(|(name, _)| parse_sequence_number(name, prefix, date))
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Deletes the oldest backups of `prefix` until only `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Res<()> {
        let found = self.existing(prefix).await?;
        let excess = found.len().saturating_sub(self.backup_copies as usize);
        for (name, path) in found.into_iter().take(excess) {
            debug!("Removing old backup {name}");
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

/// Parses the sequence number from a backup filename like `{prefix}.{date}-{NNN}`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    let expected_start = format!("{prefix}.{date}-");
    let seq = filename.strip_prefix(&expected_start)?;
    if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

/// Checks if `filename` looks like `{prefix}.YYYY-MM-DD-NNN`.
fn is_backup_file(filename: &str, prefix: &str) -> bool {
    let Some(rest) = filename.strip_prefix(&format!("{prefix}.")) else {
        return false;
    };
    match rest.rsplit_once('-') {
        Some((date, seq)) => {
            date.len() == 10 && !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("transactions.csv.2025-12-14-001", "transactions.csv", "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("transactions.csv.2025-12-14-042", "transactions.csv", "2025-12-14"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("ledger.csv.2025-12-14-001", "transactions.csv", "2025-12-14"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("transactions.csv.2025-12-13-001", "transactions.csv", "2025-12-14"),
            None
        );
        // Temp files are not backups
        assert_eq!(
            parse_sequence_number("transactions.csv.2025-12-14-001.tmp", "transactions.csv", "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("transactions.csv.2025-12-14-001", "transactions.csv"));
        assert!(!is_backup_file("transactions.csv.2025-12-14-001", "other.csv"));
        assert!(!is_backup_file("transactions.csv.tmp", "transactions.csv"));
        assert!(!is_backup_file("transactions.csv", "transactions.csv"));
    }

    #[tokio::test]
    async fn test_copy_file_rotates() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("transactions.csv");
        let backups_dir = dir.path().join(".backups");
        let backup = Backup::new(&backups_dir, 2);

        for i in 0..4 {
            utils::write(&source, format!("version {i}")).await.unwrap();
            backup.copy_file("transactions.csv", &source).await.unwrap();
        }

        let mut names = Vec::new();
        let mut entries = utils::read_dir(&backups_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("-003"));
        assert!(names[1].ends_with("-004"));

        let newest = utils::read(&backups_dir.join(&names[1])).await.unwrap();
        assert_eq!(newest, "version 3");
    }
}
