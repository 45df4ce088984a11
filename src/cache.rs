//! Keeps the normalized dataset between loads.
//!
//! The dataset is keyed by the store's source name and `Fingerprint`. A hit skips reading and
//! normalizing the store. The cache lives in memory and, optionally, as a JSON snapshot on disk so
//! that the next process can reuse it. Failing to read or write the snapshot is never an error, we
//! just load from the store instead.

use crate::model::Transaction;
use crate::store::Fingerprint;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    source: String,
    fingerprint: Fingerprint,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Clone)]
struct Entry {
    source: String,
    fingerprint: Fingerprint,
    transactions: Arc<Vec<Transaction>>,
}

impl Entry {
    fn matches(&self, source: &str, fingerprint: &Fingerprint) -> bool {
        self.source == source && &self.fingerprint == fingerprint
    }
}

#[derive(Debug, Default)]
pub(crate) struct DatasetCache {
    snapshot_path: Option<PathBuf>,
    memory: Option<Entry>,
}

impl DatasetCache {
    /// A cache that is never written to disk.
    pub(crate) fn in_memory() -> Self {
        Self::default()
    }

    /// A cache that also persists to `snapshot_path`.
    pub(crate) fn with_snapshot(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(snapshot_path.into()),
            memory: None,
        }
    }

    /// Returns the cached dataset if it was built from `source` at `fingerprint`. A stale disk
    /// snapshot is removed.
    pub(crate) async fn get(
        &mut self,
        source: &str,
        fingerprint: &Fingerprint,
    ) -> Option<Arc<Vec<Transaction>>> {
        if let Some(entry) = &self.memory {
            if entry.matches(source, fingerprint) {
                trace!("Dataset cache hit in memory");
                return Some(entry.transactions.clone());
            }
            self.memory = None;
        }

        let path = self.snapshot_path.clone()?;
        let snapshot = match utils::read_if_exists(&path).await {
            Ok(Some(content)) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Ignoring an unreadable dataset snapshot at {}: {e}", path.display());
                    self.remove_snapshot().await;
                    return None;
                }
            },
            Ok(None) => return None,
            Err(e) => {
                warn!("{e:#}");
                return None;
            }
        };

        let entry = Entry {
            source: snapshot.source,
            fingerprint: snapshot.fingerprint,
            transactions: Arc::new(snapshot.transactions),
        };
        if !entry.matches(source, fingerprint) {
            debug!("The dataset snapshot is stale, discarding it");
            self.remove_snapshot().await;
            return None;
        }
        debug!("Dataset cache hit on disk at {}", path.display());
        let transactions = entry.transactions.clone();
        self.memory = Some(entry);
        Some(transactions)
    }

    /// Stores `transactions` as the dataset for `source` at `fingerprint`.
    pub(crate) async fn put(
        &mut self,
        source: &str,
        fingerprint: Fingerprint,
        transactions: Vec<Transaction>,
    ) -> Arc<Vec<Transaction>> {
        let transactions = Arc::new(transactions);
        if let Some(path) = &self.snapshot_path {
            let snapshot = Snapshot {
                source: source.to_string(),
                fingerprint: fingerprint.clone(),
                transactions: transactions.as_ref().clone(),
            };
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    if let Some(parent) = path.parent() {
                        if let Err(e) = utils::make_dir(parent).await {
                            warn!("{e:#}");
                        }
                    }
                    if let Err(e) = utils::write(path, json).await {
                        warn!("Unable to save the dataset snapshot: {e:#}");
                    }
                }
                Err(e) => warn!("Unable to serialize the dataset snapshot: {e}"),
            }
        }
        self.memory = Some(Entry {
            source: source.to_string(),
            fingerprint,
            transactions: transactions.clone(),
        });
        transactions
    }

    /// Drops the dataset from memory and disk.
    pub(crate) async fn invalidate(&mut self) {
        trace!("Invalidating the dataset cache");
        self.memory = None;
        self.remove_snapshot().await;
    }

    async fn remove_snapshot(&self) {
        if let Some(path) = &self.snapshot_path {
            if let Err(e) = utils::remove_if_exists(path).await {
                warn!("{e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn data() -> Vec<Transaction> {
        vec![Transaction::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Rent",
            "March",
            Amount::from(Decimal::from(1200)),
            TransactionType::from("Expense"),
            "Check",
        )]
    }

    fn file(len: u64) -> Fingerprint {
        Fingerprint::File {
            len,
            modified_secs: 1_700_000_000,
            modified_nanos: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_hit_and_miss() {
        let mut cache = DatasetCache::in_memory();
        assert!(cache.get("a.csv", &file(1)).await.is_none());
        cache.put("a.csv", file(1), data()).await;
        assert_eq!(cache.get("a.csv", &file(1)).await.unwrap().len(), 1);
        assert!(cache.get("a.csv", &file(2)).await.is_none());
        assert!(cache.get("a.csv", &file(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_survives_a_new_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cache").join("transactions.json");
        DatasetCache::with_snapshot(&path)
            .put("a.csv", file(10), data())
            .await;
        assert!(path.is_file());

        let mut cache = DatasetCache::with_snapshot(&path);
        let found = cache.get("a.csv", &file(10)).await.unwrap();
        assert_eq!(*found, data());

        // A different source does not match and the snapshot is discarded
        let mut cache = DatasetCache::with_snapshot(&path);
        assert!(cache.get("b.csv", &file(10)).await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_invalidate_removes_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        let mut cache = DatasetCache::with_snapshot(&path);
        cache.put("a.csv", Fingerprint::Missing, Vec::new()).await;
        assert!(path.is_file());
        cache.invalidate().await;
        assert!(!path.exists());
        assert!(cache.get("a.csv", &Fingerprint::Missing).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        utils::write(&path, "{not json").await.unwrap();
        let mut cache = DatasetCache::with_snapshot(&path);
        assert!(cache.get("a.csv", &Fingerprint::Missing).await.is_none());
        assert!(!path.exists());
    }
}
