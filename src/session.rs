//! Ties a `RecordStore` to a `DatasetCache`.

use crate::api::Mode;
use crate::cache::DatasetCache;
use crate::error::Res;
use crate::model::{NewEntry, Transaction};
use crate::normalize::normalize;
use crate::store::{self, RecordStore};
use crate::Config;
use std::sync::Arc;
use tracing::debug;

/// The store selected by the config plus the cached, normalized dataset loaded from it.
pub(crate) struct Session {
    store: Box<dyn RecordStore>,
    cache: DatasetCache,
}

impl Session {
    /// Opens the configured store. Fails fast if the store is misconfigured.
    pub(crate) async fn open(config: &Config, mode: Mode) -> Res<Self> {
        let store = store::open(config, mode).await?;
        Ok(Self::new(store, DatasetCache::with_snapshot(config.cache_path())))
    }

    pub(crate) fn new(store: Box<dyn RecordStore>, cache: DatasetCache) -> Self {
        Self { store, cache }
    }

    /// Every normalized transaction in the store, from the cache when the store is unchanged.
    pub(crate) async fn transactions(&mut self) -> Res<Arc<Vec<Transaction>>> {
        let source = self.store.source();
        let fingerprint = self.store.fingerprint().await?;
        if let Some(cached) = self.cache.get(&source, &fingerprint).await {
            return Ok(cached);
        }
        let rows = self.store.load_all().await?;
        let transactions = normalize(&rows);
        debug!(
            "Loaded {} transactions from {} raw rows in {source}",
            transactions.len(),
            rows.len()
        );
        Ok(self.cache.put(&source, fingerprint, transactions).await)
    }

    /// Appends `entry` to the store and drops the cached dataset.
    pub(crate) async fn append(&mut self, entry: &NewEntry) -> Res<()> {
        self.store.append(entry).await?;
        self.cache.invalidate().await;
        Ok(())
    }
}
