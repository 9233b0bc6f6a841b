//! TTL cache of normalized snapshots in front of the fallback orchestrator.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use marketdesk_warehouse::{SnapshotRecord, Warehouse, WarehouseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::{FallbackOrchestrator, FetchError};
use crate::{Capability, Snapshot, Symbol, UtcDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub capability: Capability,
}

impl CacheKey {
    pub fn new(symbol: Symbol, capability: Capability) -> Self {
        Self { symbol, capability }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub snapshot: Snapshot,
    pub last_updated: UtcDateTime,
}

impl CacheEntry {
    /// Fresh while strictly less than `ttl` has elapsed since `last_updated`.
    ///
    /// An entry stamped after `now` (the clock moved backwards) is stale.
    pub fn is_fresh(&self, ttl: Duration, now: UtcDateTime) -> bool {
        let ttl = time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX);
        let elapsed = self.last_updated.elapsed_until(now);
        !elapsed.is_negative() && elapsed < ttl
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store backend failed: {0}")]
    Backend(String),

    #[error("stored snapshot could not be decoded: {0}")]
    Decode(String),
}

impl From<WarehouseError> for StoreError {
    fn from(error: WarehouseError) -> Self {
        Self::Backend(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Key-value persistence for cache entries. Concurrent saves for one key are last-write-wins.
pub trait SnapshotStore: Send + Sync {
    fn load<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<CacheEntry>>;

    fn save<'a>(&'a self, key: CacheKey, entry: CacheEntry) -> StoreFuture<'a, ()>;
}

/// Process-local store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<tokio::sync::RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn load<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<CacheEntry>> {
        Box::pin(async move { Ok(self.entries.read().await.get(key).cloned()) })
    }

    fn save<'a>(&'a self, key: CacheKey, entry: CacheEntry) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.entries.write().await.insert(key, entry);
            Ok(())
        })
    }
}

/// Store backed by the `DuckDB` snapshot warehouse. Blocking calls run off the runtime.
#[derive(Clone)]
pub struct WarehouseStore {
    warehouse: Warehouse,
}

impl WarehouseStore {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }
}

impl SnapshotStore for WarehouseStore {
    fn load<'a>(&'a self, key: &'a CacheKey) -> StoreFuture<'a, Option<CacheEntry>> {
        let warehouse = self.warehouse.clone();
        let symbol = key.symbol.as_str().to_owned();
        let capability = key.capability.as_str();

        Box::pin(async move {
            let record = tokio::task::spawn_blocking(move || {
                warehouse.load_snapshot(symbol.as_str(), capability)
            })
            .await
            .map_err(|error| StoreError::Backend(error.to_string()))??;

            let Some(record) = record else {
                return Ok(None);
            };
            let last_updated = UtcDateTime::parse(record.last_updated.as_str())
                .map_err(|error| StoreError::Decode(error.to_string()))?;
            let snapshot = serde_json::from_str::<Snapshot>(record.payload.as_str())?;

            Ok(Some(CacheEntry {
                snapshot,
                last_updated,
            }))
        })
    }

    fn save<'a>(&'a self, key: CacheKey, entry: CacheEntry) -> StoreFuture<'a, ()> {
        let warehouse = self.warehouse.clone();

        Box::pin(async move {
            let record = SnapshotRecord {
                symbol: key.symbol.as_str().to_owned(),
                capability: key.capability.as_str().to_owned(),
                provider: entry.snapshot.provider.as_str().to_owned(),
                payload: serde_json::to_string(&entry.snapshot)?,
                last_updated: entry.last_updated.format_rfc3339(),
            };

            tokio::task::spawn_blocking(move || warehouse.save_snapshot(&record))
                .await
                .map_err(|error| StoreError::Backend(error.to_string()))??;
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Refreshed,
}

/// A snapshot plus the time it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub snapshot: Snapshot,
    pub last_updated: UtcDateTime,
    pub status: CacheStatus,
}

impl Cached {
    pub fn served_from_cache(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// Serves fresh entries from the store and refreshes stale ones through the orchestrator.
///
/// A failed refresh leaves any previous entry in place and returns the error; stale data is
/// never served in its stead. Concurrent misses for one key may each fetch upstream.
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn SnapshotStore>,
    orchestrator: Arc<FallbackOrchestrator>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn SnapshotStore>, orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    #[tracing::instrument(
        name = "cache",
        skip_all,
        fields(symbol = %symbol, capability = %capability, ttl_secs = ttl.as_secs())
    )]
    pub async fn get_or_fetch(
        &self,
        symbol: &Symbol,
        capability: Capability,
        ttl: Duration,
    ) -> Result<Cached, FetchError> {
        let key = CacheKey::new(symbol.clone(), capability);

        let existing = match self.store.load(&key).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(error = %error, "cache read failed; treating as miss");
                None
            }
        };

        if let Some(entry) = &existing {
            if entry.is_fresh(ttl, UtcDateTime::now()) {
                tracing::debug!(last_updated = %entry.last_updated, "cache hit");
                return Ok(Cached {
                    snapshot: entry.snapshot.clone(),
                    last_updated: entry.last_updated,
                    status: CacheStatus::Hit,
                });
            }
        }

        let snapshot = match self.orchestrator.resolve_default(symbol, capability).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    classification = %error.outcome(),
                    stale_entry_retained = existing.is_some(),
                    "cache refresh failed"
                );
                return Err(error);
            }
        };

        let entry = CacheEntry {
            snapshot,
            last_updated: UtcDateTime::now(),
        };
        if let Err(error) = self.store.save(key, entry.clone()).await {
            tracing::warn!(error = %error, "cache write failed; serving uncached snapshot");
        }
        tracing::info!(provider = %entry.snapshot.provider, "cache refreshed");

        Ok(Cached {
            snapshot: entry.snapshot,
            last_updated: entry.last_updated,
            status: CacheStatus::Refreshed,
        })
    }

    /// Reads the stored entry without freshness checks or upstream calls.
    pub async fn inspect(
        &self,
        symbol: &Symbol,
        capability: Capability,
    ) -> Result<Option<CacheEntry>, StoreError> {
        self.store
            .load(&CacheKey::new(symbol.clone(), capability))
            .await
    }
}
