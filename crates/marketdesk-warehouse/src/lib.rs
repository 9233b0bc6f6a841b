//! `DuckDB` persistence for cached market snapshots.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub marketdesk_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_marketdesk_home())
    }
}

impl WarehouseConfig {
    /// Places the database at `<home>/cache/snapshots.duckdb`.
    pub fn in_home(marketdesk_home: PathBuf) -> Self {
        let db_path = marketdesk_home.join("cache").join("snapshots.duckdb");
        Self {
            marketdesk_home,
            db_path,
            max_pool_size: 4,
        }
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// One persisted cache entry. `payload` is the serialized snapshot and `last_updated`
/// an RFC3339 UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub symbol: String,
    pub capability: String,
    pub provider: String,
    pub payload: String,
    pub last_updated: String,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        tracing::info!(db_path = %warehouse.db_path().display(), "snapshot warehouse ready");
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Replaces the entry for the record's `(symbol, capability)` pair.
    pub fn save_snapshot(&self, record: &SnapshotRecord) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = connection
            .execute(
                r#"
INSERT OR REPLACE INTO market_snapshots (symbol, capability, provider, payload, last_updated)
VALUES (?, ?, ?, ?, ?)
"#,
                params![
                    record.symbol,
                    record.capability,
                    record.provider,
                    record.payload,
                    record.last_updated
                ],
            )
            .map(|_| ())
            .map_err(WarehouseError::from);

        finalize_transaction(&connection, result)
    }

    pub fn load_snapshot(
        &self,
        symbol: &str,
        capability: &str,
    ) -> Result<Option<SnapshotRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let row = connection.query_row(
            r#"
SELECT symbol, capability, provider, payload, last_updated
FROM market_snapshots
WHERE symbol = ? AND capability = ?
"#,
            params![symbol, capability],
            |row| {
                Ok(SnapshotRecord {
                    symbol: row.get(0)?,
                    capability: row.get(1)?,
                    provider: row.get(2)?,
                    payload: row.get(3)?,
                    last_updated: row.get(4)?,
                })
            },
        );

        match row {
            Ok(record) => Ok(Some(record)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    pub fn snapshot_count(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM market_snapshots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// `MARKETDESK_HOME` when set and non-empty, else `~/.marketdesk`.
pub fn resolve_marketdesk_home() -> PathBuf {
    if let Some(path) = env::var_os("MARKETDESK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".marketdesk");
    }

    PathBuf::from(".marketdesk")
}
