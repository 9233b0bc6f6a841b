use std::sync::Arc;
use std::time::Duration;

use marketdesk_core::{
    Capability, FallbackOrchestrator, MemoryStore, OrchestratorBuilder, SnapshotCache,
    SnapshotStore, UtcDateTime, WarehouseStore,
};
use marketdesk_warehouse::{Warehouse, WarehouseConfig, WarehouseError};

use crate::config::{ServerConfig, StoreKind};

/// Freshness windows per route family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub quote: Duration,
    pub fundamentals: Duration,
    pub market_data: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(5 * 60),
            fundamentals: Duration::from_secs(24 * 60 * 60),
            market_data: Duration::from_secs(15 * 60),
        }
    }
}

impl CacheTtls {
    pub fn for_capability(&self, capability: Capability) -> Duration {
        match capability {
            Capability::Quote => self.quote,
            Capability::MarketData => self.market_data,
            Capability::Overview
            | Capability::IncomeStatement
            | Capability::BalanceSheet
            | Capability::CashFlow
            | Capability::TreasuryYield
            | Capability::SymbolSearch => self.fundamentals,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cache: SnapshotCache,
    pub ttls: CacheTtls,
    pub started_at: UtcDateTime,
}

impl AppState {
    pub fn new(cache: SnapshotCache, ttls: CacheTtls) -> Self {
        Self {
            cache,
            ttls,
            started_at: UtcDateTime::now(),
        }
    }

    /// Real transports, environment credentials, and the configured store.
    pub fn from_config(config: &ServerConfig) -> Result<Self, WarehouseError> {
        let store: Arc<dyn SnapshotStore> = match config.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Duckdb => {
                let mut warehouse_config = WarehouseConfig::default();
                if let Some(db_path) = &config.db_path {
                    warehouse_config = warehouse_config.with_db_path(db_path.clone());
                }
                Arc::new(WarehouseStore::new(Warehouse::open(warehouse_config)?))
            }
        };
        let orchestrator = Arc::new(OrchestratorBuilder::new().build());

        Ok(Self::new(SnapshotCache::new(store, orchestrator), config.ttls()))
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        self.cache.orchestrator()
    }
}
