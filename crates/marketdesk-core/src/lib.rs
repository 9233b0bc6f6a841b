//! Market-data retrieval core for marketdesk.
//!
//! This crate contains:
//! - Symbol, capability, and snapshot domain types with validation
//! - Provider adapters that fetch raw upstream bodies
//! - Response classification and ordered provider fallback
//! - A TTL snapshot cache over in-memory or `DuckDB` storage

pub mod adapters;
pub mod cache;
pub mod classify;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod normalize;
pub mod provider_policy;
pub mod routing;
pub mod source;
pub mod throttling;

pub use adapters::{
    AlphaVantageAdapter, FredAdapter, PolygonAdapter, ProviderAdapter, RawResponse, YahooAdapter,
};
pub use cache::{
    CacheEntry, CacheKey, CacheStatus, Cached, MemoryStore, SnapshotCache, SnapshotStore,
    StoreError, WarehouseStore,
};
pub use classify::{classify, Outcome};
pub use domain::{Capability, Field, FieldMap, Snapshot, Symbol, UtcDateTime};
pub use error::ValidationError;
pub use http_client::{HttpClient, HttpError, HttpResponse, ReqwestHttpClient, ScriptedHttpClient};
pub use marketdesk_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use provider_policy::ProviderPolicy;
pub use routing::{
    Attempt, FallbackOrchestrator, FetchError, OrchestratorBuilder, ProviderChains,
    ProviderStatus, SearchResults,
};
pub use source::ProviderId;
pub use throttling::QuotaGuard;
