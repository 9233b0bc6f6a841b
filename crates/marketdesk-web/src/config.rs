//! Server options.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--bind` | `MARKETDESK_BIND` | `127.0.0.1:8080` |
//! | `--store` | `MARKETDESK_STORE` | `memory` |
//! | `--db-path` | `MARKETDESK_DB_PATH` | `$MARKETDESK_HOME/cache/snapshots.duckdb` |
//! | `--quote-ttl-minutes` | `MARKETDESK_QUOTE_TTL_MINUTES` | `5` |
//! | `--fundamentals-ttl-minutes` | `MARKETDESK_FUNDAMENTALS_TTL_MINUTES` | `1440` |
//! | `--market-data-ttl-minutes` | `MARKETDESK_MARKET_DATA_TTL_MINUTES` | `15` |
//!
//! Provider credentials are not options; adapters read them from the environment per call.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::state::CacheTtls;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "marketdesk-server",
    author,
    version,
    about = "Cached market-data API backed by Alpha Vantage, Polygon, Yahoo and FRED"
)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[arg(long, env = "MARKETDESK_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Where cache entries live.
    #[arg(long, env = "MARKETDESK_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    /// `DuckDB` file for `--store duckdb`.
    #[arg(long, env = "MARKETDESK_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long, env = "MARKETDESK_QUOTE_TTL_MINUTES", default_value_t = 5)]
    pub quote_ttl_minutes: u64,

    /// Applies to the overview and the three financial statements.
    #[arg(long, env = "MARKETDESK_FUNDAMENTALS_TTL_MINUTES", default_value_t = 1440)]
    pub fundamentals_ttl_minutes: u64,

    #[arg(long, env = "MARKETDESK_MARKET_DATA_TTL_MINUTES", default_value_t = 15)]
    pub market_data_ttl_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Memory,
    Duckdb,
}

impl ServerConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            quote: minutes(self.quote_ttl_minutes),
            fundamentals: minutes(self.fundamentals_ttl_minutes),
            market_data: minutes(self.market_data_ttl_minutes),
        }
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_table() {
        let config = ServerConfig::try_parse_from(["marketdesk-server"]).expect("parse");

        assert_eq!(config.bind, "127.0.0.1:8080".parse::<SocketAddr>().expect("addr"));
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.ttls(), CacheTtls::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "marketdesk-server",
            "--store",
            "duckdb",
            "--db-path",
            "/tmp/md.duckdb",
            "--market-data-ttl-minutes",
            "1",
        ])
        .expect("parse");

        assert_eq!(config.store, StoreKind::Duckdb);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/md.duckdb")));
        assert_eq!(config.ttls().market_data, Duration::from_secs(60));
    }
}
