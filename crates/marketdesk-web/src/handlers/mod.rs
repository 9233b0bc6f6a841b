pub mod alpha_vantage;
pub mod fred;
pub mod health;
pub mod market_data;

use marketdesk_core::{Cached, Capability, Symbol};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn parse_ticker(raw: &str) -> ApiResult<Symbol> {
    Symbol::parse(raw).map_err(ApiError::InvalidTicker)
}

async fn fetch_cached(
    state: &AppState,
    symbol: &Symbol,
    capability: Capability,
) -> ApiResult<Cached> {
    let ttl = state.ttls.for_capability(capability);
    Ok(state.cache.get_or_fetch(symbol, capability, ttl).await?)
}
