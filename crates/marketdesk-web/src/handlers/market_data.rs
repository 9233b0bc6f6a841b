use axum::extract::{Path, State};
use axum::Json;
use marketdesk_core::Capability;
use serde_json::Value;
use uuid::Uuid;

use super::{fetch_cached, parse_ticker};
use crate::error::ApiResult;
use crate::render;
use crate::state::AppState;

/// Latest price, change, and volume through the Polygon → Yahoo chain.
#[tracing::instrument(
    name = "market_data_route",
    skip_all,
    fields(ticker = %ticker, request_id = %Uuid::new_v4())
)]
pub async fn market_data(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    let symbol = parse_ticker(&ticker)?;
    let cached = fetch_cached(&state, &symbol, Capability::MarketData).await?;
    Ok(Json(render::market_data(&cached)))
}
