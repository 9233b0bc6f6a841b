//! `/api/alpha-vantage/*` routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use marketdesk_core::{Cached, Capability, Outcome, ProviderId, Symbol, UtcDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{fetch_cached, parse_ticker};
use crate::error::{ApiError, ApiResult};
use crate::render;
use crate::state::AppState;

const SPX_PROXY: &str = "SPY";
const HISTORICAL_EARNINGS_YIELD: f64 = 0.045;
const EARNINGS_TO_EBITDA: f64 = 0.7;
const MAX_PLAUSIBLE_EARNINGS_YIELD: f64 = 0.20;
const MAX_SEARCH_RESULTS: usize = 10;

#[tracing::instrument(
    name = "quote_route",
    skip_all,
    fields(ticker = %ticker, request_id = %Uuid::new_v4())
)]
pub async fn quote(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    let symbol = parse_ticker(&ticker)?;
    let cached = fetch_cached(&state, &symbol, Capability::Quote).await?;
    Ok(Json(render::quote(&cached.snapshot)))
}

#[tracing::instrument(
    name = "overview_route",
    skip_all,
    fields(ticker = %ticker, request_id = %Uuid::new_v4())
)]
pub async fn overview(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    let symbol = parse_ticker(&ticker)?;
    let cached = fetch_cached(&state, &symbol, Capability::Overview).await?;
    Ok(Json(render::overview(&cached.snapshot)))
}

pub async fn income_statement(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    statement(&state, &ticker, Capability::IncomeStatement).await
}

pub async fn balance_sheet(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    statement(&state, &ticker, Capability::BalanceSheet).await
}

pub async fn cash_flow(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<Value>> {
    statement(&state, &ticker, Capability::CashFlow).await
}

#[tracing::instrument(
    name = "statement_route",
    skip(state),
    fields(request_id = %Uuid::new_v4())
)]
async fn statement(
    state: &AppState,
    ticker: &str,
    capability: Capability,
) -> ApiResult<Json<Value>> {
    let symbol = parse_ticker(ticker)?;
    let cached = fetch_cached(state, &symbol, capability).await?;
    Ok(Json(render::snapshot(&cached.snapshot)))
}

/// S&P 500 earnings-yield proxy derived from the SPY overview.
#[tracing::instrument(name = "spx_route", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn spx(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if !state.orchestrator().is_available(ProviderId::Alphavantage) {
        return Ok(Json(spx_fallback()));
    }

    let symbol = Symbol::parse(SPX_PROXY).map_err(ApiError::InvalidTicker)?;
    match fetch_cached(&state, &symbol, Capability::Overview).await {
        Ok(cached) => Ok(Json(spx_body(&cached))),
        Err(ApiError::Fetch(error)) if error.outcome() == Outcome::Empty => {
            tracing::info!("SPY overview unavailable; serving historical average");
            Ok(Json(spx_fallback()))
        }
        Err(error) => Err(error),
    }
}

fn spx_body(cached: &Cached) -> Value {
    let fields = &cached.snapshot.fields;
    let ebitda = fields.number_or_zero("ebitda");
    let ev_to_ebitda = fields.number_or_zero("evToEBITDA");

    let mut body = json!({
        "ebitda": render::number(ebitda),
        "evToEbitda": render::number(ev_to_ebitda),
        "symbol": fields.text("symbol").unwrap_or(SPX_PROXY),
        "source": "Alpha Vantage SPY proxy",
        "lastUpdated": cached.last_updated.format_rfc3339(),
    });
    match earnings_yield(ebitda, ev_to_ebitda) {
        Some(earnings_yield) => body["earningsYield"] = json!(earnings_yield),
        None => {
            body["earningsYield"] = json!(HISTORICAL_EARNINGS_YIELD);
            body["note"] =
                json!("Computed yield unavailable or implausible; using the 4.5% historical average.");
        }
    }
    body
}

fn spx_fallback() -> Value {
    json!({
        "earningsYield": HISTORICAL_EARNINGS_YIELD,
        "ebitda": 0,
        "evToEbitda": 0,
        "symbol": "SPX",
        "source": "Fallback (Alpha Vantage data unavailable)",
        "lastUpdated": UtcDateTime::now().format_rfc3339(),
        "note": "Using historical average. Configure Alpha Vantage for live data.",
    })
}

/// Estimated earnings over enterprise value, when the inputs and result are plausible.
fn earnings_yield(ebitda: f64, ev_to_ebitda: f64) -> Option<f64> {
    if ebitda <= 0.0 || ev_to_ebitda <= 0.0 {
        return None;
    }
    let enterprise_value = ebitda * ev_to_ebitda;
    let earnings_yield = ebitda * EARNINGS_TO_EBITDA / enterprise_value;
    (earnings_yield > 0.0 && earnings_yield <= MAX_PLAUSIBLE_EARNINGS_YIELD).then_some(earnings_yield)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Uncached symbol lookup.
#[tracing::instrument(name = "search_route", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let found = state.orchestrator().search(query).await?;
    let results = found
        .fields
        .rows("matches")
        .iter()
        .take(MAX_SEARCH_RESULTS)
        .map(render::fields)
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "query": query,
        "count": render::number(found.fields.number_or_zero("totalMatches")),
        "results": results,
    })))
}
