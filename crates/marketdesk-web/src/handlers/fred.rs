use axum::extract::State;
use axum::Json;
use marketdesk_core::{Capability, ProviderId, Symbol, UtcDateTime};
use serde_json::{json, Value};
use uuid::Uuid;

use super::fetch_cached;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const TEN_YEAR_SERIES: &str = "DGS10";
const FALLBACK_TEN_YEAR_YIELD: f64 = 0.045;

/// Latest 10-year constant-maturity Treasury yield as a decimal.
#[tracing::instrument(name = "treasury_route", skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn ten_year_treasury(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if !state.orchestrator().is_available(ProviderId::Fred) {
        return Ok(Json(json!({
            "yield": FALLBACK_TEN_YEAR_YIELD,
            "date": UtcDateTime::now().format_date(),
            "source": "Fallback (FRED API key not configured)",
            "note": "Using fallback value. Configure FRED_API_KEY for live data.",
        })));
    }

    let series = Symbol::parse(TEN_YEAR_SERIES).map_err(ApiError::InvalidTicker)?;
    let cached = fetch_cached(&state, &series, Capability::TreasuryYield).await?;
    let fields = &cached.snapshot.fields;

    let Some(ten_year_yield) = fields.number("yield") else {
        return Err(ApiError::Internal {
            message: "Invalid treasury yield data",
            details: fields
                .text("date")
                .map(|date| format!("no numeric observation for {date}")),
        });
    };

    Ok(Json(json!({
        "yield": ten_year_yield,
        "date": fields.text("date"),
        "source": "FRED DGS10",
    })))
}
