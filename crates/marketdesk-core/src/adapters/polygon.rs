use std::sync::Arc;

use serde_json::Value;

use super::{missing_credential, AdapterFuture, ApiKey, ProviderAdapter, ProviderDescriptor, RawResponse};
use crate::classify::{Probe, Signals};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::normalize::parse_finite;
use crate::{Capability, Field, FieldMap, ProviderId, Symbol, UtcDateTime};

static SIGNALS: Signals = Signals {
    rate_limit: &[],
    premium: &[Probe::equals("/status", "NOT_AUTHORIZED")],
    error: &[Probe::field("/error")],
    required: &[(Capability::MarketData, &[Probe::number("/results/0/c")])],
};

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: ProviderId::Polygon,
    endpoint: "https://api.polygon.io",
    credential_env: &["MARKETDESK_POLYGON_API_KEY", "POLYGON_API_KEY"],
    capabilities: &[Capability::MarketData],
    signals: &SIGNALS,
};

/// Polygon previous-day aggregate bar, used as the paid market-data source.
#[derive(Clone)]
pub struct PolygonAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: ApiKey,
    base_url: String,
}

impl PolygonAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            api_key: ApiKey::from_env(),
            base_url: String::from(DESCRIPTOR.endpoint),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = ApiKey::fixed(key);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn previous_close(&self, symbol: Symbol) -> Result<RawResponse, HttpError> {
        let key = self
            .credential()
            .ok_or_else(|| missing_credential(ProviderId::Polygon))?;
        let request = HttpRequest::get(format!(
            "{}/v2/aggs/ticker/{}/prev?adjusted=true&apiKey={}",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(&key)
        ));
        tracing::debug!(url = %request.redacted_url(), "calling polygon");
        let response = self.http_client.execute(request).await?;
        RawResponse::from_http(response)
    }
}

impl ProviderAdapter for PolygonAdapter {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn credential(&self) -> Option<String> {
        self.api_key.resolve(DESCRIPTOR.credential_env)
    }

    fn fetch_snapshot(&self, symbol: Symbol, capability: Capability) -> AdapterFuture<'_> {
        Box::pin(async move {
            if !self.supports(capability) {
                return Err(HttpError::new(format!(
                    "polygon does not serve '{capability}'"
                )));
            }
            self.previous_close(symbol).await
        })
    }

    fn normalize(&self, capability: Capability, body: &Value) -> FieldMap {
        if capability != Capability::MarketData {
            return FieldMap::new();
        }

        let bar = body.pointer("/results/0").unwrap_or(&Value::Null);
        let close = bar.get("c").and_then(parse_finite);
        let open = bar.get("o").and_then(parse_finite);
        let change = close.zip(open).map(|(close, open)| close - open);
        let change_percent = change
            .zip(open)
            .filter(|(_, open)| *open != 0.0)
            .map(|(change, open)| change / open * 100.0);
        let trading_day = bar
            .get("t")
            .and_then(Value::as_i64)
            .and_then(|millis| UtcDateTime::from_unix_seconds(millis / 1_000))
            .map(|stamp| Value::String(stamp.format_date()));

        FieldMap::new()
            .with("symbol", Field::text(body.get("ticker")))
            .with("price", Field::computed(close))
            .with("open", Field::computed(open))
            .with("high", Field::number(bar.get("h")))
            .with("low", Field::number(bar.get("l")))
            .with("volume", Field::number(bar.get("v")))
            .with("change", Field::computed(change))
            .with("changePercent", Field::computed(change_percent))
            .with("latestTradingDay", Field::text(trading_day.as_ref()))
    }
}
