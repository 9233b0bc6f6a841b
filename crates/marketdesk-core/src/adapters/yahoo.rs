use std::sync::Arc;

use serde_json::Value;

use super::{AdapterFuture, ProviderAdapter, ProviderDescriptor, RawResponse};
use crate::classify::{Probe, Signals};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::normalize::parse_finite;
use crate::{Capability, Field, FieldMap, ProviderId, Symbol, UtcDateTime};

const PRICE_POINTER: &str = "/chart/result/0/meta/regularMarketPrice";

static SIGNALS: Signals = Signals {
    rate_limit: &[],
    premium: &[],
    error: &[Probe::field("/chart/error"), Probe::field("/finance/error")],
    required: &[
        (Capability::Quote, &[Probe::number(PRICE_POINTER)]),
        (Capability::MarketData, &[Probe::number(PRICE_POINTER)]),
    ],
};

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: ProviderId::Yahoo,
    endpoint: "https://query1.finance.yahoo.com",
    credential_env: &[],
    capabilities: &[Capability::Quote, Capability::MarketData],
    signals: &SIGNALS,
};

/// Yahoo Finance chart metadata; keyless free fallback for prices.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DESCRIPTOR.endpoint),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl ProviderAdapter for YahooAdapter {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn credential(&self) -> Option<String> {
        None
    }

    fn fetch_snapshot(&self, symbol: Symbol, capability: Capability) -> AdapterFuture<'_> {
        Box::pin(async move {
            if !self.supports(capability) {
                return Err(HttpError::new(format!("yahoo does not serve '{capability}'")));
            }
            let request = HttpRequest::get(format!(
                "{}/v8/finance/chart/{}?interval=1d&range=1d",
                self.base_url,
                urlencoding::encode(symbol.as_str())
            ));
            tracing::debug!(url = %request.url, "calling yahoo");
            let response = self.http_client.execute(request).await?;
            RawResponse::from_http(response)
        })
    }

    fn normalize(&self, capability: Capability, body: &Value) -> FieldMap {
        if !self.supports(capability) {
            return FieldMap::new();
        }

        let meta = body.pointer("/chart/result/0/meta").unwrap_or(&Value::Null);
        let price = meta.get("regularMarketPrice").and_then(parse_finite);
        let previous_close = meta
            .get("previousClose")
            .or_else(|| meta.get("chartPreviousClose"))
            .and_then(parse_finite);
        let change = price.zip(previous_close).map(|(price, previous)| price - previous);
        let change_percent = change
            .zip(previous_close)
            .filter(|(_, previous)| *previous != 0.0)
            .map(|(change, previous)| change / previous * 100.0);
        let trading_day = meta
            .get("regularMarketTime")
            .and_then(Value::as_i64)
            .and_then(UtcDateTime::from_unix_seconds)
            .map(|stamp| Value::String(stamp.format_date()));

        FieldMap::new()
            .with("symbol", Field::text(meta.get("symbol")))
            .with("price", Field::computed(price))
            .with("open", Field::Number(None))
            .with("high", Field::number(meta.get("regularMarketDayHigh")))
            .with("low", Field::number(meta.get("regularMarketDayLow")))
            .with("volume", Field::number(meta.get("regularMarketVolume")))
            .with("previousClose", Field::computed(previous_close))
            .with("change", Field::computed(change))
            .with("changePercent", Field::computed(change_percent))
            .with("latestTradingDay", Field::text(trading_day.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::classify::{classify, Outcome};
    use crate::http_client::ScriptedHttpClient;

    fn adapter() -> YahooAdapter {
        YahooAdapter::new(Arc::new(ScriptedHttpClient::new()))
    }

    #[test]
    fn needs_no_credential() {
        assert!(adapter().is_available());
    }

    #[test]
    fn chart_meta_is_mapped_with_change_against_previous_close() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "MSFT",
                        "currency": "USD",
                        "regularMarketPrice": 420.0,
                        "chartPreviousClose": 400.0,
                        "regularMarketVolume": 1234,
                        "regularMarketTime": 1_718_049_600
                    }
                }],
                "error": null
            }
        });

        let fields = adapter().normalize(Capability::MarketData, &body);

        assert_eq!(fields.number("price"), Some(420.0));
        assert_eq!(fields.number("previousClose"), Some(400.0));
        assert_eq!(fields.number("change"), Some(20.0));
        assert_eq!(fields.number("changePercent"), Some(5.0));
        assert_eq!(fields.number("volume"), Some(1234.0));
        assert_eq!(fields.number("open"), None);
        assert_eq!(fields.text("latestTradingDay"), Some("2024-06-10"));
    }

    #[test]
    fn missing_previous_close_leaves_change_uncomputed() {
        let body = json!({ "chart": { "result": [{ "meta": { "regularMarketPrice": 10.0 } }] } });

        let fields = adapter().normalize(Capability::Quote, &body);

        assert_eq!(fields.number("change"), None);
        assert_eq!(fields.number("changePercent"), None);
    }

    #[test]
    fn unknown_symbol_payload_is_invalid_request() {
        let raw = RawResponse {
            status: 404,
            body: json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            }),
        };

        assert_eq!(classify(&raw, Capability::Quote, &SIGNALS), Outcome::InvalidRequest);
        assert_eq!(
            SIGNALS.message(Outcome::InvalidRequest, &raw.body).as_deref(),
            Some("No data found, symbol may be delisted")
        );
    }

    #[test]
    fn null_error_with_result_is_ok() {
        let raw = RawResponse {
            status: 200,
            body: json!({ "chart": { "result": [{ "meta": { "regularMarketPrice": 1.0 } }], "error": null } }),
        };
        assert_eq!(classify(&raw, Capability::MarketData, &SIGNALS), Outcome::Ok);
    }
}
