use std::sync::Arc;

use serde_json::Value;

use super::{missing_credential, AdapterFuture, ApiKey, ProviderAdapter, ProviderDescriptor, RawResponse};
use crate::classify::{Probe, Signals};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::normalize::parse_finite;
use crate::{Capability, Field, FieldMap, ProviderId, Symbol};

static SIGNALS: Signals = Signals {
    rate_limit: &[],
    premium: &[],
    error: &[Probe::field("/error_message")],
    required: &[(
        Capability::TreasuryYield,
        &[Probe::number("/observations/0/value")],
    )],
};

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: ProviderId::Fred,
    endpoint: "https://api.stlouisfed.org/fred",
    credential_env: &["MARKETDESK_FRED_API_KEY", "FRED_API_KEY"],
    capabilities: &[Capability::TreasuryYield],
    signals: &SIGNALS,
};

/// St. Louis Fed series observations. The symbol is the series id, e.g. `DGS10`.
#[derive(Clone)]
pub struct FredAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: ApiKey,
    base_url: String,
}

impl FredAdapter {
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
}

impl ProviderAdapter for FredAdapter {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn credential(&self) -> Option<String> {
        self.api_key.resolve(DESCRIPTOR.credential_env)
    }

    fn fetch_snapshot(&self, symbol: Symbol, capability: Capability) -> AdapterFuture<'_> {
        Box::pin(async move {
            if !self.supports(capability) {
                return Err(HttpError::new(format!("fred does not serve '{capability}'")));
            }
            let key = self
                .credential()
                .ok_or_else(|| missing_credential(ProviderId::Fred))?;
            let request = HttpRequest::get(format!(
                "{}/series/observations?series_id={}&api_key={}&file_type=json&limit=1&sort_order=desc",
                self.base_url,
                urlencoding::encode(symbol.as_str()),
                urlencoding::encode(&key)
            ));
            tracing::debug!(url = %request.redacted_url(), "calling fred");
            let response = self.http_client.execute(request).await?;
            RawResponse::from_http(response)
        })
    }

    fn normalize(&self, capability: Capability, body: &Value) -> FieldMap {
        if capability != Capability::TreasuryYield {
            return FieldMap::new();
        }

        let observation = body.pointer("/observations/0").unwrap_or(&Value::Null);
        let percent = observation.get("value").and_then(parse_finite);

        FieldMap::new()
            .with("percent", Field::computed(percent))
            .with("yield", Field::computed(percent.map(|percent| percent / 100.0)))
            .with("date", Field::text(observation.get("date")))
    }
}
