//! Provider adapters: pure I/O wrappers that return decoded bodies without judging them.

mod alphavantage;
mod fred;
mod polygon;
mod yahoo;

pub use alphavantage::AlphaVantageAdapter;
pub use fred::FredAdapter;
pub use polygon::PolygonAdapter;
pub use yahoo::YahooAdapter;

use std::env;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::classify::Signals;
use crate::http_client::{HttpError, HttpResponse};
use crate::{Capability, FieldMap, ProviderId, Symbol};

/// Decoded upstream body plus the HTTP status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    /// Decodes a transport response.
    ///
    /// An undecodable body is a transport failure on 2xx. On any other status it becomes
    /// `null` so that the status code alone drives classification.
    pub fn from_http(response: HttpResponse) -> Result<Self, HttpError> {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => Ok(Self {
                status: response.status,
                body,
            }),
            Err(_) if !response.is_success() => Ok(Self {
                status: response.status,
                body: Value::Null,
            }),
            Err(error) => Err(HttpError::new(format!(
                "malformed response body (status {}): {error}",
                response.status
            ))),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Top-level keys of an object body, for diagnostics.
    pub fn top_level_keys(&self) -> Vec<&str> {
        match &self.body {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// First 200 characters of the serialized body.
    pub fn preview(&self) -> String {
        self.body.to_string().chars().take(200).collect()
    }
}

/// Static description of one upstream provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub endpoint: &'static str,
    /// Environment variables consulted for the credential, highest priority first.
    /// Empty when the provider needs no key.
    pub credential_env: &'static [&'static str],
    pub capabilities: &'static [Capability],
    pub signals: &'static Signals,
}

/// API key source: an explicit value, otherwise the environment read at call time.
#[derive(Debug, Clone, Default)]
pub struct ApiKey {
    fixed: Option<String>,
}

impl ApiKey {
    pub fn from_env() -> Self {
        Self { fixed: None }
    }

    pub fn fixed(key: impl Into<String>) -> Self {
        Self {
            fixed: Some(key.into()),
        }
    }

    pub fn resolve(&self, env_vars: &[&str]) -> Option<String> {
        if let Some(key) = &self.fixed {
            return Some(key.clone()).filter(|key| !key.trim().is_empty());
        }
        env_vars
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

pub type AdapterFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse, HttpError>> + Send + 'a>>;

/// Uniform surface every upstream data source exposes.
pub trait ProviderAdapter: Send + Sync {
    fn descriptor(&self) -> &'static ProviderDescriptor;

    fn id(&self) -> ProviderId {
        self.descriptor().id
    }

    fn supports(&self, capability: Capability) -> bool {
        self.descriptor().capabilities.contains(&capability)
    }

    /// The credential this provider would send right now, if it needs one.
    fn credential(&self) -> Option<String>;

    /// A provider whose required key is absent is skipped rather than called.
    fn is_available(&self) -> bool {
        self.descriptor().credential_env.is_empty() || self.credential().is_some()
    }

    /// Issues the provider request for `capability`. Fails only on transport errors.
    fn fetch_snapshot(&self, symbol: Symbol, capability: Capability) -> AdapterFuture<'_>;

    /// Free-text symbol lookup for providers that offer it.
    fn search(&self, _query: String) -> AdapterFuture<'_> {
        let provider = self.id();
        Box::pin(async move {
            Err(HttpError::new(format!("{provider} does not support symbol search")))
        })
    }

    /// Maps an `ok`-classified body onto the capability's named fields.
    fn normalize(&self, capability: Capability, body: &Value) -> FieldMap;
}

pub(crate) fn missing_credential(provider: ProviderId) -> HttpError {
    HttpError::new(format!("{provider} credential not configured"))
}
