//! Ordered provider fallback per capability.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::{
    AdapterFuture, AlphaVantageAdapter, FredAdapter, PolygonAdapter, ProviderAdapter, RawResponse,
    YahooAdapter,
};
use crate::classify::{classify, Outcome};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::QuotaGuard;
use crate::{Capability, FieldMap, ProviderId, Snapshot, Symbol};

/// Static capability → ordered provider list table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChains {
    chains: HashMap<Capability, Vec<ProviderId>>,
}

impl Default for ProviderChains {
    fn default() -> Self {
        use ProviderId::{Alphavantage, Fred, Polygon, Yahoo};

        Self::empty()
            .with_chain(Capability::Quote, [Alphavantage, Yahoo])
            .with_chain(Capability::Overview, [Alphavantage])
            .with_chain(Capability::IncomeStatement, [Alphavantage])
            .with_chain(Capability::BalanceSheet, [Alphavantage])
            .with_chain(Capability::CashFlow, [Alphavantage])
            .with_chain(Capability::MarketData, [Polygon, Yahoo])
            .with_chain(Capability::TreasuryYield, [Fred])
            .with_chain(Capability::SymbolSearch, [Alphavantage])
    }
}

impl ProviderChains {
    pub fn empty() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    /// Sets the chain for `capability`. Duplicate providers keep their first position.
    pub fn with_chain(
        mut self,
        capability: Capability,
        chain: impl IntoIterator<Item = ProviderId>,
    ) -> Self {
        let mut seen = HashSet::new();
        let chain = chain
            .into_iter()
            .filter(|provider| seen.insert(*provider))
            .collect();
        self.chains.insert(capability, chain);
        self
    }

    pub fn chain(&self, capability: Capability) -> &[ProviderId] {
        self.chains
            .get(&capability)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Record of one provider attempt within a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub provider: ProviderId,
    pub outcome: Outcome,
    pub upstream_status: Option<u16>,
    pub detail: String,
    /// Upstream-supplied message, e.g. the text of a rate-limit notice.
    pub note: Option<String>,
}

impl Attempt {
    fn skipped(provider: ProviderId, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            provider,
            outcome,
            upstream_status: None,
            detail: detail.into(),
            note: None,
        }
    }
}

/// Every provider in the chain failed. Carries the last attempt's classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    subject: String,
    capability: Capability,
    attempts: Vec<Attempt>,
}

impl FetchError {
    pub fn new(subject: impl Into<String>, capability: Capability, attempts: Vec<Attempt>) -> Self {
        Self {
            subject: subject.into(),
            capability,
            attempts,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub const fn capability(&self) -> Capability {
        self.capability
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Classification of the last attempt; `transient_error` when nothing was attempted.
    pub fn outcome(&self) -> Outcome {
        self.attempts
            .last()
            .map_or(Outcome::TransientError, |attempt| attempt.outcome)
    }

    /// True when every provider reported the symbol itself as invalid or empty.
    pub fn symbol_unresolvable(&self) -> bool {
        !self.attempts.is_empty()
            && self
                .attempts
                .iter()
                .all(|attempt| attempt.outcome.is_symbol_unresolvable())
    }

    pub fn detail(&self) -> String {
        self.attempts.last().map_or_else(
            || format!("no provider configured for {}", self.capability),
            |attempt| format!("{}: {}", attempt.provider, attempt.detail),
        )
    }

    pub fn note(&self) -> Option<&str> {
        self.attempts.last().and_then(|attempt| attempt.note.as_deref())
    }

    pub fn upstream_status(&self) -> Option<u16> {
        self.attempts.last().and_then(|attempt| attempt.upstream_status)
    }

    pub fn provider(&self) -> Option<ProviderId> {
        self.attempts.last().map(|attempt| attempt.provider)
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} for '{}' failed after {} attempt(s): {}",
            self.capability,
            self.subject,
            self.attempts.len(),
            self.outcome()
        )
    }
}

impl std::error::Error for FetchError {}

/// Result of a symbol search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub provider: ProviderId,
    pub fields: FieldMap,
}

/// Registration and availability of one provider, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider: ProviderId,
    pub available: bool,
    pub capabilities: &'static [Capability],
}

struct Resolved {
    adapter: Arc<dyn ProviderAdapter>,
    response: RawResponse,
}

/// Walks a provider chain, classifying each response, and stops at the first `ok`.
pub struct FallbackOrchestrator {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    chains: ProviderChains,
    quotas: HashMap<ProviderId, QuotaGuard>,
}

impl FallbackOrchestrator {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let adapters: HashMap<_, _> = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        let quotas = adapters
            .keys()
            .map(|provider| {
                let policy = ProviderPolicy::default_for(*provider);
                (*provider, QuotaGuard::from_policy(&policy))
            })
            .collect();

        Self {
            adapters,
            chains: ProviderChains::default(),
            quotas,
        }
    }

    pub fn with_chains(mut self, chains: ProviderChains) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_policy(mut self, policy: &ProviderPolicy) -> Self {
        self.quotas
            .insert(policy.provider_id, QuotaGuard::from_policy(policy));
        self
    }

    pub fn chains(&self) -> &ProviderChains {
        &self.chains
    }

    /// Registered and holding whatever credential it needs.
    pub fn is_available(&self, provider: ProviderId) -> bool {
        self.adapters
            .get(&provider)
            .is_some_and(|adapter| adapter.is_available())
    }

    pub fn provider_statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses = self
            .adapters
            .values()
            .map(|adapter| ProviderStatus {
                provider: adapter.id(),
                available: adapter.is_available(),
                capabilities: adapter.descriptor().capabilities,
            })
            .collect::<Vec<_>>();
        statuses.sort_by_key(|status| status.provider);
        statuses
    }

    /// Resolves `capability` for `symbol` through the configured chain.
    pub async fn resolve_default(
        &self,
        symbol: &Symbol,
        capability: Capability,
    ) -> Result<Snapshot, FetchError> {
        self.resolve(symbol, capability, self.chains.chain(capability))
            .await
    }

    #[tracing::instrument(
        name = "resolve",
        skip_all,
        fields(symbol = %symbol, capability = %capability)
    )]
    pub async fn resolve(
        &self,
        symbol: &Symbol,
        capability: Capability,
        chain: &[ProviderId],
    ) -> Result<Snapshot, FetchError> {
        let owned = symbol.clone();
        let resolved = self
            .run_chain(symbol.as_str(), capability, chain, move |adapter| {
                adapter.fetch_snapshot(owned.clone(), capability)
            })
            .await?;

        let fields = resolved
            .adapter
            .normalize(capability, &resolved.response.body);
        Ok(Snapshot::new(
            symbol.clone(),
            capability,
            resolved.adapter.id(),
            fields,
        ))
    }

    /// Uncached free-text symbol search through the search chain.
    #[tracing::instrument(name = "search", skip_all, fields(query = %query))]
    pub async fn search(&self, query: &str) -> Result<SearchResults, FetchError> {
        let owned = query.to_owned();
        let chain = self.chains.chain(Capability::SymbolSearch);
        let resolved = self
            .run_chain(query, Capability::SymbolSearch, chain, move |adapter| {
                adapter.search(owned.clone())
            })
            .await?;

        Ok(SearchResults {
            query: query.to_owned(),
            provider: resolved.adapter.id(),
            fields: resolved
                .adapter
                .normalize(Capability::SymbolSearch, &resolved.response.body),
        })
    }

    async fn run_chain<F>(
        &self,
        subject: &str,
        capability: Capability,
        chain: &[ProviderId],
        mut invoke: F,
    ) -> Result<Resolved, FetchError>
    where
        F: for<'a> FnMut(&'a dyn ProviderAdapter) -> AdapterFuture<'a>,
    {
        let mut attempts = Vec::with_capacity(chain.len());

        for &provider in chain {
            let Some(adapter) = self.adapters.get(&provider) else {
                attempts.push(Attempt::skipped(
                    provider,
                    Outcome::TransientError,
                    "adapter not registered",
                ));
                continue;
            };

            if !adapter.supports(capability) {
                attempts.push(Attempt::skipped(
                    provider,
                    Outcome::TransientError,
                    format!("capability '{capability}' not supported"),
                ));
                continue;
            }

            if !adapter.is_available() {
                tracing::debug!(provider = %provider, "skipping provider without credential");
                attempts.push(Attempt::skipped(
                    provider,
                    Outcome::TransientError,
                    "credential not configured",
                ));
                continue;
            }

            if let Some(quota) = self.quotas.get(&provider) {
                if !quota.try_acquire() {
                    tracing::warn!(provider = %provider, "local request budget exhausted");
                    attempts.push(Attempt::skipped(
                        provider,
                        Outcome::RateLimit,
                        "local request budget exhausted",
                    ));
                    continue;
                }
            }

            let started = Instant::now();
            let response = match invoke(adapter.as_ref()).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(
                        provider = %provider,
                        capability = %capability,
                        symbol = subject,
                        classification = %Outcome::TransientError,
                        elapsed_ms = elapsed_ms(started),
                        error = %error,
                        "upstream transport failure"
                    );
                    attempts.push(Attempt::skipped(
                        provider,
                        Outcome::TransientError,
                        error.message(),
                    ));
                    continue;
                }
            };

            let signals = adapter.descriptor().signals;
            let outcome = classify(&response, capability, signals);
            let preview = (outcome != Outcome::Ok).then(|| response.preview());
            tracing::info!(
                provider = %provider,
                capability = %capability,
                symbol = subject,
                upstream_status = response.status,
                upstream_top_keys = ?response.top_level_keys(),
                classification = %outcome,
                elapsed_ms = elapsed_ms(started),
                upstream_preview = preview.as_deref(),
                "upstream attempt classified"
            );

            if outcome == Outcome::Ok {
                if !attempts.is_empty() {
                    tracing::info!(
                        provider = %provider,
                        failed_attempts = attempts.len(),
                        "fallback succeeded"
                    );
                }
                return Ok(Resolved {
                    adapter: Arc::clone(adapter),
                    response,
                });
            }

            attempts.push(Attempt {
                provider,
                outcome,
                upstream_status: Some(response.status),
                detail: describe(outcome, response.status),
                note: signals.message(outcome, &response.body),
            });
        }

        let error = FetchError::new(subject, capability, attempts);
        tracing::warn!(
            capability = %capability,
            symbol = subject,
            classification = %error.outcome(),
            symbol_unresolvable = error.symbol_unresolvable(),
            "provider chain exhausted"
        );
        Err(error)
    }
}

fn describe(outcome: Outcome, status: u16) -> String {
    match outcome {
        Outcome::RateLimit => String::from("rate limit reported by upstream"),
        Outcome::PremiumRequired => String::from("premium endpoint required"),
        Outcome::InvalidRequest => String::from("upstream rejected the request"),
        Outcome::Empty => String::from("payload lacked identifying fields"),
        Outcome::TransientError => format!("upstream returned status {status}"),
        Outcome::Ok => String::from("ok"),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Builds an orchestrator with every provider registered against one transport.
///
/// Credentials are not captured here: unless pinned with [`OrchestratorBuilder::with_api_key`],
/// each adapter reads its key from the environment at call time.
///
/// | Provider | Env vars (first set wins) |
/// |----------|---------------------------|
/// | Alpha Vantage | `MARKETDESK_ALPHA_VANTAGE_API_KEY`, `ALPHA_VANTAGE_API_KEY` |
/// | Polygon | `MARKETDESK_POLYGON_API_KEY`, `POLYGON_API_KEY` |
/// | FRED | `MARKETDESK_FRED_API_KEY`, `FRED_API_KEY` |
/// | Yahoo | (no key required) |
#[derive(Default)]
pub struct OrchestratorBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    api_keys: HashMap<ProviderId, String>,
    disabled: HashSet<ProviderId>,
    chains: Option<ProviderChains>,
    policies: Vec<ProviderPolicy>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_api_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    pub fn without_provider(mut self, provider: ProviderId) -> Self {
        self.disabled.insert(provider);
        self
    }

    pub fn with_chains(mut self, chains: ProviderChains) -> Self {
        self.chains = Some(chains);
        self
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn build(self) -> FallbackOrchestrator {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let key = |provider: ProviderId| self.api_keys.get(&provider).cloned();

        let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        if !self.disabled.contains(&ProviderId::Alphavantage) {
            let adapter = AlphaVantageAdapter::new(Arc::clone(&http_client));
            adapters.push(Arc::new(match key(ProviderId::Alphavantage) {
                Some(key) => adapter.with_api_key(key),
                None => adapter,
            }));
        }
        if !self.disabled.contains(&ProviderId::Polygon) {
            let adapter = PolygonAdapter::new(Arc::clone(&http_client));
            adapters.push(Arc::new(match key(ProviderId::Polygon) {
                Some(key) => adapter.with_api_key(key),
                None => adapter,
            }));
        }
        if !self.disabled.contains(&ProviderId::Yahoo) {
            adapters.push(Arc::new(YahooAdapter::new(Arc::clone(&http_client))));
        }
        if !self.disabled.contains(&ProviderId::Fred) {
            let adapter = FredAdapter::new(Arc::clone(&http_client));
            adapters.push(Arc::new(match key(ProviderId::Fred) {
                Some(key) => adapter.with_api_key(key),
                None => adapter,
            }));
        }

        let mut orchestrator = FallbackOrchestrator::new(adapters);
        if let Some(chains) = self.chains {
            orchestrator = orchestrator.with_chains(chains);
        }
        for policy in &self.policies {
            orchestrator = orchestrator.with_policy(policy);
        }
        orchestrator
    }
}
