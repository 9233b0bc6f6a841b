use std::sync::Arc;

use serde_json::Value;

use super::{missing_credential, AdapterFuture, ApiKey, ProviderAdapter, ProviderDescriptor, RawResponse};
use crate::classify::{Probe, Signals};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::normalize::to_number;
use crate::{Capability, Field, FieldMap, ProviderId, Symbol};

const MAX_ANNUAL_REPORTS: usize = 5;
const MAX_QUARTERLY_REPORTS: usize = 8;
const MAX_SEARCH_MATCHES: usize = 10;

static SIGNALS: Signals = Signals {
    rate_limit: &[Probe::field("/Note")],
    premium: &[Probe::field("/Information")],
    error: &[Probe::field("/Error Message")],
    required: &[
        (Capability::Quote, &[Probe::number("/Global Quote/05. price")]),
        (
            Capability::Overview,
            &[Probe::field("/Symbol"), Probe::field("/Name")],
        ),
        (Capability::IncomeStatement, &[Probe::array("/annualReports")]),
        (Capability::BalanceSheet, &[Probe::array("/annualReports")]),
        (Capability::CashFlow, &[Probe::array("/annualReports")]),
    ],
};

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: ProviderId::Alphavantage,
    endpoint: "https://www.alphavantage.co/query",
    credential_env: &["MARKETDESK_ALPHA_VANTAGE_API_KEY", "ALPHA_VANTAGE_API_KEY"],
    capabilities: &[
        Capability::Quote,
        Capability::Overview,
        Capability::IncomeStatement,
        Capability::BalanceSheet,
        Capability::CashFlow,
        Capability::SymbolSearch,
    ],
    signals: &SIGNALS,
};

const OVERVIEW_TEXT: &[(&str, &str)] = &[
    ("symbol", "Symbol"),
    ("name", "Name"),
    ("description", "Description"),
    ("exchange", "Exchange"),
    ("currency", "Currency"),
    ("country", "Country"),
    ("sector", "Sector"),
    ("industry", "Industry"),
    ("fiscalYearEnd", "FiscalYearEnd"),
    ("latestQuarter", "LatestQuarter"),
    ("dividendDate", "DividendDate"),
    ("exDividendDate", "ExDividendDate"),
];

const OVERVIEW_NUMBERS: &[(&str, &str)] = &[
    ("employees", "FullTimeEmployees"),
    ("marketCapitalization", "MarketCapitalization"),
    ("ebitda", "EBITDA"),
    ("peRatio", "PERatio"),
    ("pegRatio", "PEGRatio"),
    ("bookValue", "BookValue"),
    ("dividendPerShare", "DividendPerShare"),
    ("dividendYield", "DividendYield"),
    ("eps", "EPS"),
    ("revenuePerShareTTM", "RevenuePerShareTTM"),
    ("profitMargin", "ProfitMargin"),
    ("operatingMarginTTM", "OperatingMarginTTM"),
    ("returnOnAssetsTTM", "ReturnOnAssetsTTM"),
    ("returnOnEquityTTM", "ReturnOnEquityTTM"),
    ("revenueTTM", "RevenueTTM"),
    ("grossProfitTTM", "GrossProfitTTM"),
    ("dilutedEPSTTM", "DilutedEPSTTM"),
    ("quarterlyEarningsGrowthYOY", "QuarterlyEarningsGrowthYOY"),
    ("quarterlyRevenueGrowthYOY", "QuarterlyRevenueGrowthYOY"),
    ("analystTargetPrice", "AnalystTargetPrice"),
    ("trailingPE", "TrailingPE"),
    ("forwardPE", "ForwardPE"),
    ("priceToSalesRatioTTM", "PriceToSalesRatioTTM"),
    ("priceToBookRatio", "PriceToBookRatio"),
    ("evToRevenue", "EVToRevenue"),
    ("evToEBITDA", "EVToEBITDA"),
    ("beta", "Beta"),
    ("week52High", "52WeekHigh"),
    ("week52Low", "52WeekLow"),
    ("day50MovingAverage", "50DayMovingAverage"),
    ("day200MovingAverage", "200DayMovingAverage"),
    ("sharesOutstanding", "SharesOutstanding"),
];

pub(crate) const INCOME_STATEMENT_FIELDS: &[&str] = &[
    "grossProfit",
    "totalRevenue",
    "costOfRevenue",
    "costofGoodsAndServicesSold",
    "operatingIncome",
    "sellingGeneralAndAdministrative",
    "researchAndDevelopment",
    "operatingExpenses",
    "investmentIncomeNet",
    "netInterestIncome",
    "interestIncome",
    "interestExpense",
    "nonInterestIncome",
    "otherNonOperatingIncome",
    "depreciation",
    "depreciationAndAmortization",
    "incomeBeforeTax",
    "incomeTaxExpense",
    "interestAndDebtExpense",
    "netIncomeFromContinuingOperations",
    "comprehensiveIncomeNetOfTax",
    "ebit",
    "ebitda",
    "netIncome",
];

pub(crate) const BALANCE_SHEET_FIELDS: &[&str] = &[
    "totalAssets",
    "totalCurrentAssets",
    "cashAndCashEquivalentsAtCarryingValue",
    "cashAndShortTermInvestments",
    "inventory",
    "currentNetReceivables",
    "totalNonCurrentAssets",
    "propertyPlantEquipment",
    "accumulatedDepreciationAmortizationPPE",
    "intangibleAssets",
    "intangibleAssetsExcludingGoodwill",
    "goodwill",
    "investments",
    "longTermInvestments",
    "shortTermInvestments",
    "otherCurrentAssets",
    "otherNonCurrentAssets",
    "totalLiabilities",
    "totalCurrentLiabilities",
    "currentAccountsPayable",
    "deferredRevenue",
    "currentDebt",
    "shortTermDebt",
    "totalNonCurrentLiabilities",
    "capitalLeaseObligations",
    "longTermDebt",
    "currentLongTermDebt",
    "longTermDebtNoncurrent",
    "shortLongTermDebtTotal",
    "otherCurrentLiabilities",
    "otherNonCurrentLiabilities",
    "totalShareholderEquity",
    "treasuryStock",
    "retainedEarnings",
    "commonStock",
    "commonStockSharesOutstanding",
];

pub(crate) const CASH_FLOW_FIELDS: &[&str] = &[
    "operatingCashflow",
    "cashflowFromInvestment",
    "cashflowFromFinancing",
    "proceedsFromRepaymentsOfShortTermDebt",
    "paymentsForRepurchaseOfCommonStock",
    "paymentsForRepurchaseOfEquity",
    "paymentsForRepurchaseOfPreferredStock",
    "dividendPayout",
    "dividendPayoutCommonStock",
    "dividendPayoutPreferredStock",
    "proceedsFromIssuanceOfCommonStock",
    "proceedsFromIssuanceOfLongTermDebtAndCapitalSecuritiesNet",
    "proceedsFromIssuanceOfPreferredStock",
    "proceedsFromRepurchaseOfEquity",
    "proceedsFromSaleOfTreasuryStock",
    "changeInCashAndCashEquivalents",
    "changeInExchangeRate",
    "netIncome",
    "capitalExpenditures",
    "capitalExpenditureReported",
];

const SEARCH_TEXT: &[(&str, &str)] = &[
    ("symbol", "1. symbol"),
    ("name", "2. name"),
    ("type", "3. type"),
    ("region", "4. region"),
    ("marketOpen", "5. marketOpen"),
    ("marketClose", "6. marketClose"),
    ("timezone", "7. timezone"),
    ("currency", "8. currency"),
];

/// Alpha Vantage: quotes, company overview, the three financial statements, and search.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: ApiKey,
    base_url: String,
}

impl AlphaVantageAdapter {
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

    fn function_for(capability: Capability) -> Option<&'static str> {
        match capability {
            Capability::Quote => Some("GLOBAL_QUOTE"),
            Capability::Overview => Some("OVERVIEW"),
            Capability::IncomeStatement => Some("INCOME_STATEMENT"),
            Capability::BalanceSheet => Some("BALANCE_SHEET"),
            Capability::CashFlow => Some("CASH_FLOW"),
            Capability::MarketData | Capability::TreasuryYield | Capability::SymbolSearch => None,
        }
    }

    fn query_url(&self, function: &str, param: (&str, &str), key: &str) -> String {
        format!(
            "{}?function={function}&{}={}&apikey={}",
            self.base_url,
            param.0,
            urlencoding::encode(param.1),
            urlencoding::encode(key)
        )
    }

    async fn call(&self, function: &str, param: (&str, &str)) -> Result<RawResponse, HttpError> {
        let key = self
            .credential()
            .ok_or_else(|| missing_credential(ProviderId::Alphavantage))?;
        let request = HttpRequest::get(self.query_url(function, param, &key));
        tracing::debug!(url = %request.redacted_url(), "calling alphavantage");
        let response = self.http_client.execute(request).await?;
        RawResponse::from_http(response)
    }
}

impl ProviderAdapter for AlphaVantageAdapter {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn credential(&self) -> Option<String> {
        self.api_key.resolve(DESCRIPTOR.credential_env)
    }

    fn fetch_snapshot(&self, symbol: Symbol, capability: Capability) -> AdapterFuture<'_> {
        Box::pin(async move {
            let function = Self::function_for(capability).ok_or_else(|| {
                HttpError::new(format!("alphavantage does not serve '{capability}'"))
            })?;
            self.call(function, ("symbol", symbol.as_str())).await
        })
    }

    fn search(&self, query: String) -> AdapterFuture<'_> {
        Box::pin(async move { self.call("SYMBOL_SEARCH", ("keywords", query.as_str())).await })
    }

    fn normalize(&self, capability: Capability, body: &Value) -> FieldMap {
        match capability {
            Capability::Quote => normalize_quote(body),
            Capability::Overview => normalize_overview(body),
            Capability::IncomeStatement => normalize_statement(body, INCOME_STATEMENT_FIELDS, false),
            Capability::BalanceSheet => normalize_statement(body, BALANCE_SHEET_FIELDS, false),
            Capability::CashFlow => normalize_statement(body, CASH_FLOW_FIELDS, true),
            Capability::SymbolSearch => normalize_search(body),
            Capability::MarketData | Capability::TreasuryYield => FieldMap::new(),
        }
    }
}

fn normalize_quote(body: &Value) -> FieldMap {
    let raw = |key: &str| body.get("Global Quote").and_then(|quote| quote.get(key));

    FieldMap::new()
        .with("symbol", Field::text(raw("01. symbol")))
        .with("open", Field::number(raw("02. open")))
        .with("high", Field::number(raw("03. high")))
        .with("low", Field::number(raw("04. low")))
        .with("price", Field::number(raw("05. price")))
        .with("volume", Field::number(raw("06. volume")))
        .with("latestTradingDay", Field::text(raw("07. latest trading day")))
        .with("previousClose", Field::number(raw("08. previous close")))
        .with("change", Field::number(raw("09. change")))
        .with("changePercent", Field::percent(raw("10. change percent")))
}

fn normalize_overview(body: &Value) -> FieldMap {
    let text = OVERVIEW_TEXT
        .iter()
        .map(|(name, key)| (String::from(*name), Field::text(body.get(*key))));
    let numbers = OVERVIEW_NUMBERS
        .iter()
        .map(|(name, key)| (String::from(*name), Field::number(body.get(*key))));
    text.chain(numbers).collect()
}

fn normalize_statement(body: &Value, fields: &[&str], with_free_cash_flow: bool) -> FieldMap {
    let reports = |key: &str, limit: usize| {
        body.get(key)
            .and_then(Value::as_array)
            .map(|reports| {
                reports
                    .iter()
                    .take(limit)
                    .map(|report| normalize_report(report, fields, with_free_cash_flow))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    FieldMap::new()
        .with("symbol", Field::text(body.get("symbol")))
        .with(
            "annualReports",
            Field::Rows(reports("annualReports", MAX_ANNUAL_REPORTS)),
        )
        .with(
            "quarterlyReports",
            Field::Rows(reports("quarterlyReports", MAX_QUARTERLY_REPORTS)),
        )
}

fn normalize_report(report: &Value, fields: &[&str], with_free_cash_flow: bool) -> FieldMap {
    let mut row = FieldMap::new()
        .with("fiscalDateEnding", Field::text(report.get("fiscalDateEnding")))
        .with("reportedCurrency", Field::text(report.get("reportedCurrency")));
    for name in fields {
        row.insert(*name, Field::number(report.get(*name)));
    }
    if with_free_cash_flow {
        let free_cash_flow = to_number(report.get("operatingCashflow"))
            - to_number(report.get("capitalExpenditures"));
        row.insert("freeCashFlow", Field::computed(Some(free_cash_flow)));
    }
    row
}

fn normalize_search(body: &Value) -> FieldMap {
    let matches = body
        .get("bestMatches")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let rows = matches
        .iter()
        .take(MAX_SEARCH_MATCHES)
        .map(|entry| {
            let mut row: FieldMap = SEARCH_TEXT
                .iter()
                .map(|(name, key)| (String::from(*name), Field::text(entry.get(*key))))
                .collect();
            row.insert("matchScore", Field::number(entry.get("9. matchScore")));
            row
        })
        .collect();

    FieldMap::new()
        .with("matches", Field::Rows(rows))
        .with("totalMatches", Field::computed(Some(matches.len() as f64)))
}
