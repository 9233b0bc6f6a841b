//! End-to-end behavior of the HTTP API against scripted upstream providers.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use marketdesk_core::{MemoryStore, ProviderId, ScriptedHttpClient, SnapshotCache};
use marketdesk_tests::scripted_builder;
use marketdesk_web::{app, AppState, CacheTtls};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(client: &Arc<ScriptedHttpClient>, fred_key: &str) -> Router {
    let orchestrator = scripted_builder(client)
        .with_api_key(ProviderId::Fred, fred_key)
        .build();
    let cache = SnapshotCache::new(Arc::new(MemoryStore::new()), Arc::new(orchestrator));
    app(AppState::new(cache, CacheTtls::default()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

// =============================================================================
// Alpha Vantage routes
// =============================================================================

#[tokio::test]
async fn when_quote_is_available_price_is_returned_as_a_number() {
    // Given
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=GLOBAL_QUOTE&symbol=AAPL",
        200,
        r#"{"Global Quote":{"01. symbol":"AAPL","02. open":"149.00","05. price":"150.25","06. volume":"51234567","07. latest trading day":"2026-01-05","10. change percent":"0.8389%"}}"#,
    ));
    let app = router(&client, "fred-test");

    // When
    let (status, body) = get(&app, "/api/alpha-vantage/quote/aapl").await;

    // Then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], json!("AAPL"));
    assert_eq!(body["price"], json!(150.25));
    assert_eq!(body["volume"], json!(51_234_567));
    assert_eq!(body["changePercent"], json!(0.8389));
    assert_eq!(body["high"], json!(0));
}

#[tokio::test]
async fn when_no_provider_knows_the_ticker_quote_is_not_found() {
    // Given: an empty Global Quote and Yahoo's unknown-symbol error
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("function=GLOBAL_QUOTE", 200, r#"{"Global Quote":{}}"#)
            .respond(
                "/v8/finance/chart/ZZZZZZ",
                404,
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
            ),
    );
    let app = router(&client, "fred-test");

    // When
    let (status, body) = get(&app, "/api/alpha-vantage/quote/ZZZZZZ").await;

    // Then
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Quote not found"));
    assert_eq!(body["classification"], json!("invalid_request"));
    assert_eq!(body["symbol"], json!("ZZZZZZ"));
}

#[tokio::test]
async fn when_quote_falls_back_to_yahoo_body_keeps_the_quote_schema() {
    // Given
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("function=GLOBAL_QUOTE", 200, r#"{"Note":"limit"}"#)
            .respond(
                "/v8/finance/chart/MSFT",
                200,
                r#"{"chart":{"result":[{"meta":{"symbol":"MSFT","currency":"USD","regularMarketPrice":420.0,"chartPreviousClose":400.0,"regularMarketVolume":1234}}],"error":null}}"#,
            ),
    );
    let app = router(&client, "fred-test");

    // When
    let (status, body) = get(&app, "/api/alpha-vantage/quote/MSFT").await;

    // Then
    assert_eq!(status, StatusCode::OK);
    let keys = body
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(
        keys,
        [
            "change",
            "changePercent",
            "high",
            "latestTradingDay",
            "low",
            "open",
            "previousClose",
            "price",
            "symbol",
            "volume",
        ]
    );
    assert_eq!(body["price"], json!(420));
    assert_eq!(body["change"], json!(20));
    assert_eq!(body["open"], json!(0));
}

#[tokio::test]
async fn when_upstream_is_rate_limited_response_is_429_with_note() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=OVERVIEW",
        200,
        r#"{"Note":"Our standard API rate limit is 25 requests per day."}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/overview/IBM").await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], json!("API rate limit exceeded"));
    assert_eq!(body["classification"], json!("rate_limit"));
    assert_eq!(
        body["note"],
        json!("Our standard API rate limit is 25 requests per day.")
    );
}

#[tokio::test]
async fn when_ticker_is_malformed_request_is_rejected_before_any_upstream_call() {
    let client = Arc::new(ScriptedHttpClient::new());
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/quote/1ABC").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ticker"));
    assert!(client.requested_urls().is_empty());
}

#[tokio::test]
async fn when_overview_reports_no_employees_the_field_is_null() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=OVERVIEW",
        200,
        r#"{"Symbol":"SPY","Name":"SPDR S&P 500 ETF","FullTimeEmployees":"None","PERatio":"24.1","Beta":"-"}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/overview/SPY").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("SPDR S&P 500 ETF"));
    assert_eq!(body["employees"], Value::Null);
    assert_eq!(body["peRatio"], json!(24.1));
    assert_eq!(body["beta"], json!(0));
}

#[tokio::test]
async fn when_cash_flow_is_fetched_free_cash_flow_is_derived() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=CASH_FLOW",
        200,
        r#"{"symbol":"AAPL","annualReports":[{"fiscalDateEnding":"2025-09-30","reportedCurrency":"USD","operatingCashflow":"118254000000","capitalExpenditures":"9447000000"}],"quarterlyReports":[]}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/cash-flow/AAPL").await;

    assert_eq!(status, StatusCode::OK);
    let report = &body["annualReports"][0];
    assert_eq!(report["fiscalDateEnding"], json!("2025-09-30"));
    assert_eq!(report["freeCashFlow"], json!(108_807_000_000_i64));
    assert_eq!(body["quarterlyReports"], json!([]));
}

#[tokio::test]
async fn when_statement_is_premium_only_response_is_bad_gateway() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=BALANCE_SHEET",
        200,
        r#"{"Information":"This is a premium endpoint."}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/balance-sheet/AAPL").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], json!("Premium endpoint required"));
    assert_eq!(body["note"], json!("This is a premium endpoint."));
}

// =============================================================================
// Market data route
// =============================================================================

#[tokio::test]
async fn when_polygon_fails_market_data_falls_back_and_is_then_cached() {
    // Given
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("api.polygon.io", 429, "")
            .respond(
                "/v8/finance/chart/NVDA",
                200,
                r#"{"chart":{"result":[{"meta":{"symbol":"NVDA","regularMarketPrice":110.0,"previousClose":100.0,"regularMarketVolume":4200000}}],"error":null}}"#,
            ),
    );
    let app = router(&client, "fred-test");

    // When
    let (first_status, first) = get(&app, "/api/market-data/NVDA").await;
    let (_, second) = get(&app, "/api/market-data/NVDA").await;

    // Then
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first["ticker"], json!("NVDA"));
    assert_eq!(first["price"], json!(110));
    assert_eq!(first["change"], json!(10));
    assert_eq!(first["changePercent"], json!(10));
    assert_eq!(first["source"], json!("Yahoo Finance"));
    assert_eq!(first["cached"], json!(false));
    assert_eq!(second["cached"], json!(true));
    assert_eq!(client.request_count("/v8/finance/chart/NVDA"), 1);
}

#[tokio::test]
async fn when_every_market_data_source_is_unreachable_response_is_500() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .fail("api.polygon.io", "connection refused")
            .fail("query1.finance.yahoo.com", "connection refused"),
    );
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/market-data/AAPL").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Failed to fetch market data from all sources"));
    assert_eq!(body["classification"], json!("transient_error"));
}

#[tokio::test]
async fn when_last_source_answers_with_server_error_response_is_502() {
    let client = Arc::new(
        ScriptedHttpClient::new()
            .respond("api.polygon.io", 500, "upstream broke")
            .respond("query1.finance.yahoo.com", 503, "Service Unavailable"),
    );
    let app = router(&client, "fred-test");

    let (status, _) = get(&app, "/api/market-data/AAPL").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// =============================================================================
// Supplementary routes
// =============================================================================

#[tokio::test]
async fn when_search_query_is_missing_response_is_400() {
    let client = Arc::new(ScriptedHttpClient::new());
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/search?q=%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Query parameter required"));
}

#[tokio::test]
async fn when_search_matches_results_are_listed() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=SYMBOL_SEARCH&keywords=micro",
        200,
        r#"{"bestMatches":[{"1. symbol":"MSFT","2. name":"Microsoft Corporation","3. type":"Equity","4. region":"United States","8. currency":"USD","9. matchScore":"0.6154"}]}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/search?q=micro").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], json!("micro"));
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["symbol"], json!("MSFT"));
    assert_eq!(body["results"][0]["matchScore"], json!(0.6154));
}

#[tokio::test]
async fn when_fred_is_not_configured_treasury_falls_back_to_labelled_default() {
    let client = Arc::new(ScriptedHttpClient::new());
    let app = router(&client, "");

    let (status, body) = get(&app, "/api/fred/10y-treasury").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["yield"], json!(0.045));
    assert_eq!(body["source"], json!("Fallback (FRED API key not configured)"));
    assert!(client.requested_urls().is_empty());
}

#[tokio::test]
async fn when_fred_answers_yield_is_converted_to_a_decimal() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "series_id=DGS10",
        200,
        r#"{"observations":[{"date":"2026-01-02","value":"4.25"}]}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/fred/10y-treasury").await;

    assert_eq!(status, StatusCode::OK);
    let ten_year_yield = body["yield"].as_f64().expect("number");
    assert!((ten_year_yield - 0.0425).abs() < 1e-12);
    assert_eq!(body["date"], json!("2026-01-02"));
    assert_eq!(body["source"], json!("FRED DGS10"));
}

#[tokio::test]
async fn when_fred_has_no_observation_yet_nothing_is_cached_and_next_call_refetches() {
    // Given: FRED has not published today's value
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "series_id=DGS10",
        200,
        r#"{"observations":[{"date":"2026-01-01","value":"."}]}"#,
    ));
    let app = router(&client, "fred-test");

    // When
    let (first_status, first) = get(&app, "/api/fred/10y-treasury").await;
    client.set(
        "series_id=DGS10",
        200,
        r#"{"observations":[{"date":"2026-01-02","value":"4.25"}]}"#,
    );
    let (second_status, second) = get(&app, "/api/fred/10y-treasury").await;

    // Then
    assert_eq!(first_status, StatusCode::NOT_FOUND);
    assert_eq!(first["error"], json!("No treasury yield data available"));
    assert_eq!(first["classification"], json!("empty"));
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["date"], json!("2026-01-02"));
    assert_eq!(client.request_count("series_id=DGS10"), 2);
}

#[tokio::test]
async fn when_spy_overview_is_empty_spx_serves_historical_average() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=OVERVIEW&symbol=SPY",
        200,
        r#"{}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/market-data/spx").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["earningsYield"], json!(0.045));
    assert_eq!(body["source"], json!("Fallback (Alpha Vantage data unavailable)"));
}

#[tokio::test]
async fn when_spy_overview_is_present_spx_computes_earnings_yield() {
    let client = Arc::new(ScriptedHttpClient::new().respond(
        "function=OVERVIEW&symbol=SPY",
        200,
        r#"{"Symbol":"SPY","EBITDA":"1000","EVToEBITDA":"14"}"#,
    ));
    let app = router(&client, "fred-test");

    let (status, body) = get(&app, "/api/alpha-vantage/market-data/spx").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], json!("SPY"));
    assert_eq!(body["source"], json!("Alpha Vantage SPY proxy"));
    let earnings_yield = body["earningsYield"].as_f64().expect("number");
    assert!((earnings_yield - 0.05).abs() < 1e-12);
    assert!(body.get("note").is_none());
}

#[tokio::test]
async fn health_lists_provider_availability() {
    let client = Arc::new(ScriptedHttpClient::new());
    let app = router(&client, "");

    let (status, body) = get(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    let providers = body["providers"].as_array().expect("providers");
    assert_eq!(providers.len(), 4);
    let fred = providers
        .iter()
        .find(|provider| provider["provider"] == json!("fred"))
        .expect("fred listed");
    assert_eq!(fred["available"], json!(false));
}
